//! Question/answer history per caller, backed by sled.
//!
//! Keys are `caller 0x00 millis(be) id(be)`, so a reverse prefix scan walks one caller's
//! records newest first.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::StoreError;

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: Uuid,
    pub caller: String,
    pub subject: String,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectCount {
    pub subject: String,
    pub count: usize,
    pub last_question: String,
    pub last_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerStats {
    pub total_questions: usize,
    /// Sorted by count, highest first.
    pub per_subject: Vec<SubjectCount>,
}

impl CallerStats {
    pub fn subjects(&self) -> Vec<&str> {
        self.per_subject.iter().map(|s| s.subject.as_str()).collect()
    }
}

/// Document store for asked questions.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    fn is_available(&self) -> bool;

    async fn append(
        &self,
        caller: &str,
        subject: &str,
        question: &str,
        answer: &str,
    ) -> Result<HistoryRecord, StoreError>;

    /// Records whose subject contains `subject` (case-insensitive), most recent first.
    async fn query_by_subject(
        &self,
        caller: &str,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, StoreError>;

    /// Most recent records across all subjects.
    async fn recent(&self, caller: &str, limit: usize) -> Result<Vec<HistoryRecord>, StoreError>;

    async fn stats(&self, caller: &str) -> Result<CallerStats, StoreError>;
}

/// sled-backed history.
pub struct SledHistoryStore {
    db: sled::Db,
}

impl SledHistoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// In-memory store that disappears on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn prefix(caller: &str) -> Vec<u8> {
        let mut p = Vec::with_capacity(caller.len() + 1);
        p.extend_from_slice(caller.as_bytes());
        p.push(0);
        p
    }

    /// Iterate one caller's records, newest first.
    fn newest_first(&self, caller: &str) -> impl Iterator<Item = Result<HistoryRecord, StoreError>> {
        self.db.scan_prefix(Self::prefix(caller)).rev().map(|r| {
            let (_, v) = r?;
            Ok(serde_json::from_slice::<HistoryRecord>(&v)?)
        })
    }
}

#[async_trait]
impl HistoryStore for SledHistoryStore {
    fn is_available(&self) -> bool {
        true
    }

    async fn append(
        &self,
        caller: &str,
        subject: &str,
        question: &str,
        answer: &str,
    ) -> Result<HistoryRecord, StoreError> {
        let now = Utc::now();
        // Millisecond precision so the stored timestamp matches the key.
        let timestamp = Utc
            .timestamp_millis_opt(now.timestamp_millis())
            .single()
            .unwrap_or(now);
        let record = HistoryRecord {
            id: Uuid::new_v4(),
            caller: caller.to_string(),
            subject: subject.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp,
        };
        let mut key = Self::prefix(caller);
        key.extend_from_slice(&(timestamp.timestamp_millis().max(0) as u64).to_be_bytes());
        key.extend_from_slice(&self.db.generate_id()?.to_be_bytes());
        self.db.insert(key, serde_json::to_vec(&record)?)?;
        Ok(record)
    }

    async fn query_by_subject(
        &self,
        caller: &str,
        subject: &str,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        let needle = subject.to_lowercase();
        let mut out = Vec::new();
        for rec in self.newest_first(caller) {
            let rec = rec?;
            if rec.subject.to_lowercase().contains(&needle) {
                out.push(rec);
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }

    async fn recent(&self, caller: &str, limit: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        self.newest_first(caller).take(limit).collect()
    }

    async fn stats(&self, caller: &str) -> Result<CallerStats, StoreError> {
        let mut total = 0;
        let mut by_subject: HashMap<String, SubjectCount> = HashMap::new();
        for rec in self.newest_first(caller) {
            let rec = rec?;
            total += 1;
            by_subject
                .entry(rec.subject.clone())
                .and_modify(|s| s.count += 1)
                .or_insert(SubjectCount {
                    subject: rec.subject,
                    count: 1,
                    last_question: rec.question,
                    last_timestamp: rec.timestamp,
                });
        }
        let mut per_subject: Vec<SubjectCount> = by_subject.into_values().collect();
        per_subject.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.subject.cmp(&b.subject)));
        Ok(CallerStats { total_questions: total, per_subject })
    }
}

/// Stand-in when no store could be opened. Every call reports `Unavailable`.
#[derive(Debug, Default)]
pub struct DisabledHistoryStore;

#[async_trait]
impl HistoryStore for DisabledHistoryStore {
    fn is_available(&self) -> bool {
        false
    }

    async fn append(&self, _: &str, _: &str, _: &str, _: &str) -> Result<HistoryRecord, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn query_by_subject(&self, _: &str, _: &str, _: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn recent(&self, _: &str, _: usize) -> Result<Vec<HistoryRecord>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn stats(&self, _: &str) -> Result<CallerStats, StoreError> {
        Err(StoreError::Unavailable)
    }
}
