//! Integration test: question history on disk.
//!
//! Verifies that:
//! 1. Records survive reopening the store.
//! 2. Subject queries are case-insensitive substring matches, newest first, and bounded.
//! 3. Callers never see each other's records.
//! 4. Stats count per subject, highest first.

use vani_core::{DisabledHistoryStore, HistoryStore, SledHistoryStore, StoreError};

#[tokio::test]
async fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = SledHistoryStore::open(dir.path()).unwrap();
        store
            .append("+911234", "Physics", "What is gravity?", "Gravity pulls masses together.")
            .await
            .unwrap();
    }
    let store = SledHistoryStore::open(dir.path()).unwrap();
    let got = store.recent("+911234", 10).await.unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].subject, "Physics");
    assert_eq!(got[0].question, "What is gravity?");
    assert_eq!(got[0].caller, "+911234");
}

#[tokio::test]
async fn subject_query_is_newest_first_and_bounded() {
    let store = SledHistoryStore::temporary().unwrap();
    for i in 0..7 {
        store
            .append("caller", "Organic Chemistry", &format!("q{i}"), "a")
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    store.append("caller", "Physics", "unrelated", "a").await.unwrap();

    let got = store.query_by_subject("caller", "chemistry", 5).await.unwrap();
    let questions: Vec<&str> = got.iter().map(|r| r.question.as_str()).collect();
    assert_eq!(questions, vec!["q6", "q5", "q4", "q3", "q2"]);

    let none = store.query_by_subject("caller", "Biology", 5).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn callers_are_isolated() {
    let store = SledHistoryStore::temporary().unwrap();
    store.append("+1555", "Physics", "mine", "a").await.unwrap();
    store.append("+15550", "Physics", "theirs", "a").await.unwrap();

    let mine = store.query_by_subject("+1555", "physics", 5).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].question, "mine");
    assert!(store.recent("+1999", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn stats_rank_subjects_by_count() {
    let store = SledHistoryStore::temporary().unwrap();
    store.append("c", "Biology", "b1", "a").await.unwrap();
    store.append("c", "Mathematics", "m1", "a").await.unwrap();
    store.append("c", "Mathematics", "m2", "a").await.unwrap();

    let stats = store.stats("c").await.unwrap();
    assert_eq!(stats.total_questions, 3);
    assert_eq!(stats.subjects(), vec!["Mathematics", "Biology"]);
    assert_eq!(stats.per_subject[0].count, 2);

    let empty = store.stats("nobody").await.unwrap();
    assert_eq!(empty.total_questions, 0);
    assert!(empty.per_subject.is_empty());
}

#[tokio::test]
async fn disabled_store_reports_unavailable() {
    let store = DisabledHistoryStore;
    assert!(!store.is_available());
    let err = store.append("c", "Physics", "q", "a").await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable));
    assert!(matches!(store.stats("c").await, Err(StoreError::Unavailable)));
}
