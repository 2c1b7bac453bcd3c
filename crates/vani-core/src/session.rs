//! Per-call session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque call identifier issued by the telephony gateway (e.g. a Twilio CallSid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Orchestrator states. `Idle` means no session object exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallState {
    Idle,
    Welcome,
    LanguageSelect,
    Menu,
    Recording,
    Processing,
    Speaking,
    Summary,
    Ended,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Idle => "idle",
            CallState::Welcome => "welcome",
            CallState::LanguageSelect => "languageSelect",
            CallState::Menu => "menu",
            CallState::Recording => "recording",
            CallState::Processing => "processing",
            CallState::Speaking => "speaking",
            CallState::Summary => "summary",
            CallState::Ended => "ended",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt language chosen in `LanguageSelect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Language {
    #[default]
    English,
    Hindi,
}

impl Language {
    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' => Some(Language::English),
            '2' => Some(Language::Hindi),
            _ => None,
        }
    }

    /// BCP-47 tag used on spoken prompts.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Hindi => "hi-IN",
        }
    }
}

/// One active call. Mutated only by the task that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: CallId,
    pub caller_address: String,
    pub state: CallState,
    pub language: Language,
    pub pending_question_text: Option<String>,
    pub last_answer_text: Option<String>,
    pub last_subject: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: CallId, caller_address: impl Into<String>) -> Self {
        Self {
            id,
            caller_address: caller_address.into(),
            state: CallState::Idle,
            language: Language::default(),
            pending_question_text: None,
            last_answer_text: None,
            last_subject: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_digits() {
        assert_eq!(Language::from_digit('1'), Some(Language::English));
        assert_eq!(Language::from_digit('2').map(|l| l.tag()), Some("hi-IN"));
        assert_eq!(Language::from_digit('3'), None);
    }

    #[test]
    fn session_serializes_camel_case() {
        let s = Session::new(CallId::new("C1"), "+15550001");
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["id"], "C1");
        assert_eq!(v["callerAddress"], "+15550001");
        assert_eq!(v["state"], "idle");
        assert!(v["pendingQuestionText"].is_null());
    }
}
