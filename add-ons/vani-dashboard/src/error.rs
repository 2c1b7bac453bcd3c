use thiserror::Error;

/// Failures of the observer side of the event feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObserverError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("undecodable event: {0}")]
    Decode(String),

    #[error("gave up after {attempts} reconnect attempts")]
    RetriesExhausted { attempts: u32 },
}
