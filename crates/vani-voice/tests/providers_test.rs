//! Integration test: provider assembly from configuration.
//!
//! Verifies that:
//! 1. The history store opens under the configured storage path.
//! 2. An unopenable storage path yields a disabled store instead of a startup failure.
//! 3. The audio store follows the configured directory, base URL and retention.

use std::time::Duration;
use vani_core::{CallId, HistoryStore, VaniConfig};
use vani_voice::{audio_store, open_history};

fn config_in(dir: &std::path::Path) -> VaniConfig {
    VaniConfig {
        storage_path: dir.join("data").display().to_string(),
        audio_dir: dir.join("audio").display().to_string(),
        public_base_url: "https://tutor.example.com".to_string(),
        audio_retention_secs: 120,
        ..VaniConfig::default()
    }
}

#[tokio::test]
async fn history_opens_under_storage_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let history = open_history(&config);
    assert!(history.is_available());
    history.append("+1", "Physics", "q", "a").await.unwrap();
    assert_eq!(history.recent("+1", 5).await.unwrap().len(), 1);
    assert!(config.history_path().exists());
}

#[tokio::test]
async fn unopenable_history_is_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();
    let config = VaniConfig {
        storage_path: blocker.display().to_string(),
        ..VaniConfig::default()
    };
    let history = open_history(&config);
    assert!(!history.is_available());
    assert!(history.stats("+1").await.is_err());
}

#[tokio::test]
async fn audio_store_follows_config() {
    let dir = tempfile::tempdir().unwrap();
    let store = audio_store(&config_in(dir.path()));
    assert_eq!(store.retention, Duration::from_secs(120));
    let audio = store.save(&CallId::new("CA9"), b"mp3").await.unwrap();
    assert!(audio.url().starts_with("https://tutor.example.com/audio/answer_CA9_"));
    assert!(dir.path().join("audio").is_dir());
}
