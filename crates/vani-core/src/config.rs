//! Runtime configuration for the tutoring line.
//!
//! `VaniConfig::load` layers defaults, an optional TOML file and `VANI__*` environment
//! variables. Provider credentials are not part of this struct; each stage client reads
//! its own keys from the environment so a missing key only disables that stage.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Gateway and orchestration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct VaniConfig {
    /// HTTP port for the gateway.
    pub port: u16,
    /// Externally reachable base URL; used to build audio links handed to the telephony gateway.
    pub public_base_url: String,
    /// Base directory for the sled history store.
    pub storage_path: String,
    /// Directory where synthesized answers are written and served from `/audio`.
    pub audio_dir: String,
    /// Hard ceiling for a question recording, independent of the stop digit.
    pub recording_ceiling_secs: u64,
    /// Ceiling for the short spoken-subject recording.
    pub subject_recording_ceiling_secs: u64,
    /// Bounded wait for any single pipeline stage call.
    pub stage_timeout_secs: u64,
    /// How long a session may sit in `Processing` before it is sent back to Welcome.
    pub processing_ceiling_secs: u64,
    /// Number of history entries fed to the summarizer.
    pub summary_history_limit: usize,
    /// Ring buffer size of the event bus.
    pub bus_history_capacity: usize,
    /// Per-observer queue depth before oldest events are dropped.
    pub observer_queue_capacity: usize,
    /// Rolling latency window size.
    pub latency_window: usize,
    /// Interval of the periodic metrics snapshot.
    pub metrics_interval_secs: u64,
    /// Synthesized audio older than this is pruned.
    pub audio_retention_secs: u64,
}

impl Default for VaniConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            public_base_url: "http://localhost:3000".to_string(),
            storage_path: "./data".to_string(),
            audio_dir: "./data/audio".to_string(),
            recording_ceiling_secs: 60,
            subject_recording_ceiling_secs: 10,
            stage_timeout_secs: 10,
            processing_ceiling_secs: 90,
            summary_history_limit: 5,
            bus_history_capacity: 100,
            observer_queue_capacity: 256,
            latency_window: 100,
            metrics_interval_secs: 5,
            audio_retention_secs: 3600,
        }
    }
}

impl VaniConfig {
    /// Load config from file and environment. Precedence: `VANI__*` env > file at `VANI_CONFIG`
    /// (default `config/vani.toml`) > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("VANI_CONFIG").unwrap_or_else(|_| "config/vani.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Same as [`VaniConfig::load`] with an explicit file path. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let d = Self::default();
        let builder = config::Config::builder()
            .set_default("port", d.port as i64)?
            .set_default("public_base_url", d.public_base_url)?
            .set_default("storage_path", d.storage_path)?
            .set_default("audio_dir", d.audio_dir)?
            .set_default("recording_ceiling_secs", d.recording_ceiling_secs)?
            .set_default("subject_recording_ceiling_secs", d.subject_recording_ceiling_secs)?
            .set_default("stage_timeout_secs", d.stage_timeout_secs)?
            .set_default("processing_ceiling_secs", d.processing_ceiling_secs)?
            .set_default("summary_history_limit", d.summary_history_limit as u64)?
            .set_default("bus_history_capacity", d.bus_history_capacity as u64)?
            .set_default("observer_queue_capacity", d.observer_queue_capacity as u64)?
            .set_default("latency_window", d.latency_window as u64)?
            .set_default("metrics_interval_secs", d.metrics_interval_secs)?
            .set_default("audio_retention_secs", d.audio_retention_secs)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("VANI").separator("__"))
            .build()?;

        Ok(built.try_deserialize()?)
    }

    pub fn history_path(&self) -> PathBuf {
        Path::new(&self.storage_path).join("vani_history")
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            recording_ceiling: Duration::from_secs(self.recording_ceiling_secs),
            subject_recording_ceiling: Duration::from_secs(self.subject_recording_ceiling_secs),
            stage_timeout: Duration::from_secs(self.stage_timeout_secs),
            processing_ceiling: Duration::from_secs(self.processing_ceiling_secs),
            summary_history_limit: self.summary_history_limit.max(1),
        }
    }

    pub fn bus(&self) -> BusConfig {
        BusConfig {
            history_capacity: self.bus_history_capacity.max(1),
            observer_queue_capacity: self.observer_queue_capacity.max(1),
            latency_window: self.latency_window.max(1),
        }
    }
}

/// Timing knobs for the call-session orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub recording_ceiling: Duration,
    pub subject_recording_ceiling: Duration,
    pub stage_timeout: Duration,
    pub processing_ceiling: Duration,
    pub summary_history_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        VaniConfig::default().orchestrator()
    }
}

/// Sizing for the event bus.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub history_capacity: usize,
    pub observer_queue_capacity: usize,
    pub latency_window: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        VaniConfig::default().bus()
    }
}

/// Read a trimmed, non-empty environment variable.
pub fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First non-empty variable among `names`.
pub fn env_first(names: &[&str]) -> Option<String> {
    names.iter().find_map(|n| env_opt_string(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_call_flow_constants() {
        let c = VaniConfig::default();
        assert_eq!(c.recording_ceiling_secs, 60);
        assert_eq!(c.subject_recording_ceiling_secs, 10);
        assert_eq!(c.summary_history_limit, 5);
        assert_eq!(c.bus_history_capacity, 100);
        assert_eq!(c.orchestrator().recording_ceiling, Duration::from_secs(60));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vani.toml");
        std::fs::write(&path, "port = 8080\nsummary_history_limit = 3\n").unwrap();
        let c = VaniConfig::load_from(&path).unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.summary_history_limit, 3);
        assert_eq!(c.audio_dir, "./data/audio");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let c = VaniConfig::load_from(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(c.stage_timeout_secs, 10);
    }
}
