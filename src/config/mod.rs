//! Runtime configuration.
//!
//! A [`RuntimeConfig`] is read from a TOML file by the `simflow` binary:
//!
//! ```toml
//! run_duration_ms = 2000
//! thread_prefix = "simflow"
//! fault_channel_capacity = 256
//!
//! [logging]
//! filter = "info,simflow=debug"
//! file = "simflow.log"
//!
//! [[triggers]]
//! name = "plant"
//! mode = { kind = "fixed_rate", interval_ms = 10 }
//!
//! [[triggers]]
//! name = "monitor"
//! mode = { kind = "single_step", step_ms = 100 }
//! ```

use crate::error::{Result, SimFlowError};
use crate::graph::LoopMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default tracing filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info,simflow=debug";

/// Default capacity of the fault event channel
pub const DEFAULT_FAULT_CHANNEL_CAPACITY: usize = 256;

/// Default demo run duration in milliseconds
pub const DEFAULT_RUN_DURATION_MS: u64 = 2000;

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Optional log file; written through a non-blocking appender
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

/// Loop mode as written in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoopModeConfig {
    FixedRate { interval_ms: u64 },
    FastestPossible,
    SingleStep { step_ms: u64 },
}

impl TryFrom<LoopModeConfig> for LoopMode {
    type Error = SimFlowError;

    fn try_from(config: LoopModeConfig) -> Result<Self> {
        match config {
            LoopModeConfig::FixedRate { interval_ms: 0 } => Err(SimFlowError::Config(
                "fixed-rate interval must be positive".to_string(),
            )),
            LoopModeConfig::FixedRate { interval_ms } => {
                Ok(LoopMode::fixed_rate(Duration::from_millis(interval_ms)))
            }
            LoopModeConfig::FastestPossible => Ok(LoopMode::FastestPossible),
            LoopModeConfig::SingleStep { step_ms } => {
                Ok(LoopMode::single_step(Duration::from_millis(step_ms)))
            }
        }
    }
}

/// A root trigger to create at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub name: String,
    pub mode: LoopModeConfig,
}

impl TriggerConfig {
    pub fn new(name: impl Into<String>, mode: LoopModeConfig) -> Self {
        Self {
            name: name.into(),
            mode,
        }
    }

    pub fn loop_mode(&self) -> Result<LoopMode> {
        LoopMode::try_from(self.mode)
            .map_err(|e| e.with_context(format!("Trigger '{}'", self.name)))
    }
}

/// Top-level runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_fault_channel_capacity")]
    pub fault_channel_capacity: usize,

    /// Root trigger threads are named `<prefix>-<trigger name>`
    #[serde(default = "default_thread_prefix")]
    pub thread_prefix: String,

    #[serde(default = "default_run_duration_ms")]
    pub run_duration_ms: u64,

    // Tables last so the serialized TOML stays valid.
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default = "default_triggers")]
    pub triggers: Vec<TriggerConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fault_channel_capacity: DEFAULT_FAULT_CHANNEL_CAPACITY,
            thread_prefix: default_thread_prefix(),
            run_duration_ms: DEFAULT_RUN_DURATION_MS,
            logging: LoggingConfig::default(),
            triggers: default_triggers(),
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SimFlowError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SimFlowError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Save as TOML, creating the parent directory if needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SimFlowError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SimFlowError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            SimFlowError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Check values serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.fault_channel_capacity == 0 {
            return Err(SimFlowError::Config(
                "fault_channel_capacity must be positive".to_string(),
            ));
        }
        for (i, trigger) in self.triggers.iter().enumerate() {
            if trigger.name.trim().is_empty() {
                return Err(SimFlowError::Config(format!("Trigger #{} has no name", i)));
            }
            if self.triggers[..i].iter().any(|t| t.name == trigger.name) {
                return Err(SimFlowError::Config(format!(
                    "Duplicate trigger name '{}'",
                    trigger.name
                )));
            }
            trigger.loop_mode()?;
        }
        Ok(())
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_millis(self.run_duration_ms)
    }
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_fault_channel_capacity() -> usize {
    DEFAULT_FAULT_CHANNEL_CAPACITY
}

fn default_thread_prefix() -> String {
    crate::graph::network::DEFAULT_THREAD_PREFIX.to_string()
}

fn default_run_duration_ms() -> u64 {
    DEFAULT_RUN_DURATION_MS
}

fn default_triggers() -> Vec<TriggerConfig> {
    vec![
        TriggerConfig::new("plant", LoopModeConfig::FixedRate { interval_ms: 10 }),
        TriggerConfig::new("monitor", LoopModeConfig::FixedRate { interval_ms: 100 }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.triggers.len(), 2);
    }

    #[test]
    fn test_parse_minimal_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("run_duration_ms = 50").unwrap();
        assert_eq!(config.run_duration(), Duration::from_millis(50));
        assert_eq!(config.fault_channel_capacity, DEFAULT_FAULT_CHANNEL_CAPACITY);
        assert_eq!(config.triggers, default_triggers());
    }

    #[test]
    fn test_parse_trigger_modes() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [[triggers]]
            name = "fast"
            mode = { kind = "fastest_possible" }

            [[triggers]]
            name = "stepper"
            mode = { kind = "single_step", step_ms = 20 }
            "#,
        )
        .unwrap();
        assert_eq!(config.triggers[0].loop_mode().unwrap(), LoopMode::FastestPossible);
        assert_eq!(
            config.triggers[1].loop_mode().unwrap(),
            LoopMode::single_step(Duration::from_millis(20))
        );
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = RuntimeConfig::from_toml_str(
            r#"
            [[triggers]]
            name = "broken"
            mode = { kind = "fixed_rate", interval_ms = 0 }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("broken"));
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_duplicate_trigger_rejected() {
        let mut config = RuntimeConfig::default();
        config.triggers[1].name = config.triggers[0].name.clone();
        assert!(matches!(config.validate(), Err(SimFlowError::Config(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = RuntimeConfig {
            fault_channel_capacity: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("simflow.toml");

        let mut config = RuntimeConfig::default();
        config.logging.file = Some(PathBuf::from("run.log"));
        config.triggers.push(TriggerConfig::new(
            "stepper",
            LoopModeConfig::SingleStep { step_ms: 5 },
        ));
        config.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuntimeConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SimFlowError::Config(_)));
    }
}
