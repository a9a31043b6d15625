//! Configuration for the session engine
//!
//! Loaded from TOML; every field has a default so an empty document is a
//! valid configuration. A few values can be overridden from the environment.

use crate::errors::{Result, SwitchError};
use serde::{Deserialize, Serialize};
use softswitch_infra_common::logging::{log_welcome, parse_log_level, setup_logging, LoggingConfig};
use std::path::Path;

/// Smallest scratch frame accepted: room for the largest supported payload
pub const MIN_SCRATCH_FRAME_BYTES: usize = 3200;

/// Default adaptive buffer capacity, in native frames
pub const DEFAULT_BUFFER_FRAMES: usize = 10;

/// Environment variable overriding `logging.level`
pub const ENV_LOG_LEVEL: &str = "SOFTSWITCH_LOG_LEVEL";
/// Environment variable overriding `buffer_frames`
pub const ENV_BUFFER_FRAMES: &str = "SOFTSWITCH_BUFFER_FRAMES";
/// Environment variable overriding `max_session_id`
pub const ENV_MAX_SESSION_ID: &str = "SOFTSWITCH_MAX_SESSION_ID";

/// Session engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Capacity of each scratch frame in bytes
    pub scratch_frame_bytes: usize,
    /// Adaptive buffer capacity in native frames of the active codec
    pub buffer_frames: usize,
    /// Byte budget of the master pool
    pub memory_limit: Option<usize>,
    /// Byte budget of each session pool created by the core
    pub session_memory_limit: Option<usize>,
    /// Highest session identity before wrapping back to 1
    pub max_session_id: u64,
    /// Prefix for session thread names
    pub thread_name_prefix: String,
    /// Logging settings
    pub logging: LogSettings,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            scratch_frame_bytes: MIN_SCRATCH_FRAME_BYTES,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
            memory_limit: None,
            session_memory_limit: None,
            max_session_id: u64::from(u32::MAX),
            thread_name_prefix: "session".to_string(),
            logging: LogSettings::default(),
        }
    }
}

/// `[logging]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Level name: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines
    pub json: bool,
    /// Include file and line
    pub file_info: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_info: false,
        }
    }
}

impl CoreConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| SwitchError::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SwitchError::config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `SOFTSWITCH_*` environment overrides and re-validate
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Ok(value) = std::env::var(ENV_BUFFER_FRAMES) {
            self.buffer_frames = parse_env(ENV_BUFFER_FRAMES, &value)?;
        }
        if let Ok(value) = std::env::var(ENV_MAX_SESSION_ID) {
            self.max_session_id = parse_env(ENV_MAX_SESSION_ID, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.scratch_frame_bytes < MIN_SCRATCH_FRAME_BYTES {
            return Err(SwitchError::config(format!(
                "scratch_frame_bytes must be at least {} (got {})",
                MIN_SCRATCH_FRAME_BYTES, self.scratch_frame_bytes
            )));
        }
        if self.buffer_frames == 0 {
            return Err(SwitchError::config("buffer_frames must be at least 1"));
        }
        if self.max_session_id == 0 {
            return Err(SwitchError::config("max_session_id must be at least 1"));
        }
        parse_log_level(&self.logging.level).map_err(|e| SwitchError::config(e.to_string()))?;
        Ok(())
    }

    /// Logging configuration for [`setup_logging`](softswitch_infra_common::setup_logging)
    pub fn logging_config(&self) -> Result<LoggingConfig> {
        let level =
            parse_log_level(&self.logging.level).map_err(|e| SwitchError::config(e.to_string()))?;
        let mut config = LoggingConfig::new(level, "softswitch");
        if self.logging.json {
            config = config.with_json();
        }
        if self.logging.file_info {
            config = config.with_file_info();
        }
        Ok(config)
    }

    /// Install the global `tracing` subscriber described by `[logging]`.
    ///
    /// Fails when a subscriber is already installed.
    pub fn init_logging(&self) -> Result<()> {
        let config = self.logging_config()?;
        setup_logging(&config).map_err(|e| SwitchError::config(e.to_string()))?;
        log_welcome(&config.app_name, env!("CARGO_PKG_VERSION"));
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SwitchError::config(format!("{} has an invalid value: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(CoreConfig::from_toml_str("").unwrap(), CoreConfig::default());
    }

    #[test]
    fn test_parse_document() {
        let config = CoreConfig::from_toml_str(
            r#"
            buffer_frames = 4
            session_memory_limit = 65536
            max_session_id = 100

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.buffer_frames, 4);
        assert_eq!(config.session_memory_limit, Some(65536));
        assert_eq!(config.max_session_id, 100);
        assert_eq!(config.scratch_frame_bytes, MIN_SCRATCH_FRAME_BYTES);
        assert!(config.logging.json);
        assert_eq!(config.logging_config().unwrap().level, tracing::Level::DEBUG);
    }

    #[test]
    fn test_validation() {
        assert!(CoreConfig::from_toml_str("scratch_frame_bytes = 1600").is_err());
        assert!(CoreConfig::from_toml_str("buffer_frames = 0").is_err());
        assert!(CoreConfig::from_toml_str("max_session_id = 0").is_err());
        assert!(CoreConfig::from_toml_str("[logging]\nlevel = \"chatty\"").is_err());
        assert!(CoreConfig::from_toml_str("buffer_frames = \"ten\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.toml");
        std::fs::write(&path, "buffer_frames = 3\n").unwrap();

        assert_eq!(CoreConfig::from_file(&path).unwrap().buffer_frames, 3);
        assert!(CoreConfig::from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var(ENV_BUFFER_FRAMES, "6");
        std::env::set_var(ENV_LOG_LEVEL, "warn");
        let config = CoreConfig::default().apply_env();
        std::env::remove_var(ENV_BUFFER_FRAMES);
        std::env::remove_var(ENV_LOG_LEVEL);

        let config = config.unwrap();
        assert_eq!(config.buffer_frames, 6);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_garbage() {
        std::env::set_var(ENV_MAX_SESSION_ID, "many");
        let result = CoreConfig::default().apply_env();
        std::env::remove_var(ENV_MAX_SESSION_ID);

        assert!(matches!(result, Err(SwitchError::Config(_))));
    }
}
