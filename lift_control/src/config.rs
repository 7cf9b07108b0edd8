//! TOML configuration loader with validation.
//!
//! Loads `LiftConfig` from a TOML file and validates parameter bounds.
//! Configuration errors are fatal at startup and must prevent the
//! controller from ever reaching `initialise()`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ─── Error Type ─────────────────────────────────────────────────────

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("config I/O error: {0}")]
    Io(String),
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Parameter validation error.
    #[error("config validation: {0}")]
    Validation(String),
}

// ─── Config Types ───────────────────────────────────────────────────

/// Which I/O backend the controller binary wires itself against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoBackend {
    /// In-process simulated inputs/outputs (default; also used on the bench).
    #[default]
    Simulation,
}

/// Lift controller configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiftConfig {
    /// Motion watchdog window [s]. Must exceed the worst-case travel time
    /// between the two landings; if no limit switch stops the platform
    /// within this window the controller forces a stop.
    #[serde(default = "default_safety_time_s")]
    pub safety_time_s: f64,

    /// I/O backend selection.
    #[serde(default)]
    pub backend: IoBackend,
}

fn default_safety_time_s() -> f64 {
    23.0
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            safety_time_s: default_safety_time_s(),
            backend: IoBackend::Simulation,
        }
    }
}

impl LiftConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.safety_time_s.is_finite() || self.safety_time_s <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "safety_time_s must be a positive number of seconds, got {}",
                self.safety_time_s
            )));
        }
        Ok(())
    }

    /// Watchdog window as a `Duration`. Only valid after `validate()`.
    pub fn safety_time(&self) -> Duration {
        Duration::from_secs_f64(self.safety_time_s)
    }
}

// ─── Loading ────────────────────────────────────────────────────────

/// Load and validate the controller configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LiftConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    let config: LiftConfig =
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
