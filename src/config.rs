//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TurnstileError};
use crate::event::Principal;

/// Main configuration for the gating pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Identity gate configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Throttle gate configuration
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Pipeline shape configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Allow-list configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Principals permitted through the identity gate
    #[serde(default)]
    pub authorized_principals: Vec<Principal>,
}

/// Throttle gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Cooldown between admitted actions from one principal, in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// How often idle throttle records are swept, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Age past which an idle record is dropped, in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            sweep_interval_secs: default_sweep_interval(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_window_ms() -> u64 {
    500
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_idle_timeout() -> u64 {
    600
}

impl ThrottleConfig {
    /// The cooldown window as a duration.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// The sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// The idle timeout as a duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Pipeline shape configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Which named gate chain to run
    #[serde(default)]
    pub variant: PipelineVariant,
}

/// Named gate chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineVariant {
    /// Identity gate only
    AuthOnly,
    /// Throttle gate only
    ThrottleOnly,
    /// Throttle every event, then check the allow-list (production default)
    #[default]
    ThrottleThenAuth,
}

impl TurnstileConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TurnstileError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Apply environment overrides.
    ///
    /// `AUTHORIZED_PRINCIPALS` (comma-separated IDs) replaces the allow-list
    /// and `RATE_LIMIT_WINDOW_MS` replaces the cooldown window.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var("AUTHORIZED_PRINCIPALS") {
            self.auth.authorized_principals = parse_principal_list(&raw)?;
        }

        if let Ok(raw) = std::env::var("RATE_LIMIT_WINDOW_MS") {
            self.throttle.window_ms = raw.parse().map_err(|e| {
                TurnstileError::Config(format!("Invalid RATE_LIMIT_WINDOW_MS {:?}: {}", raw, e))
            })?;
        }

        Ok(())
    }
}

/// Parse a comma-separated list of principal IDs.
fn parse_principal_list(raw: &str) -> Result<Vec<Principal>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>().map(Principal).map_err(|e| {
                TurnstileError::Config(format!("Invalid principal id {:?}: {}", part, e))
            })
        })
        .collect()
}
