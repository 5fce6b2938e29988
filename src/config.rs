//! Framework configuration
//!
//! Poll presets are plain values handed to the framework at construction;
//! `from_env` lets a CI job stretch them without recompiling.

use std::time::Duration;

use crate::error::ConfigError;
use crate::poll::PollProfile;

/// MySQL port exposed by every member pod
pub const MYSQL_PORT: u16 = 3306;

pub const ENV_POLL_INTERVAL_MS: &str = "MYSQL_E2E_POLL_INTERVAL_MS";
pub const ENV_POLL_TIMEOUT_SECS: &str = "MYSQL_E2E_POLL_TIMEOUT_SECS";
pub const ENV_FAILOVER_INTERVAL_MS: &str = "MYSQL_E2E_FAILOVER_INTERVAL_MS";
pub const ENV_FAILOVER_TIMEOUT_SECS: &str = "MYSQL_E2E_FAILOVER_TIMEOUT_SECS";
pub const ENV_SIDECAR_IMAGE: &str = "MYSQL_E2E_SIDECAR_IMAGE";

/// Settings shared by every wait issued through a framework
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameworkConfig {
    /// Steady-state condition checks
    pub standard: PollProfile,
    /// Checks made while a failure is being induced
    pub failover: PollProfile,
    /// Sidecar image to put into clusters created by tests
    pub sidecar_image: Option<String>,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            standard: PollProfile::STANDARD,
            failover: PollProfile::FAILOVER,
            sidecar_image: None,
        }
    }
}

impl FrameworkConfig {
    /// Defaults overridden by `MYSQL_E2E_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_u64(&lookup, ENV_POLL_INTERVAL_MS)? {
            config.standard.interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_u64(&lookup, ENV_POLL_TIMEOUT_SECS)? {
            config.standard.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_u64(&lookup, ENV_FAILOVER_INTERVAL_MS)? {
            config.failover.interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_u64(&lookup, ENV_FAILOVER_TIMEOUT_SECS)? {
            config.failover.timeout = Duration::from_secs(secs);
        }
        config.sidecar_image = lookup(ENV_SIDECAR_IMAGE).filter(|s| !s.is_empty());

        for (var, profile) in [
            (ENV_POLL_INTERVAL_MS, config.standard),
            (ENV_FAILOVER_INTERVAL_MS, config.failover),
        ] {
            if profile.interval.is_zero() {
                return Err(ConfigError::InvalidVar {
                    var,
                    value: "0".to_string(),
                    reason: "interval must be positive".to_string(),
                });
            }
        }

        Ok(config)
    }
}

fn parse_u64<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidVar {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
