//! Service configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{HealthOptions, KeepAliveOptions, QuotaLimits};

/// Delivery-channel quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Hard cap on pending entries across every producer.
    pub max_total: usize,
    /// Slots left for other producers.
    pub reserved_non_alarm: usize,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        let limits = QuotaLimits::default();
        Self {
            max_total: limits.max_total,
            reserved_non_alarm: limits.reserved_non_alarm,
        }
    }
}

/// Health monitor timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Seconds between checks.
    pub check_interval_secs: u64,
    /// Seconds to wait after a restart before re-checking.
    pub verification_delay_secs: u64,
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// Seconds an open breaker blocks recovery.
    pub recovery_timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 300,
            verification_delay_secs: 5,
            failure_threshold: 3,
            recovery_timeout_secs: 60,
        }
    }
}

/// Keep-alive engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Loop volume, 0.0 to 1.0.
    pub volume: f32,
    /// Milliseconds between stop and start on restart.
    pub restart_delay_ms: u64,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            volume: 0.0,
            restart_delay_ms: 500,
        }
    }
}

/// Root service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Channel quota.
    pub quota: QuotaConfig,
    /// Health monitor settings.
    pub health: HealthConfig,
    /// Keep-alive settings.
    pub keep_alive: KeepAliveConfig,
    /// Upper bound on any single delivery-channel call, in milliseconds.
    pub channel_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            quota: QuotaConfig::default(),
            health: HealthConfig::default(),
            keep_alive: KeepAliveConfig::default(),
            channel_timeout_ms: 10_000,
        }
    }
}

impl QuotaConfig {
    /// Validate quota values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_total == 0 {
            return Err("max_total must be greater than 0".into());
        }
        if self.reserved_non_alarm >= self.max_total {
            return Err("reserved_non_alarm must leave at least one alarm slot".into());
        }
        Ok(())
    }

    /// Quota as used by the scheduler.
    #[must_use]
    pub const fn limits(&self) -> QuotaLimits {
        QuotaLimits {
            max_total: self.max_total,
            reserved_non_alarm: self.reserved_non_alarm,
        }
    }
}

impl HealthConfig {
    /// Validate health timing values.
    pub fn validate(&self) -> Result<(), String> {
        if self.check_interval_secs == 0 {
            return Err("check_interval_secs must be greater than 0".into());
        }
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be greater than 0".into());
        }
        if self.verification_delay_secs >= self.check_interval_secs {
            return Err("verification_delay_secs must be shorter than check_interval_secs".into());
        }
        Ok(())
    }

    /// Options as used by the monitor.
    #[must_use]
    pub const fn options(&self) -> HealthOptions {
        HealthOptions {
            check_interval: Duration::from_secs(self.check_interval_secs),
            verification_delay: Duration::from_secs(self.verification_delay_secs),
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
        }
    }
}

impl KeepAliveConfig {
    /// Validate keep-alive values.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err("volume must be between 0.0 and 1.0".into());
        }
        Ok(())
    }

    /// Options as used by the engine.
    #[must_use]
    pub const fn options(&self) -> KeepAliveOptions {
        KeepAliveOptions {
            volume: self.volume,
            restart_delay: Duration::from_millis(self.restart_delay_ms),
        }
    }
}

impl ServiceConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.quota.validate().map_err(|e| format!("quota invalid: {e}"))?;
        self.health
            .validate()
            .map_err(|e| format!("health invalid: {e}"))?;
        self.keep_alive
            .validate()
            .map_err(|e| format!("keep_alive invalid: {e}"))?;
        if self.channel_timeout_ms == 0 {
            return Err("channel_timeout_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Bound applied to each delivery-channel call.
    #[must_use]
    pub const fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `ALARM_LOT_*` environment variables, after
    /// loading a `.env` file if one is present. Unset variables keep their
    /// defaults.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(
            lookup: &dyn Fn(&str) -> Option<String>,
            key: &str,
            target: &mut T,
        ) -> Result<(), String> {
            if let Some(raw) = lookup(key) {
                *target = raw
                    .trim()
                    .parse()
                    .map_err(|_| format!("{key}: cannot parse `{raw}`"))?;
            }
            Ok(())
        }

        let mut cfg = Self::default();
        parse(&lookup, "ALARM_LOT_MAX_TOTAL", &mut cfg.quota.max_total)?;
        parse(&lookup, "ALARM_LOT_RESERVED_NON_ALARM", &mut cfg.quota.reserved_non_alarm)?;
        parse(&lookup, "ALARM_LOT_CHECK_INTERVAL_SECS", &mut cfg.health.check_interval_secs)?;
        parse(
            &lookup,
            "ALARM_LOT_VERIFICATION_DELAY_SECS",
            &mut cfg.health.verification_delay_secs,
        )?;
        parse(&lookup, "ALARM_LOT_FAILURE_THRESHOLD", &mut cfg.health.failure_threshold)?;
        parse(
            &lookup,
            "ALARM_LOT_RECOVERY_TIMEOUT_SECS",
            &mut cfg.health.recovery_timeout_secs,
        )?;
        parse(&lookup, "ALARM_LOT_VOLUME", &mut cfg.keep_alive.volume)?;
        parse(&lookup, "ALARM_LOT_RESTART_DELAY_MS", &mut cfg.keep_alive.restart_delay_ms)?;
        parse(&lookup, "ALARM_LOT_CHANNEL_TIMEOUT_MS", &mut cfg.channel_timeout_ms)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
