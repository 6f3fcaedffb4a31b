//! Error types for scheduler and keep-alive operations.

use thiserror::Error;

/// Errors produced by the scheduling side of the crate.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Not enough alarm slots left to register the alarm. Nothing was changed
    /// in the channel.
    #[error("queue full: alarm needs {needed} slot(s), {available} available")]
    QuotaExceeded {
        /// Entries the alarm would register.
        needed: usize,
        /// Alarm slots currently free.
        available: usize,
    },
    /// The delivery channel failed or timed out.
    #[error("delivery channel unavailable: {0}")]
    ChannelUnavailable(String),
    /// A recurring alarm failed partway and its entries were withdrawn.
    #[error("alarm {alarm_id} rolled back after {registered} registration(s): {reason}")]
    PartialRegistrationRolledBack {
        /// Alarm whose registration was undone.
        alarm_id: String,
        /// Entries that had succeeded before the failure.
        registered: usize,
        /// The failure that triggered the rollback.
        reason: String,
    },
    /// Caller supplied an alarm that cannot be scheduled.
    #[error("invalid alarm: {0}")]
    InvalidAlarm(String),
    /// The alarm store could not be read.
    #[error("alarm store unavailable: {0}")]
    StoreUnavailable(String),
    /// Service configuration failed validation.
    #[error("config invalid: {0}")]
    InvalidConfig(String),
}

impl SchedulerError {
    /// Whether retrying the same call later can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidAlarm(_) | Self::InvalidConfig(_))
    }
}

/// Errors produced by the background output primitive.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeepAliveError {
    /// The output session could not be activated or released.
    #[error("session error: {0}")]
    Session(String),
    /// The loop could not be started.
    #[error("playback error: {0}")]
    Playback(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
