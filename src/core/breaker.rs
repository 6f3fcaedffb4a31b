//! Circuit breaker gating keep-alive recovery attempts.
//!
//! ```text
//! Closed --(failure_threshold consecutive failures)--> Open
//! Open   --(recovery_timeout since last failure)-----> HalfOpen
//! HalfOpen --success--> Closed
//! HalfOpen --failure--> Open (timeout clock restarts)
//! ```
//!
//! Time is passed in explicitly so the state machine stays deterministic.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Normal operation; recovery allowed.
    Closed,
    /// Recovery blocked until the timeout elapses.
    Open,
    /// Probing; the next outcome decides.
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Three-state circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: BreakerState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    /// Closed breaker tripping after `failure_threshold` failures.
    #[must_use]
    pub const fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            last_failure: None,
            failure_threshold,
            recovery_timeout,
        }
    }

    /// State as last transitioned, without applying the timeout.
    #[must_use]
    pub const fn state(&self) -> BreakerState {
        self.state
    }

    /// State as observed at `now`: an open breaker whose timeout has
    /// elapsed reads as half-open.
    #[must_use]
    pub fn state_at(&self, now: Instant) -> BreakerState {
        if self.state == BreakerState::Open && self.timeout_elapsed(now) {
            BreakerState::HalfOpen
        } else {
            self.state
        }
    }

    /// Failures since the last success.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether a recovery attempt may run at `now`.
    ///
    /// An open breaker whose timeout has elapsed moves to half-open here.
    pub fn allows_attempt(&mut self, now: Instant) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = self.timeout_elapsed(now);
                if elapsed {
                    info!("circuit breaker half-open, probing recovery");
                    self.state = BreakerState::HalfOpen;
                }
                elapsed
            }
        }
    }

    /// Record a successful check.
    pub fn record_success(&mut self) {
        if self.state != BreakerState::Closed {
            info!(from = %self.state, "circuit breaker closed");
        }
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
    }

    /// Record a failed check at `now`.
    pub fn record_failure(&mut self, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(now);
        match self.state {
            BreakerState::HalfOpen => {
                warn!("probe failed, circuit breaker re-opened");
                self.state = BreakerState::Open;
            }
            BreakerState::Closed if self.consecutive_failures >= self.failure_threshold => {
                warn!(
                    failures = self.consecutive_failures,
                    "circuit breaker opened"
                );
                self.state = BreakerState::Open;
            }
            _ => {}
        }
    }

    fn timeout_elapsed(&self, now: Instant) -> bool {
        self.last_failure
            .is_none_or(|at| now.saturating_duration_since(at) >= self.recovery_timeout)
    }

    /// Back to closed with a clean slate.
    pub fn reset(&mut self) {
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.last_failure = None;
    }
}
