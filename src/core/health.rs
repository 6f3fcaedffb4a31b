//! Health monitor for the background keep-alive.
//!
//! Every `check_interval`, while the app is backgrounded, the monitor
//! compares what the keep-alive engine is doing with what it should be
//! doing:
//!
//! ```text
//! healthy = should_be_active ? (is_active && is_playing) : !is_active
//! ```
//!
//! Unhealthy checks trigger a restart when the [`CircuitBreaker`] allows it,
//! followed by one verification after `verification_delay`. Foreground ticks
//! are skipped and not counted.
//!
//! Checks never fail or panic outward; a broken output only moves counters
//! and the breaker. A stopped monitor makes no further transitions: every
//! timer callback re-checks the generation it was started under.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::audit::{build_audit_event, record_to, AuditSink, SharedAuditSink};
use crate::core::breaker::{BreakerState, CircuitBreaker};
use crate::core::keep_alive::KeepAlive;
use crate::core::spawn::Spawn;
use crate::util::clock::now_ms;

/// Timing and threshold settings for [`HealthMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthOptions {
    /// Period between checks.
    pub check_interval: Duration,
    /// Wait after a restart before re-evaluating.
    pub verification_delay: Duration,
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// Time an open breaker blocks recovery.
    pub recovery_timeout: Duration,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5 * 60),
            verification_delay: Duration::from_secs(5),
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Accumulated monitor counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Checks evaluated (foreground skips excluded).
    pub total_checks: u64,
    /// Checks that found the keep-alive unhealthy.
    pub total_failures: u64,
    /// Restarts issued.
    pub total_recoveries: u64,
    /// Unhealthy checks since the last healthy or verified-recovered one.
    /// This is the streak the breaker trips on.
    pub consecutive_failures: u32,
    /// Wall-clock time of the last healthy check, ms since epoch.
    pub last_successful_check_ms: Option<u128>,
    /// Breaker state at snapshot time, with the recovery timeout applied.
    pub breaker_state: BreakerState,
}

impl Default for HealthMetrics {
    fn default() -> Self {
        Self {
            total_checks: 0,
            total_failures: 0,
            total_recoveries: 0,
            consecutive_failures: 0,
            last_successful_check_ms: None,
            breaker_state: BreakerState::Closed,
        }
    }
}

impl HealthMetrics {
    /// `(total_checks - total_failures) / total_checks`, or 0 with no checks.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_checks == 0 {
            return 0.0;
        }
        self.total_checks.saturating_sub(self.total_failures) as f64 / self.total_checks as f64
    }

    /// Breaker is open: background reliability is degraded.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.breaker_state == BreakerState::Open
    }
}

/// Result of a single health evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// App was in the foreground; nothing evaluated or counted.
    Skipped,
    /// Keep-alive matched its expected state.
    Healthy,
    /// Unhealthy, restarted, and verified healthy.
    Recovered,
    /// Unhealthy, restarted, still unhealthy after verification.
    StillUnhealthy,
    /// Unhealthy, but the open breaker blocked a restart.
    Suppressed,
    /// The monitor was stopped while the check was in flight.
    Cancelled,
}

struct MonitorState {
    metrics: HealthMetrics,
    breaker: CircuitBreaker,
}

struct Shared<K: ?Sized> {
    engine: Arc<K>,
    options: HealthOptions,
    state: Mutex<MonitorState>,
    generation: AtomicU64,
    monitoring: AtomicBool,
    audit: Option<SharedAuditSink>,
}

impl<K: KeepAlive + ?Sized> Shared<K> {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    async fn run(self: Arc<Self>, generation: u64, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                () = tokio::time::sleep(self.options.check_interval) => {}
                _ = shutdown.changed() => break,
            }
            if !self.is_current(generation) {
                break;
            }
            let outcome = self.check(generation, &mut shutdown).await;
            debug!(?outcome, "health tick");
            if outcome == CheckOutcome::Cancelled {
                break;
            }
        }
        debug!(generation, "health monitor loop exited");
    }

    async fn evaluate(&self) -> bool {
        if self.engine.should_be_active().await {
            self.engine.is_active() && self.engine.is_playing()
        } else {
            !self.engine.is_active()
        }
    }

    async fn check(&self, generation: u64, shutdown: &mut watch::Receiver<bool>) -> CheckOutcome {
        if !self.engine.is_backgrounded() {
            debug!("app in foreground, health check skipped");
            return CheckOutcome::Skipped;
        }

        let healthy = self.evaluate().await;
        if !self.is_current(generation) {
            return CheckOutcome::Cancelled;
        }

        let now = Instant::now();
        if healthy {
            let mut state = self.state.lock();
            state.metrics.total_checks += 1;
            state.metrics.last_successful_check_ms = Some(now_ms());
            state.breaker.record_success();
            return CheckOutcome::Healthy;
        }

        let (attempt, streak) = {
            let mut state = self.state.lock();
            state.metrics.total_checks += 1;
            state.metrics.total_failures += 1;
            let attempt = state.breaker.allows_attempt(now);
            state.breaker.record_failure(now);
            if attempt {
                state.metrics.total_recoveries += 1;
            }
            (attempt, state.breaker.consecutive_failures())
        };
        warn!(consecutive_failures = streak, "keep-alive unhealthy");

        if !attempt {
            warn!("circuit breaker open, recovery suppressed");
            record_to(
                self.audit.as_ref(),
                build_audit_event("keep_alive", "health", "suppressed", None),
            );
            return CheckOutcome::Suppressed;
        }

        record_to(
            self.audit.as_ref(),
            build_audit_event(
                "keep_alive",
                "health",
                "recovery",
                Some(format!("consecutive_failures={streak}")),
            ),
        );
        if let Err(err) = self.engine.restart().await {
            warn!("keep-alive restart failed: {err}");
        }

        tokio::select! {
            () = tokio::time::sleep(self.options.verification_delay) => {}
            _ = shutdown.changed() => return CheckOutcome::Cancelled,
        }
        if !self.is_current(generation) {
            return CheckOutcome::Cancelled;
        }

        let recovered = self.evaluate().await;
        if !self.is_current(generation) {
            return CheckOutcome::Cancelled;
        }
        if recovered {
            info!("keep-alive recovered");
            // A verified restart ends the streak the breaker counts.
            self.state.lock().breaker.record_success();
            record_to(
                self.audit.as_ref(),
                build_audit_event("keep_alive", "health", "recovered", None),
            );
            CheckOutcome::Recovered
        } else {
            warn!("keep-alive still unhealthy after restart");
            CheckOutcome::StillUnhealthy
        }
    }
}

/// Periodic supervisor of a [`KeepAlive`] engine.
pub struct HealthMonitor<K: ?Sized, Sp> {
    shared: Arc<Shared<K>>,
    spawner: Sp,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl<K, Sp> HealthMonitor<K, Sp>
where
    K: KeepAlive + ?Sized + 'static,
    Sp: Spawn,
{
    /// Create a stopped monitor.
    pub fn new(engine: Arc<K>, options: HealthOptions, spawner: Sp) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine,
                options,
                state: Mutex::new(MonitorState {
                    metrics: HealthMetrics::default(),
                    breaker: CircuitBreaker::new(
                        options.failure_threshold,
                        options.recovery_timeout,
                    ),
                }),
                generation: AtomicU64::new(0),
                monitoring: AtomicBool::new(false),
                audit: None,
            }),
            spawner,
            shutdown: Mutex::new(None),
        }
    }

    /// Attach an audit sink. Must be called before the monitor is started.
    #[must_use]
    pub fn with_audit(self, audit: Box<dyn AuditSink>) -> Self {
        self.with_shared_audit(Arc::new(Mutex::new(audit)))
    }

    /// Share an already-wrapped audit sink. Must be called before the
    /// monitor is started.
    #[must_use]
    pub fn with_shared_audit(mut self, audit: SharedAuditSink) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.audit = Some(audit);
        } else {
            warn!("audit sink ignored: monitor already running");
        }
        self
    }

    /// Settings in force.
    pub fn options(&self) -> &HealthOptions {
        &self.shared.options
    }

    /// Whether the periodic loop is running.
    pub fn is_monitoring(&self) -> bool {
        self.shared.monitoring.load(Ordering::Acquire)
    }

    /// Start periodic checks with zeroed counters. Idempotent: a running
    /// monitor keeps its counters.
    pub fn start(&self) {
        if self.shared.monitoring.swap(true, Ordering::AcqRel) {
            debug!("health monitor already running");
            return;
        }
        {
            let mut state = self.shared.state.lock();
            state.metrics = HealthMetrics::default();
            state.breaker.reset();
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let (tx, rx) = watch::channel(false);
        *self.shutdown.lock() = Some(tx);

        let shared = Arc::clone(&self.shared);
        self.spawner.spawn(shared.run(generation, rx));
        info!(
            interval_secs = self.shared.options.check_interval.as_secs(),
            "health monitor started"
        );
    }

    /// Stop periodic checks, cancel any pending verification, and close the
    /// breaker. Idempotent.
    pub fn stop(&self) {
        if !self.shared.monitoring.swap(false, Ordering::AcqRel) {
            debug!("health monitor already stopped");
            return;
        }
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }
        self.shared.state.lock().breaker.reset();
        info!("health monitor stopped");
    }

    /// Run one evaluation now, under the same rules as a periodic tick.
    pub async fn check_now(&self) -> CheckOutcome {
        let generation = self.shared.generation.load(Ordering::Acquire);
        let subscribed = self.shutdown.lock().as_ref().map(watch::Sender::subscribe);
        let (_idle, idle_rx) = watch::channel(false);
        let mut shutdown = subscribed.unwrap_or(idle_rx);
        self.shared.check(generation, &mut shutdown).await
    }

    /// Snapshot of the counters and breaker state.
    pub fn metrics(&self) -> HealthMetrics {
        let state = self.shared.state.lock();
        HealthMetrics {
            consecutive_failures: state.breaker.consecutive_failures(),
            breaker_state: state.breaker.state_at(Instant::now()),
            ..state.metrics.clone()
        }
    }

    /// Breaker is open: surface a degraded-reliability warning.
    pub fn is_degraded(&self) -> bool {
        self.shared.state.lock().breaker.state_at(Instant::now()) == BreakerState::Open
    }

    /// Zero every counter and close the breaker.
    pub fn reset_metrics(&self) {
        let mut state = self.shared.state.lock();
        state.metrics = HealthMetrics::default();
        state.breaker.reset();
    }
}

impl<K: ?Sized, Sp> Drop for HealthMonitor<K, Sp> {
    fn drop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(tx) = self.shutdown.get_mut().take() {
            let _ = tx.send(true);
        }
    }
}
