//! Service facade consumed by UI and CLI layers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{
    Alarm, AlarmStore, AppPhase, AudioOutput, BackgroundKeepAlive, CheckOutcome, DeliveryChannel,
    HealthMetrics, HealthMonitor, KeepAlive, KeepAliveState, NotificationScheduler, QueueStatus,
    SchedulerError, SchedulingReport, Spawn,
};
use crate::util::clock::now_ms;

/// Serializable view of the whole service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    /// Channel occupancy.
    pub queue: QueueStatus,
    /// Health monitor counters.
    pub health: HealthMetrics,
    /// Keep-alive lifecycle state.
    pub keep_alive: KeepAliveState,
    /// Last reported app phase.
    pub phase: AppPhase,
    /// Whether the monitor loop is running.
    pub monitoring: bool,
    /// Capture time (ms since epoch).
    pub captured_at_ms: u128,
}

/// Health response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Delivery channel reachable.
    pub ok: bool,
    /// Breaker open: background reliability is degraded.
    pub degraded: bool,
}

type Engine<O, S> = BackgroundKeepAlive<O, S>;

/// Scheduler, keep-alive engine, and health monitor behind one handle.
///
/// Scheduling entry points are serialized here, so a full pass never
/// interleaves with a single-alarm add or remove.
pub struct AlarmService<S: ?Sized, C: ?Sized, O: ?Sized, Sp> {
    scheduler: NotificationScheduler<S, C>,
    keep_alive: Arc<Engine<O, S>>,
    monitor: HealthMonitor<Engine<O, S>, Sp>,
    serial: tokio::sync::Mutex<()>,
}

impl<S, C, O, Sp> AlarmService<S, C, O, Sp>
where
    S: AlarmStore + ?Sized + 'static,
    C: DeliveryChannel + ?Sized,
    O: AudioOutput + ?Sized + 'static,
    Sp: Spawn,
{
    /// Assemble a service from already-built parts.
    pub fn new(
        scheduler: NotificationScheduler<S, C>,
        keep_alive: Arc<Engine<O, S>>,
        monitor: HealthMonitor<Engine<O, S>, Sp>,
    ) -> Self {
        Self {
            scheduler,
            keep_alive,
            monitor,
            serial: tokio::sync::Mutex::new(()),
        }
    }

    /// Underlying scheduler.
    pub fn scheduler(&self) -> &NotificationScheduler<S, C> {
        &self.scheduler
    }

    /// Underlying keep-alive engine.
    pub fn keep_alive(&self) -> &Engine<O, S> {
        &self.keep_alive
    }

    /// Underlying health monitor.
    pub fn monitor(&self) -> &HealthMonitor<Engine<O, S>, Sp> {
        &self.monitor
    }

    /// Run a full scheduling pass.
    ///
    /// # Errors
    ///
    /// See [`NotificationScheduler::schedule_all`].
    pub async fn schedule_all(&self) -> Result<SchedulingReport, SchedulerError> {
        let _serial = self.serial.lock().await;
        self.scheduler.schedule_all().await
    }

    /// Register one alarm and nudge the keep-alive.
    ///
    /// # Errors
    ///
    /// See [`NotificationScheduler::add`].
    pub async fn add(&self, alarm: &Alarm) -> Result<usize, SchedulerError> {
        let registered = {
            let _serial = self.serial.lock().await;
            self.scheduler.add(alarm).await?
        };
        if alarm.is_enabled {
            self.keep_alive.on_alarms_enabled();
        } else {
            self.settle_keep_alive().await;
        }
        Ok(registered)
    }

    /// Withdraw one alarm; stop the keep-alive if nothing is left enabled.
    ///
    /// # Errors
    ///
    /// See [`NotificationScheduler::remove`].
    pub async fn remove(&self, alarm: &Alarm) -> Result<(), SchedulerError> {
        {
            let _serial = self.serial.lock().await;
            self.scheduler.remove(alarm).await?;
        }
        self.settle_keep_alive().await;
        Ok(())
    }

    /// Channel occupancy.
    ///
    /// # Errors
    ///
    /// See [`NotificationScheduler::status`].
    pub async fn status(&self) -> Result<QueueStatus, SchedulerError> {
        self.scheduler.status().await
    }

    /// Health monitor counters.
    pub fn health_metrics(&self) -> HealthMetrics {
        self.monitor.metrics()
    }

    /// Start the periodic health loop.
    pub fn start_monitoring(&self) {
        self.monitor.start();
    }

    /// Stop the periodic health loop.
    pub fn stop_monitoring(&self) {
        self.monitor.stop();
    }

    /// Run one health evaluation immediately.
    pub async fn check_now(&self) -> CheckOutcome {
        self.monitor.check_now().await
    }

    /// App moved to the background.
    pub async fn on_enter_background(&self) {
        info!("app entered background");
        self.keep_alive.on_enter_background().await;
        self.monitor.start();
    }

    /// App moved to the foreground. The monitor keeps running and skips
    /// foreground ticks.
    pub async fn on_enter_foreground(&self) {
        info!("app entered foreground");
        self.keep_alive.on_enter_foreground().await;
    }

    /// External signal: alarms were enabled.
    pub fn on_alarms_enabled(&self) {
        self.keep_alive.on_alarms_enabled();
    }

    /// External signal: alarms were disabled.
    pub fn on_alarms_disabled(&self) {
        self.keep_alive.on_alarms_disabled();
    }

    /// Queue, health, and keep-alive state in one value.
    ///
    /// # Errors
    ///
    /// Fails only if the channel cannot be listed.
    pub async fn snapshot(&self) -> Result<ServiceSnapshot, SchedulerError> {
        let queue = self.status().await?;
        Ok(ServiceSnapshot {
            queue,
            health: self.monitor.metrics(),
            keep_alive: self.keep_alive.state(),
            phase: self.keep_alive.phase(),
            monitoring: self.monitor.is_monitoring(),
            captured_at_ms: now_ms(),
        })
    }

    /// Liveness summary.
    pub async fn health(&self) -> Health {
        let ok = match self.status().await {
            Ok(_) => true,
            Err(err) => {
                debug!("health probe: {err}");
                false
            }
        };
        Health {
            ok,
            degraded: self.monitor.is_degraded(),
        }
    }

    async fn settle_keep_alive(&self) {
        if self.keep_alive.is_active() && !self.keep_alive.should_be_active().await {
            self.keep_alive.on_alarms_disabled();
        }
    }
}
