//! Wire an [`AlarmService`] from a [`ServiceConfig`] and its collaborators.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::core::{
    AlarmStore, AudioOutput, BackgroundKeepAlive, DeliveryChannel, HealthMonitor,
    NotificationScheduler, SchedulerError, SharedAuditSink, Spawn,
};
use crate::runtime::AlarmService;
use crate::util::clock::WallClock;

/// Build the scheduler, keep-alive engine, and health monitor from `cfg`.
///
/// When `audit` is given, the scheduler and the monitor share it.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidConfig`] if `cfg` fails validation.
pub fn build_service<S, C, O, Sp>(
    cfg: &ServiceConfig,
    store: Arc<S>,
    channel: Arc<C>,
    output: Arc<O>,
    clock: Arc<dyn WallClock>,
    spawner: Sp,
    audit: Option<SharedAuditSink>,
) -> Result<AlarmService<S, C, O, Sp>, SchedulerError>
where
    S: AlarmStore + ?Sized + 'static,
    C: DeliveryChannel + ?Sized,
    O: AudioOutput + ?Sized + 'static,
    Sp: Spawn,
{
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let mut scheduler = NotificationScheduler::new(
        Arc::clone(&store),
        channel,
        cfg.quota.limits(),
        clock,
        cfg.channel_timeout(),
    );
    let keep_alive = Arc::new(BackgroundKeepAlive::new(
        output,
        store,
        cfg.keep_alive.options(),
    ));
    let mut monitor = HealthMonitor::new(Arc::clone(&keep_alive), cfg.health.options(), spawner);
    if let Some(audit) = audit {
        scheduler = scheduler.with_shared_audit(Arc::clone(&audit));
        monitor = monitor.with_shared_audit(audit);
    }

    tracing::info!(
        max_total = cfg.quota.max_total,
        reserved = cfg.quota.reserved_non_alarm,
        "alarm service built"
    );
    Ok(AlarmService::new(scheduler, keep_alive, monitor))
}
