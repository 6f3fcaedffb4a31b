//! Background keep-alive engine.
//!
//! Keeps the process from being suspended while alarms are pending by
//! running an endless near-silent output loop. The platform primitive sits
//! behind [`AudioOutput`]; the health monitor only sees [`KeepAlive`], so a
//! platform without suspension can plug in a no-op output.
//!
//! "Active" means `start` succeeded and no `stop` happened since. "Playing"
//! means the output is genuinely running. The two diverge when the output
//! stalls silently, which is what the health monitor watches for.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::{AlarmStore, KeepAliveError};

/// Platform output primitive used to stay alive in the background.
pub trait AudioOutput: Send + Sync {
    /// Acquire the output session.
    fn activate_session(&self) -> Result<(), KeepAliveError>;
    /// Release the output session.
    fn deactivate_session(&self) -> Result<(), KeepAliveError>;
    /// Start looping output at `volume` (0.0 is silent).
    fn play_loop(&self, volume: f32) -> Result<(), KeepAliveError>;
    /// Stop the loop.
    fn stop_loop(&self);
    /// Whether output is currently being produced.
    fn is_playing(&self) -> bool;
}

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepAliveState {
    /// Not running.
    Inactive,
    /// Started and not stopped since.
    Active,
}

/// Application phase as reported by lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppPhase {
    /// App is in the foreground; suspension is not a concern.
    Foreground,
    /// App is backgrounded and may be suspended.
    Background,
}

/// Keep-alive surface consumed by the health monitor.
#[async_trait]
pub trait KeepAlive: Send + Sync {
    /// Start the keep-alive activity. Idempotent.
    fn start(&self) -> Result<(), KeepAliveError>;
    /// Stop the keep-alive activity. Idempotent.
    fn stop(&self);
    /// Stop, wait briefly, start again. Recovery path only.
    async fn restart(&self) -> Result<(), KeepAliveError>;
    /// Whether the engine believes it is running.
    fn is_active(&self) -> bool;
    /// Whether output is genuinely being produced.
    fn is_playing(&self) -> bool;
    /// Whether the app is currently backgrounded.
    fn is_backgrounded(&self) -> bool;
    /// Whether the engine ought to be running: at least one enabled alarm exists.
    async fn should_be_active(&self) -> bool;
}

/// Tunables for [`BackgroundKeepAlive`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeepAliveOptions {
    /// Loop volume; 0.0 keeps it inaudible.
    pub volume: f32,
    /// Pause between stop and start during a restart.
    pub restart_delay: Duration,
}

impl Default for KeepAliveOptions {
    fn default() -> Self {
        Self {
            volume: 0.0,
            restart_delay: Duration::from_millis(500),
        }
    }
}

/// Keep-alive engine over an output primitive and the alarm store.
pub struct BackgroundKeepAlive<O: ?Sized, S: ?Sized> {
    output: Arc<O>,
    store: Arc<S>,
    options: KeepAliveOptions,
    state: Mutex<KeepAliveState>,
    phase: Mutex<AppPhase>,
}

impl<O, S> BackgroundKeepAlive<O, S>
where
    O: AudioOutput + ?Sized,
    S: AlarmStore + ?Sized,
{
    /// Create an inactive engine; the app is assumed to be in the foreground.
    pub fn new(output: Arc<O>, store: Arc<S>, options: KeepAliveOptions) -> Self {
        Self {
            output,
            store,
            options,
            state: Mutex::new(KeepAliveState::Inactive),
            phase: Mutex::new(AppPhase::Foreground),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> KeepAliveState {
        *self.state.lock()
    }

    /// Current app phase.
    pub fn phase(&self) -> AppPhase {
        *self.phase.lock()
    }

    /// App moved to the background: start if any alarm is enabled.
    pub async fn on_enter_background(&self) {
        *self.phase.lock() = AppPhase::Background;
        if self.should_be_active().await {
            if let Err(err) = self.start() {
                warn!("keep-alive failed to start on entering background: {err}");
            }
        }
    }

    /// App moved to the foreground: stop if no alarm needs us any more.
    pub async fn on_enter_foreground(&self) {
        *self.phase.lock() = AppPhase::Foreground;
        if self.is_active() && !self.should_be_active().await {
            self.stop();
        }
    }

    /// Alarms were enabled: start if backgrounded and idle.
    pub fn on_alarms_enabled(&self) {
        if self.is_backgrounded() && !self.is_active() {
            if let Err(err) = self.start() {
                warn!("keep-alive failed to start after alarms were enabled: {err}");
            }
        }
    }

    /// Alarms were disabled: stop.
    pub fn on_alarms_disabled(&self) {
        self.stop();
    }
}

#[async_trait]
impl<O, S> KeepAlive for BackgroundKeepAlive<O, S>
where
    O: AudioOutput + ?Sized,
    S: AlarmStore + ?Sized,
{
    fn start(&self) -> Result<(), KeepAliveError> {
        let mut state = self.state.lock();
        if *state == KeepAliveState::Active {
            debug!("keep-alive already active");
            return Ok(());
        }

        self.output.activate_session()?;
        if let Err(err) = self.output.play_loop(self.options.volume) {
            if let Err(release) = self.output.deactivate_session() {
                warn!("failed to release session after playback error: {release}");
            }
            return Err(err);
        }

        *state = KeepAliveState::Active;
        info!(volume = self.options.volume, "keep-alive started");
        Ok(())
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        if *state == KeepAliveState::Inactive {
            debug!("keep-alive already inactive");
            return;
        }

        self.output.stop_loop();
        if let Err(err) = self.output.deactivate_session() {
            warn!("failed to release keep-alive session: {err}");
        }
        *state = KeepAliveState::Inactive;
        info!("keep-alive stopped");
    }

    async fn restart(&self) -> Result<(), KeepAliveError> {
        info!("restarting keep-alive");
        self.stop();
        tokio::time::sleep(self.options.restart_delay).await;
        self.start()
    }

    fn is_active(&self) -> bool {
        *self.state.lock() == KeepAliveState::Active
    }

    fn is_playing(&self) -> bool {
        self.output.is_playing()
    }

    fn is_backgrounded(&self) -> bool {
        *self.phase.lock() == AppPhase::Background
    }

    async fn should_be_active(&self) -> bool {
        match self.store.list_enabled().await {
            Ok(alarms) => alarms.iter().any(|a| a.is_enabled),
            Err(err) => {
                warn!("cannot read alarm store, keeping keep-alive state: {err}");
                self.is_active()
            }
        }
    }
}
