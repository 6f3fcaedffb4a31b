//! Simulated keep-alive output.
//!
//! Tracks session and loop state in memory and can be told to stall
//! silently or to refuse activation, which is how the health monitor's
//! recovery paths get exercised.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{AudioOutput, KeepAliveError};

#[derive(Debug, Default)]
struct OutputState {
    session_active: bool,
    playing: bool,
    volume: f32,
    fail_activation: bool,
    fail_playback: bool,
    activations: u32,
    plays: u32,
}

/// In-memory output. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedOutput {
    state: Arc<Mutex<OutputState>>,
}

impl SimulatedOutput {
    /// Idle output with no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Silently stop producing output while leaving the session held.
    pub fn stall(&self) {
        self.state.lock().playing = false;
    }

    /// Make `activate_session` fail while set.
    pub fn set_activation_failure(&self, fail: bool) {
        self.state.lock().fail_activation = fail;
    }

    /// Make `play_loop` fail while set.
    pub fn set_playback_failure(&self, fail: bool) {
        self.state.lock().fail_playback = fail;
    }

    /// Whether the session is held.
    #[must_use]
    pub fn session_active(&self) -> bool {
        self.state.lock().session_active
    }

    /// Successful session activations so far.
    #[must_use]
    pub fn activations(&self) -> u32 {
        self.state.lock().activations
    }

    /// Successful loop starts so far.
    #[must_use]
    pub fn play_count(&self) -> u32 {
        self.state.lock().plays
    }

    /// Volume of the most recent loop.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }
}

impl AudioOutput for SimulatedOutput {
    fn activate_session(&self) -> Result<(), KeepAliveError> {
        let mut state = self.state.lock();
        if state.fail_activation {
            return Err(KeepAliveError::Session("session activation refused".into()));
        }
        state.session_active = true;
        state.activations += 1;
        Ok(())
    }

    fn deactivate_session(&self) -> Result<(), KeepAliveError> {
        self.state.lock().session_active = false;
        Ok(())
    }

    fn play_loop(&self, volume: f32) -> Result<(), KeepAliveError> {
        let mut state = self.state.lock();
        if state.fail_playback {
            return Err(KeepAliveError::Playback("loop could not start".into()));
        }
        if !state.session_active {
            return Err(KeepAliveError::Playback("no active session".into()));
        }
        state.playing = true;
        state.volume = volume;
        state.plays += 1;
        Ok(())
    }

    fn stop_loop(&self) {
        self.state.lock().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }
}
