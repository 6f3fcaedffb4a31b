//! Output for platforms that never suspend background work.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::{AudioOutput, KeepAliveError};

/// Output that only remembers whether it was asked to play.
#[derive(Debug, Default)]
pub struct NoopOutput {
    playing: AtomicBool,
}

impl NoopOutput {
    /// Idle no-op output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioOutput for NoopOutput {
    fn activate_session(&self) -> Result<(), KeepAliveError> {
        Ok(())
    }

    fn deactivate_session(&self) -> Result<(), KeepAliveError> {
        Ok(())
    }

    fn play_loop(&self, _volume: f32) -> Result<(), KeepAliveError> {
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn stop_loop(&self) {
        self.playing.store(false, Ordering::Release);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }
}
