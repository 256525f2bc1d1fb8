use crate::alert::domain::warning_sound::{AudioError, WarningSound};

/// Warning sound used when no audio can be played.
///
/// Tracks the requested transport state so the controller's idempotence
/// logic behaves the same as with a real device.
#[derive(Debug, Default)]
pub struct SilentWarningSound {
    playing: bool,
}

impl SilentWarningSound {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WarningSound for SilentWarningSound {
    fn play(&mut self) -> Result<(), AudioError> {
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.playing = false;
        Ok(())
    }

    fn reset_position(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_volume(&mut self, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}
