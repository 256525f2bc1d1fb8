use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("warning sound not found: {0}")]
    AssetMissing(PathBuf),
    #[error("cannot decode warning sound: {0}")]
    Decode(String),
    #[error("audio device error: {0}")]
    Device(String),
}

/// Domain interface for the looping audible warning.
pub trait WarningSound: Send {
    fn play(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self) -> Result<(), AudioError>;

    /// Rewinds so the next `play` starts from the beginning.
    fn reset_position(&mut self) -> Result<(), AudioError>;

    fn is_playing(&self) -> bool;

    /// `volume` in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError>;
}
