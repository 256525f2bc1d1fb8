use std::path::Path;

use crate::alert::domain::warning_sound::WarningSound;

use super::rodio_warning_sound::RodioWarningSound;
use super::silent_warning_sound::SilentWarningSound;

/// Opens the warning sound at `path`, degrading to silence when the asset
/// or the output device is unavailable. The alert state keeps updating
/// either way; only the audible effect is lost.
pub fn open_warning_sound(path: Option<&Path>) -> Box<dyn WarningSound> {
    let Some(path) = path else {
        log::info!("No warning sound configured; alerts will be silent");
        return Box::new(SilentWarningSound::new());
    };

    match RodioWarningSound::open(path) {
        Ok(sound) => Box::new(sound),
        Err(e) => {
            log::warn!("{e}; alerts will be silent");
            Box::new(SilentWarningSound::new())
        }
    }
}
