pub mod rodio_warning_sound;
pub mod silent_warning_sound;
pub mod warning_sound_factory;
