pub mod alert_controller;
pub mod alert_snapshot;
pub mod warning_sound;
