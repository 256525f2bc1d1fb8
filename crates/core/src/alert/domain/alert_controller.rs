use crate::proximity::domain::proximity_evaluator::EvaluationResult;

use super::alert_snapshot::AlertSnapshot;
use super::warning_sound::{AudioError, WarningSound};

/// Owns the alert state and drives the warning sound.
///
/// Side effects are idempotent: repeated "too close" results never restart
/// a playing warning, and repeated "safe" results never touch a silent
/// device. Device failures are logged; the published state still updates.
pub struct AlertController {
    sound: Box<dyn WarningSound>,
    volume: f32,
    snapshot: AlertSnapshot,
}

impl AlertController {
    pub fn new(sound: Box<dyn WarningSound>, volume: f32) -> Self {
        Self {
            sound,
            volume,
            snapshot: AlertSnapshot::default(),
        }
    }

    pub fn snapshot(&self) -> &AlertSnapshot {
        &self.snapshot
    }

    pub fn is_alerting(&self) -> bool {
        self.snapshot.is_alerting
    }

    /// Applies one evaluation. Returns `true` if the alert state flipped.
    pub fn on_evaluation(&mut self, result: &EvaluationResult) -> bool {
        let was_alerting = self.snapshot.is_alerting;
        self.snapshot.display_label = result.display_label.clone();
        self.snapshot.is_alerting = result.is_too_close;

        if result.is_too_close {
            self.start_warning();
        } else if was_alerting || self.sound.is_playing() {
            self.stop_warning();
        }

        was_alerting != result.is_too_close
    }

    /// Updates the label without touching the alert state.
    pub fn set_label(&mut self, label: String) {
        self.snapshot.display_label = label;
    }

    /// Forces the silent state, stopping and rewinding the sound whatever
    /// the current state is.
    pub fn silence(&mut self) {
        self.snapshot.is_alerting = false;
        self.stop_warning();
    }

    fn start_warning(&mut self) {
        if self.sound.is_playing() {
            return;
        }
        let started = self
            .sound
            .set_volume(self.volume)
            .and_then(|_| self.sound.play());
        log_audio_failure("start", started);
    }

    fn stop_warning(&mut self) {
        let stopped = self
            .sound
            .stop()
            .and_then(|_| self.sound.reset_position());
        log_audio_failure("stop", stopped);
    }
}

fn log_audio_failure(action: &str, result: Result<(), AudioError>) {
    if let Err(e) = result {
        log::warn!("Could not {action} warning sound: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::INITIAL_LABEL;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Call {
        Play,
        Stop,
        Reset,
        Volume(f32),
    }

    /// Records device calls and behaves like a looping player.
    struct RecordingSound {
        calls: Arc<Mutex<Vec<Call>>>,
        playing: bool,
        fail: bool,
    }

    impl RecordingSound {
        fn new() -> (Self, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    calls: calls.clone(),
                    playing: false,
                    fail: false,
                },
                calls,
            )
        }

        fn record(&self, call: Call) -> Result<(), AudioError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(AudioError::Device("unplugged".into()))
            } else {
                Ok(())
            }
        }
    }

    impl WarningSound for RecordingSound {
        fn play(&mut self) -> Result<(), AudioError> {
            self.record(Call::Play)?;
            self.playing = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), AudioError> {
            self.record(Call::Stop)?;
            self.playing = false;
            Ok(())
        }

        fn reset_position(&mut self) -> Result<(), AudioError> {
            self.record(Call::Reset)
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
            self.record(Call::Volume(volume))
        }
    }

    fn result(is_too_close: bool) -> EvaluationResult {
        let metric = if is_too_close { 0.05 } else { 0.2 };
        EvaluationResult {
            is_too_close,
            display_label: format!("Calculated face area: {metric:.4}"),
            reading: Some(metric),
        }
    }

    fn controller() -> (AlertController, Arc<Mutex<Vec<Call>>>) {
        let (sound, calls) = RecordingSound::new();
        (AlertController::new(Box::new(sound), 1.0), calls)
    }

    #[test]
    fn test_starts_silent_with_initial_label() {
        let (ctrl, calls) = controller();
        assert!(!ctrl.is_alerting());
        assert_eq!(ctrl.snapshot().display_label, INITIAL_LABEL);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_silent_to_alerting_starts_sound_at_full_volume() {
        let (mut ctrl, calls) = controller();

        assert!(ctrl.on_evaluation(&result(true)));

        assert!(ctrl.is_alerting());
        assert_eq!(ctrl.snapshot().display_label, "Calculated face area: 0.0500");
        assert_eq!(*calls.lock().unwrap(), vec![Call::Volume(1.0), Call::Play]);
    }

    #[test]
    fn test_alerting_stays_alerting_without_restart() {
        let (mut ctrl, calls) = controller();
        ctrl.on_evaluation(&result(true));

        assert!(!ctrl.on_evaluation(&result(true)));
        assert!(!ctrl.on_evaluation(&result(true)));

        assert!(ctrl.is_alerting());
        assert_eq!(*calls.lock().unwrap(), vec![Call::Volume(1.0), Call::Play]);
    }

    #[test]
    fn test_alerting_to_silent_stops_and_rewinds() {
        let (mut ctrl, calls) = controller();
        ctrl.on_evaluation(&result(true));

        assert!(ctrl.on_evaluation(&result(false)));

        assert!(!ctrl.is_alerting());
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Call::Volume(1.0), Call::Play, Call::Stop, Call::Reset]
        );
    }

    #[test]
    fn test_silent_stays_silent_without_device_calls() {
        let (mut ctrl, calls) = controller();

        assert!(!ctrl.on_evaluation(&result(false)));
        assert!(!ctrl.on_evaluation(&result(false)));

        assert!(!ctrl.is_alerting());
        assert_eq!(ctrl.snapshot().display_label, "Calculated face area: 0.2000");
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_never_two_plays_or_stops_in_a_row() {
        let (mut ctrl, calls) = controller();
        let pattern = [
            true, true, false, false, true, false, true, true, true, false, false, true,
        ];
        for too_close in pattern {
            ctrl.on_evaluation(&result(too_close));
        }

        let transport: Vec<Call> = calls
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|c| matches!(c, Call::Play | Call::Stop))
            .collect();
        assert!(transport.windows(2).all(|pair| pair[0] != pair[1]));
        assert_eq!(transport.first(), Some(&Call::Play));
        assert_eq!(transport.len(), 7);
    }

    #[test]
    fn test_silence_stops_even_when_silent() {
        let (mut ctrl, calls) = controller();

        ctrl.silence();

        assert!(!ctrl.is_alerting());
        assert_eq!(*calls.lock().unwrap(), vec![Call::Stop, Call::Reset]);
    }

    #[test]
    fn test_silence_after_alert() {
        let (mut ctrl, calls) = controller();
        ctrl.on_evaluation(&result(true));

        ctrl.silence();

        assert!(!ctrl.is_alerting());
        assert_eq!(calls.lock().unwrap().last(), Some(&Call::Reset));
    }

    #[test]
    fn test_set_label_keeps_alert_state() {
        let (mut ctrl, _) = controller();
        ctrl.on_evaluation(&result(true));

        ctrl.set_label("No reading: missing landmarks: left-eye".into());

        assert!(ctrl.is_alerting());
        assert_eq!(
            ctrl.snapshot().display_label,
            "No reading: missing landmarks: left-eye"
        );
    }

    #[test]
    fn test_device_failure_still_updates_state() {
        let (mut sound, calls) = RecordingSound::new();
        sound.fail = true;
        let mut ctrl = AlertController::new(Box::new(sound), 0.5);

        assert!(ctrl.on_evaluation(&result(true)));
        assert!(ctrl.is_alerting());
        // set_volume failed, so play was never attempted
        assert_eq!(*calls.lock().unwrap(), vec![Call::Volume(0.5)]);

        assert!(ctrl.on_evaluation(&result(false)));
        assert!(!ctrl.is_alerting());
    }
}
