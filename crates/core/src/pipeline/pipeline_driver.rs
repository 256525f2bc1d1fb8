use std::time::Instant;

use crossbeam_channel::Sender;

use crate::alert::domain::alert_controller::AlertController;
use crate::alert::domain::alert_snapshot::AlertSnapshot;
use crate::detection::domain::face_detector::FaceDetector;
use crate::proximity::domain::proximity_evaluator::{EvaluationResult, ProximityEvaluator};
use crate::proximity::domain::threshold::Threshold;
use crate::shared::frame::Frame;

use super::face_policy::FacePolicy;
use super::frame_throttle::FrameThrottle;
use super::session_event::SessionEvent;
use super::session_logger::{NullSessionLogger, SessionLogger};

/// What happened to one incoming frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// The throttle held the frame back; nothing ran.
    Skipped,
    /// Detection found nothing usable; state unchanged, nothing published.
    NoFaces,
    /// The frame was evaluated and this snapshot published.
    Evaluated(AlertSnapshot),
}

/// Runs one frame through throttle, detection, evaluation and alerting.
///
/// Lives on the worker lane. State changes are published as
/// [`SessionEvent::State`] messages, once per evaluated frame.
pub struct PipelineDriver {
    throttle: FrameThrottle,
    detector: Box<dyn FaceDetector>,
    evaluator: ProximityEvaluator,
    alert: AlertController,
    policy: FacePolicy,
    events: Option<Sender<SessionEvent>>,
    logger: Box<dyn SessionLogger>,
}

impl PipelineDriver {
    pub fn new(
        throttle: FrameThrottle,
        detector: Box<dyn FaceDetector>,
        evaluator: ProximityEvaluator,
        alert: AlertController,
        policy: FacePolicy,
    ) -> Self {
        Self {
            throttle,
            detector,
            evaluator,
            alert,
            policy,
            events: None,
            logger: Box::new(NullSessionLogger),
        }
    }

    pub fn with_events(mut self, events: Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn SessionLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn on_frame(&mut self, frame: &Frame) -> FrameOutcome {
        self.logger.frame_seen();
        if !self.throttle.should_process() {
            return FrameOutcome::Skipped;
        }
        self.logger.frame_sampled();

        let t0 = Instant::now();
        let faces = match self.detector.detect(frame) {
            Ok(faces) => faces,
            Err(e) => {
                log::debug!("Frame {}: detection failed: {e}", frame.index());
                return FrameOutcome::NoFaces;
            }
        };
        self.logger
            .timing("detect", t0.elapsed().as_secs_f64() * 1000.0);

        if faces.is_empty() {
            log::debug!("Frame {}: no faces", frame.index());
            return FrameOutcome::NoFaces;
        }

        let t0 = Instant::now();
        let results: Vec<EvaluationResult> =
            faces.iter().map(|f| self.evaluator.evaluate(f)).collect();
        self.apply(results);
        self.logger
            .timing("evaluate", t0.elapsed().as_secs_f64() * 1000.0);

        let snapshot = self.alert.snapshot().clone();
        log::debug!(
            "Frame {}: {} face(s), {}",
            frame.index(),
            faces.len(),
            snapshot.display_label
        );
        self.publish(SessionEvent::State(snapshot.clone()));
        FrameOutcome::Evaluated(snapshot)
    }

    fn apply(&mut self, results: Vec<EvaluationResult>) {
        let (readable, unreadable): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|r| r.reading.is_some());

        if readable.is_empty() {
            if let Some(last) = unreadable.last() {
                self.alert.set_label(last.display_label.clone());
            }
            return;
        }

        match self.policy {
            FacePolicy::LastWins => {
                for result in &readable {
                    self.feed(result);
                }
            }
            FacePolicy::AnyTooClose => {
                let decisive = readable
                    .iter()
                    .find(|r| r.is_too_close)
                    .or_else(|| readable.last());
                if let Some(result) = decisive {
                    self.feed(result);
                }
            }
        }
    }

    fn feed(&mut self, result: &EvaluationResult) {
        if self.alert.on_evaluation(result) {
            let alerting = self.alert.is_alerting();
            if alerting {
                log::info!("Too close: {}", result.display_label);
            } else {
                log::info!("Back at a safe distance: {}", result.display_label);
            }
            self.logger.alert_changed(alerting);
        }
    }

    fn publish(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // A closed channel means nobody is listening any more.
            let _ = events.send(event);
        }
    }

    /// Forces the warning off whatever the current state.
    pub fn silence(&mut self) {
        let was_alerting = self.alert.is_alerting();
        self.alert.silence();
        if was_alerting {
            self.logger.alert_changed(false);
        }
    }

    pub fn snapshot(&self) -> &AlertSnapshot {
        self.alert.snapshot()
    }

    pub fn threshold(&self) -> &Threshold {
        self.evaluator.threshold()
    }

    pub fn record_dropped(&mut self, count: usize) {
        if count > 0 {
            self.logger.frames_dropped(count);
        }
    }

    /// Restarts the sampling cadence and the logger's counters for a new run.
    pub fn reset(&mut self) {
        self.throttle.reset();
        self.logger.session_started();
    }

    /// Emits the session summary.
    pub fn finish(&self) {
        self.logger.summary();
    }
}
