use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::alert::domain::alert_controller::AlertController;
use crate::alert::domain::warning_sound::WarningSound;
use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::face_detector::FaceDetector;
use crate::proximity::domain::proximity_evaluator::ProximityEvaluator;
use crate::proximity::domain::threshold::Threshold;
use crate::shared::constants::{THRESHOLD_MAX, THRESHOLD_MIN};

use super::frame_throttle::FrameThrottle;
use super::infrastructure::session_lanes::{
    spawn_capture_lane, spawn_worker_lane, CaptureLaneOutput,
};
use super::pipeline_driver::PipelineDriver;
use super::session_config::SessionConfig;
use super::session_event::SessionEvent;
use super::session_logger::SessionLogger;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Session is already running")]
    AlreadyRunning,
    #[error("Cannot spawn {lane} lane: {source}")]
    LaneSpawn {
        lane: &'static str,
        source: std::io::Error,
    },
    #[error("{0} lane panicked")]
    LanePanicked(&'static str),
    #[error("Session components were lost in an earlier failure")]
    ComponentsLost,
}

/// Infrastructure a session runs on.
pub struct SessionComponents {
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn FaceDetector>,
    pub sound: Box<dyn WarningSound>,
    pub logger: Box<dyn SessionLogger>,
}

struct RunningLanes {
    capture: JoinHandle<CaptureLaneOutput>,
    worker: JoinHandle<PipelineDriver>,
}

/// A start/stop-able proximity monitoring session.
///
/// `start` opens the frame source and spawns a capture lane and a worker
/// lane; `stop` joins them and leaves the warning silent. Sessions can be
/// restarted. State reaches the caller only through the event channel
/// returned by [`ProximitySession::new`].
pub struct ProximitySession {
    threshold: Threshold,
    channel_capacity: usize,
    block_when_busy: bool,
    events: Sender<SessionEvent>,
    cancelled: Arc<AtomicBool>,
    source: Option<Box<dyn FrameSource>>,
    driver: Option<PipelineDriver>,
    lanes: Option<RunningLanes>,
}

impl ProximitySession {
    pub fn new(
        config: &SessionConfig,
        components: SessionComponents,
    ) -> (Self, Receiver<SessionEvent>) {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        let threshold = Threshold::new(
            config
                .effective_threshold()
                .clamp(THRESHOLD_MIN, THRESHOLD_MAX),
        );
        let evaluator =
            ProximityEvaluator::new(config.metric.build(), threshold.clone(), config.direction);
        let driver = PipelineDriver::new(
            FrameThrottle::new(config.frame_interval),
            components.detector,
            evaluator,
            AlertController::new(components.sound, config.warning_volume),
            config.face_policy,
        )
        .with_events(events_tx.clone())
        .with_logger(components.logger);

        let session = Self {
            threshold,
            channel_capacity: config.channel_capacity.max(1),
            block_when_busy: config.block_when_busy,
            events: events_tx,
            cancelled: Arc::new(AtomicBool::new(false)),
            source: Some(components.source),
            driver: Some(driver),
            lanes: None,
        };
        (session, events_rx)
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.lanes.is_some() {
            return Err(SessionError::AlreadyRunning);
        }
        let (Some(mut source), Some(mut driver)) = (self.source.take(), self.driver.take())
        else {
            return Err(SessionError::ComponentsLost);
        };

        let info = match source.open() {
            Ok(info) => info,
            Err(e) => {
                self.source = Some(source);
                self.driver = Some(driver);
                return Err(SessionError::DeviceUnavailable(e.to_string()));
            }
        };
        log::info!(
            "Session started on {} ({}x{}), threshold {:.2}",
            info.description,
            info.width,
            info.height,
            self.threshold.get()
        );

        driver.reset();
        self.cancelled.store(false, Ordering::Relaxed);
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(self.channel_capacity);

        let worker = spawn_worker_lane(
            driver,
            frame_rx,
            self.events.clone(),
            self.cancelled.clone(),
        )
        .map_err(|source| SessionError::LaneSpawn {
            lane: "worker",
            source,
        })?;

        let capture = match spawn_capture_lane(
            source,
            frame_tx,
            self.events.clone(),
            self.cancelled.clone(),
            self.block_when_busy,
        ) {
            Ok(handle) => handle,
            Err(source) => {
                // The worker exits once its frame channel is gone.
                self.cancelled.store(true, Ordering::Relaxed);
                self.driver = worker.join().ok();
                return Err(SessionError::LaneSpawn {
                    lane: "capture",
                    source,
                });
            }
        };

        self.lanes = Some(RunningLanes { capture, worker });
        Ok(())
    }

    /// Stops both lanes and silences the warning. Stopping an idle session
    /// does nothing.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        let Some(lanes) = self.lanes.take() else {
            return Ok(());
        };
        self.cancelled.store(true, Ordering::Relaxed);

        let capture = lanes.capture.join();
        let worker = lanes.worker.join();
        let mut first_error = None;

        let dropped = match capture {
            Ok(output) => {
                self.source = Some(output.source);
                output.dropped
            }
            Err(_) => {
                first_error = Some(SessionError::LanePanicked("capture"));
                0
            }
        };

        match worker {
            Ok(mut driver) => {
                driver.record_dropped(dropped);
                driver.silence();
                driver.finish();
                self.driver = Some(driver);
            }
            Err(_) => {
                first_error.get_or_insert(SessionError::LanePanicked("worker"));
            }
        }

        log::info!("Session stopped");
        let _ = self.events.send(SessionEvent::Stopped);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Clamps `value` to the accepted range, stores it for the next
    /// evaluation and returns what was stored.
    pub fn set_threshold(&self, value: f64) -> f64 {
        let stored = self.threshold.set_clamped(value);
        if stored != value {
            log::info!("Threshold {value} out of range, using {stored:.2}");
        } else {
            log::debug!("Threshold set to {stored:.2}");
        }
        stored
    }

    pub fn threshold(&self) -> f64 {
        self.threshold.get()
    }

    pub fn is_running(&self) -> bool {
        self.lanes.is_some()
    }
}

impl Drop for ProximitySession {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Session did not stop cleanly: {e}");
        }
    }
}
