//! Port fakes shared by the driver and session tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::alert::domain::warning_sound::{AudioError, WarningSound};
use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::session_logger::SessionLogger;
use crate::shared::frame::Frame;
use crate::shared::observation::{FaceObservation, NormalizedRect};

pub fn frame(index: usize) -> Frame {
    Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, index)
}

pub fn face_with_area(width: f64, height: f64) -> FaceObservation {
    FaceObservation::new(NormalizedRect::new(0.1, 0.1, width, height))
}

/// Returns the same faces for every frame and counts calls.
pub struct ScriptedDetector {
    faces: Vec<FaceObservation>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn new(faces: Vec<FaceObservation>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                faces,
                fail: false,
                calls: calls.clone(),
            },
            calls,
        )
    }

    pub fn failing() -> Self {
        Self {
            faces: Vec::new(),
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err("model exploded".into());
        }
        Ok(self.faces.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SoundCall {
    Play,
    Stop,
    Reset,
    Volume(f32),
}

pub type SoundLog = Arc<Mutex<Vec<SoundCall>>>;

/// Records device calls and behaves like a looping player.
pub struct RecordingSound {
    calls: SoundLog,
    playing: bool,
}

impl RecordingSound {
    pub fn new() -> (Self, SoundLog) {
        let calls = SoundLog::default();
        (
            Self {
                calls: calls.clone(),
                playing: false,
            },
            calls,
        )
    }

    fn record(&self, call: SoundCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl WarningSound for RecordingSound {
    fn play(&mut self) -> Result<(), AudioError> {
        self.record(SoundCall::Play);
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.record(SoundCall::Stop);
        self.playing = false;
        Ok(())
    }

    fn reset_position(&mut self) -> Result<(), AudioError> {
        self.record(SoundCall::Reset);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), AudioError> {
        self.record(SoundCall::Volume(volume));
        Ok(())
    }
}

/// Counts `session_started` calls and ignores everything else.
pub struct RunCountingLogger {
    runs: Arc<AtomicUsize>,
}

impl RunCountingLogger {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        (Self { runs: runs.clone() }, runs)
    }
}

impl SessionLogger for RunCountingLogger {
    fn session_started(&mut self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
    }
    fn frame_seen(&mut self) {}
    fn frame_sampled(&mut self) {}
    fn frames_dropped(&mut self, _count: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn alert_changed(&mut self, _is_alerting: bool) {}
}

/// Synthetic frame source: a fixed number of frames, or an endless paced
/// feed standing in for a live camera.
pub struct VecFrameSource {
    count: Option<usize>,
    pace: Duration,
    fail_open: bool,
    fail_after: Option<usize>,
    opens: Arc<AtomicUsize>,
}

impl VecFrameSource {
    pub fn finite(count: usize) -> Self {
        Self {
            count: Some(count),
            pace: Duration::ZERO,
            fail_open: false,
            fail_after: None,
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn live() -> Self {
        Self {
            count: None,
            pace: Duration::from_millis(2),
            ..Self::finite(0)
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fail_open: true,
            ..Self::finite(0)
        }
    }

    /// Yields `count` frames, then a read error.
    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_after: Some(count),
            ..Self::finite(count + 1)
        }
    }

    pub fn opens(&self) -> Arc<AtomicUsize> {
        self.opens.clone()
    }
}

impl FrameSource for VecFrameSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        if self.fail_open {
            return Err("camera busy".into());
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(SourceInfo {
            width: 4,
            height: 4,
            fps: 30.0,
            description: "synthetic".into(),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let pace = self.pace;
        let fail_after = self.fail_after;
        let indices: Box<dyn Iterator<Item = usize>> = match self.count {
            Some(count) => Box::new(0..count),
            None => Box::new(0..),
        };
        Box::new(indices.map(move |index| {
            if !pace.is_zero() {
                thread::sleep(pace);
            }
            if fail_after == Some(index) {
                return Err("read failed".into());
            }
            Ok(frame(index))
        }))
    }

    fn close(&mut self) {}
}
