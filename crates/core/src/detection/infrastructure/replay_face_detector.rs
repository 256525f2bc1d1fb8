use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::observation::FaceObservation;

/// Replays pre-recorded observations by frame index.
///
/// Lets a session run against a capture without a detection model, e.g.
/// observations exported from another detector or written by hand for a
/// demo. Frames with no entry yield no faces.
pub struct ReplayFaceDetector {
    recording: Arc<HashMap<usize, Vec<FaceObservation>>>,
}

#[derive(Deserialize)]
struct RecordedFrame {
    frame: usize,
    #[serde(default)]
    faces: Vec<FaceObservation>,
}

impl ReplayFaceDetector {
    pub fn new(recording: Arc<HashMap<usize, Vec<FaceObservation>>>) -> Self {
        Self { recording }
    }

    /// Parses `[{"frame": 0, "faces": [...]}, ...]`.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let frames: Vec<RecordedFrame> = serde_json::from_str(json)?;
        let recording = frames.into_iter().map(|f| (f.frame, f.faces)).collect();
        Ok(Self::new(Arc::new(recording)))
    }

    pub fn from_path(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read replay file {}: {e}", path.display()))?;
        Ok(Self::from_json_str(&json)?)
    }

    pub fn recorded_frames(&self) -> usize {
        self.recording.len()
    }
}

impl FaceDetector for ReplayFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
        Ok(self
            .recording
            .get(&frame.index())
            .cloned()
            .unwrap_or_default())
    }
}
