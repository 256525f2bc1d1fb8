use crate::shared::frame::Frame;
use crate::shared::observation::FaceObservation;

/// Domain interface for facial-landmark detection.
///
/// Returns zero or more observations per frame. Callers treat an error the
/// same as an empty result: the frame is skipped.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>>;
}
