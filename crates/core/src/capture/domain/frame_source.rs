use crate::shared::frame::Frame;

/// What a capture source reported when it was opened.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Native frame rate; 0.0 when unknown.
    pub fps: f64,
    pub description: String,
}

/// Produces camera frames in capture order.
///
/// A source is opened once per session start and may be reopened after
/// `close`. `open` failing means the device is unavailable.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>>;

    /// Iterates frames until the source ends; blocks while waiting for the
    /// next frame of a live device.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    fn close(&mut self);
}
