use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::capture::domain::frame_source::FrameSource;
use crate::pipeline::pipeline_driver::PipelineDriver;
use crate::pipeline::session_event::SessionEvent;
use crate::shared::frame::Frame;

/// What the capture lane hands back when it exits.
pub struct CaptureLaneOutput {
    pub source: Box<dyn FrameSource>,
    pub dropped: usize,
}

/// Reads frames from an opened source into the worker channel.
///
/// With `block_when_busy` unset, frames that find the channel full are
/// dropped and counted so a slow detector never backs up a live camera.
pub fn spawn_capture_lane(
    mut source: Box<dyn FrameSource>,
    frame_tx: Sender<Frame>,
    events: Sender<SessionEvent>,
    cancelled: Arc<AtomicBool>,
    block_when_busy: bool,
) -> io::Result<JoinHandle<CaptureLaneOutput>> {
    thread::Builder::new()
        .name("capture".into())
        .spawn(move || {
            let mut dropped = 0;
            for frame_result in source.frames() {
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                let frame = match frame_result {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::warn!("Capture failed: {e}");
                        let _ = events.send(SessionEvent::Error(e.to_string()));
                        break;
                    }
                };

                if block_when_busy {
                    if frame_tx.send(frame).is_err() {
                        break;
                    }
                    continue;
                }
                match frame_tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => dropped += 1,
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            drop(frame_tx);
            source.close();
            CaptureLaneOutput { source, dropped }
        })
}

/// Feeds every received frame to the driver until the channel closes or
/// the session is cancelled, then hands the driver back.
pub fn spawn_worker_lane(
    mut driver: PipelineDriver,
    frame_rx: Receiver<Frame>,
    events: Sender<SessionEvent>,
    cancelled: Arc<AtomicBool>,
) -> io::Result<JoinHandle<PipelineDriver>> {
    thread::Builder::new().name("worker".into()).spawn(move || {
        for frame in frame_rx {
            if cancelled.load(Ordering::Relaxed) {
                return driver;
            }
            driver.on_frame(&frame);
        }
        // Channel closed without a stop request: the source ran dry.
        if !cancelled.load(Ordering::Relaxed) {
            let _ = events.send(SessionEvent::SourceEnded);
        }
        driver
    })
}
