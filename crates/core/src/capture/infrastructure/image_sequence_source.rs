use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Replays a directory of still images as a camera feed.
///
/// Images are ordered by file name. With a frame rate set, delivery is
/// paced like a live device; without one, frames are produced as fast as
/// they decode.
pub struct ImageSequenceSource {
    dir: PathBuf,
    fps: Option<f64>,
    paths: Vec<PathBuf>,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fps: None,
            paths: Vec::new(),
        }
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps).filter(|f| *f > 0.0);
        self
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| format!("Cannot read {}: {e}", self.dir.display()))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        paths.sort();

        let first = paths
            .first()
            .ok_or_else(|| format!("No images found in {}", self.dir.display()))?;
        let (width, height) = image::image_dimensions(first)?;

        let info = SourceInfo {
            width,
            height,
            fps: self.fps.unwrap_or(0.0),
            description: format!("{} ({} images)", self.dir.display(), paths.len()),
        };
        self.paths = paths;
        Ok(info)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        // A rate too small for a Duration plays unpaced.
        let interval = self
            .fps
            .and_then(|fps| Duration::try_from_secs_f64(1.0 / fps).ok());
        let mut next_due = Instant::now();

        Box::new(self.paths.iter().enumerate().map(
            move |(index, path)| -> Result<Frame, Box<dyn std::error::Error>> {
                if let Some(interval) = interval {
                    let now = Instant::now();
                    if next_due > now {
                        thread::sleep(next_due - now);
                    }
                    if let Some(due) = next_due.checked_add(interval) {
                        next_due = due;
                    }
                }
                let img = image::open(path)
                    .map_err(|e| format!("Cannot decode {}: {e}", path.display()))?;
                Ok(Frame::from_rgb_image(img.to_rgb8(), index))
            },
        ))
    }

    fn close(&mut self) {
        self.paths.clear();
    }
}
