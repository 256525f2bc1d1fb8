use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::capture::domain::frame_source::{FrameSource, SourceInfo};
use crate::shared::frame::Frame;

/// Captures frames through libavformat/libavdevice.
///
/// `location` is either a capture device (`/dev/video0`, `0`, `video=...`)
/// read through a named input format such as `v4l2`, `avfoundation` or
/// `dshow`, or a plain media file/URL when no format is given.
pub struct FfmpegCaptureSource {
    location: String,
    input_format: Option<String>,
    options: Vec<(String, String)>,
    capture: Option<OpenCapture>,
}

struct OpenCapture {
    ictx: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: the source is owned by one lane at a time and never shares
// the raw ffmpeg contexts across threads.
unsafe impl Send for FfmpegCaptureSource {}

impl FfmpegCaptureSource {
    pub fn new(location: impl Into<String>, input_format: Option<String>) -> Self {
        Self {
            location: location.into(),
            input_format,
            options: Vec::new(),
            capture: None,
        }
    }

    /// Adds a demuxer option such as `framerate` or `video_size`.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    fn dictionary(&self) -> ffmpeg_next::Dictionary<'_> {
        let mut dict = ffmpeg_next::Dictionary::new();
        for (key, value) in &self.options {
            dict.set(key, value);
        }
        dict
    }

    fn open_input(&self) -> Result<Input, Box<dyn std::error::Error>> {
        let Some(name) = self.input_format.as_deref() else {
            return Ok(ffmpeg_next::format::input_with_dictionary(
                &self.location,
                self.dictionary(),
            )?);
        };

        ffmpeg_next::device::register_all();
        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == name)
            .ok_or_else(|| format!("Unknown capture format: {name}"))?;

        match ffmpeg_next::format::open_with(&self.location, &format, self.dictionary())? {
            ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
            ffmpeg_next::format::context::Context::Output(_) => {
                Err(format!("{name} is not an input format").into())
            }
        }
    }
}

impl FrameSource for FfmpegCaptureSource {
    fn open(&mut self) -> Result<SourceInfo, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = self
            .open_input()
            .map_err(|e| format!("Cannot open {}: {e}", self.location))?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        let width = decoder.width();
        let height = decoder.height();
        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        let info = SourceInfo {
            width,
            height,
            fps,
            description: match &self.input_format {
                Some(format) => format!("{} via {format}", self.location),
                None => self.location.clone(),
            },
        };
        log::info!(
            "Opened {} ({}x{} @ {:.1} fps)",
            info.description,
            width,
            height,
            fps
        );

        self.capture = Some(OpenCapture {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        });
        Ok(info)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.capture.as_mut() {
            Some(capture) => Box::new(CaptureFrames {
                capture,
                frame_index: 0,
                flushing: false,
                done: false,
            }),
            None => Box::new(std::iter::once(Err("capture source not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.capture = None;
    }
}

/// Decodes one frame per `next` call, draining the decoder on end of input.
struct CaptureFrames<'a> {
    capture: &'a mut OpenCapture,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl CaptureFrames<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = Video::empty();
        self.capture.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = Video::empty();
        if let Err(e) = self.capture.scaler.run(&decoded, &mut rgb) {
            return Some(Err(Box::new(e)));
        }
        let (width, height) = (self.capture.width, self.capture.height);
        let frame = Frame::new(
            packed_rgb(&rgb, width, height),
            width,
            height,
            3,
            self.frame_index,
        );
        self.frame_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for CaptureFrames<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(result) = self.try_receive() {
            return Some(result);
        }
        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.capture.ictx.packets().next() else {
                let _ = self.capture.decoder.send_eof();
                self.flushing = true;
                let result = self.try_receive();
                self.done = result.is_none();
                return result;
            };
            if stream.index() != self.capture.stream_index {
                continue;
            }
            if self.capture.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Strips row padding from an RGB24 frame.
fn packed_rgb(rgb: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Encodes a short MPEG-4 clip of flat grey frames.
    fn write_clip(path: &Path, frames: usize, width: u32, height: u32) {
        ffmpeg_next::init().unwrap();
        let fps = 25;
        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();
        let mut ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        ctx.set_width(width);
        ctx.set_height(height);
        ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = ctx.open_with(ffmpeg_next::Dictionary::new()).unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let time_base = octx.stream(0).unwrap().time_base();

        let write_packets = |encoder: &mut ffmpeg_next::encoder::Video,
                                 octx: &mut ffmpeg_next::format::context::Output| {
            let mut packet = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut packet).is_ok() {
                packet.set_stream(0);
                packet.rescale_ts(ffmpeg_next::Rational(1, fps), time_base);
                packet.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..frames {
            let mut yuv = Video::new(ffmpeg_next::format::Pixel::YUV420P, width, height);
            let shade = (i * 40 % 256) as u8;
            yuv.data_mut(0).fill(shade);
            yuv.data_mut(1).fill(128);
            yuv.data_mut(2).fill(128);
            yuv.set_pts(Some(i as i64));
            encoder.send_frame(&yuv).unwrap();
            write_packets(&mut encoder, &mut octx);
        }
        encoder.send_eof().unwrap();
        write_packets(&mut encoder, &mut octx);
        octx.write_trailer().unwrap();
    }

    #[test]
    fn test_open_file_reports_stream_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_clip(&path, 4, 160, 120);

        let mut source = FfmpegCaptureSource::new(path.to_string_lossy(), None);
        let info = source.open().unwrap();

        assert_eq!((info.width, info.height), (160, 120));
        assert!(info.fps > 0.0);
        assert!(info.description.ends_with("clip.mp4"));
    }

    #[test]
    fn test_frames_are_rgb_and_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_clip(&path, 5, 160, 120);

        let mut source = FfmpegCaptureSource::new(path.to_string_lossy(), None);
        source.open().unwrap();
        let frames: Vec<Frame> = source.frames().map(|f| f.unwrap()).collect();

        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
    }

    #[test]
    fn test_missing_location_fails_to_open() {
        let mut source = FfmpegCaptureSource::new("/nonexistent/camera.mp4", None);
        assert!(source.open().is_err());
    }

    #[test]
    fn test_unknown_capture_format_fails_to_open() {
        let mut source =
            FfmpegCaptureSource::new("/dev/video0", Some("no-such-device-format".into()));
        let err = source.open().unwrap_err();
        assert!(err.to_string().contains("no-such-device-format"));
    }

    #[test]
    fn test_device_options_reach_the_demuxer() {
        let source = FfmpegCaptureSource::new("0", Some("avfoundation".into()))
            .with_option("framerate", "30")
            .with_option("video_size", "1280x720");

        let dict = source.dictionary();
        assert_eq!(dict.get("framerate"), Some("30"));
        assert_eq!(dict.get("video_size"), Some("1280x720"));
    }

    #[test]
    fn test_options_do_not_break_file_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_clip(&path, 2, 160, 120);

        let mut source =
            FfmpegCaptureSource::new(path.to_string_lossy(), None).with_option("probesize", "32768");

        assert_eq!(source.open().unwrap().width, 160);
    }

    #[test]
    fn test_frames_before_open_is_an_error() {
        let mut source = FfmpegCaptureSource::new("unused", None);
        assert!(source.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_close_releases_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_clip(&path, 1, 64, 48);

        let mut source = FfmpegCaptureSource::new(path.to_string_lossy(), None);
        source.open().unwrap();
        source.close();
        source.close();
        assert!(source.frames().next().unwrap().is_err());
    }
}
