pub mod ffmpeg_capture_source;
pub mod image_sequence_source;
