pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Frames skipped between two detections for the bounding-box metric.
pub const AREA_FRAME_INTERVAL: usize = 30;
/// Frames skipped between two detections for the landmark metric.
pub const LANDMARK_FRAME_INTERVAL: usize = 50;

pub const AREA_DEFAULT_THRESHOLD: f64 = 0.1;
pub const LANDMARK_DEFAULT_THRESHOLD: f64 = 0.23;

/// Range accepted by `ProximitySession::set_threshold`; values outside are clamped.
pub const THRESHOLD_MIN: f64 = 0.01;
pub const THRESHOLD_MAX: f64 = 0.5;

pub const INITIAL_LABEL: &str = "Distance information will be displayed here";

pub const DEFAULT_WARNING_SOUND: &str = "warning_audio.mp3";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
