/// YOLO pose face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, NMS, and conversion of the
/// five face keypoints into normalized landmark groups.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::observation::{FaceObservation, LandmarkGroup, NormalizedRect, Point};

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoints per detection (5 landmarks × 3 values each: x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// Keypoint order emitted by the model.
const LEFT_EYE: usize = 0;
const RIGHT_EYE: usize = 1;
const NOSE: usize = 2;
const LEFT_MOUTH: usize = 3;
const RIGHT_MOUTH: usize = 4;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 640 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_execution_providers(platform_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded face model {} (input {input_size}px)",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();

        // Output is [1, features, detections] (transposed) or [1, detections, features].
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let letterbox = Letterbox {
            scale,
            pad_x: pad_x as f64,
            pad_y: pad_y as f64,
        };
        let mut raw_dets = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };
            if let Some(det) = parse_row(&row, self.confidence, &letterbox) {
                raw_dets.push(det);
            }
        }

        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);
        log::debug!("Frame {}: {} face(s) after NMS", frame.index(), kept.len());

        Ok(kept
            .iter()
            .map(|d| to_observation(d, frame.width(), frame.height()))
            .collect())
    }
}

/// Hardware acceleration where the platform offers it; ort falls back to
/// the CPU provider when registration fails.
fn platform_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray (YOLO convention).
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

struct Letterbox {
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl Letterbox {
    /// Maps a point from model input space back to frame pixels.
    fn unmap(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    /// Frame-pixel keypoints; `None` where the model's keypoint confidence is low.
    keypoints: [Option<(f64, f64)>; 5],
}

/// Parses `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
fn parse_row(row: &[f32], min_confidence: f64, letterbox: &Letterbox) -> Option<RawDetection> {
    if row.len() < 5 {
        return None;
    }
    let confidence = row[4] as f64;
    if confidence < min_confidence {
        return None;
    }

    let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
    let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
    let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);

    let mut keypoints = [None; 5];
    if row.len() >= 5 + NUM_KEYPOINT_VALUES {
        for (k, slot) in keypoints.iter_mut().enumerate() {
            let base = 5 + k * 3;
            if row[base + 2] as f64 >= KEYPOINT_CONF_THRESH {
                *slot = Some(letterbox.unmap(row[base] as f64, row[base + 1] as f64));
            }
        }
    }

    Some(RawDetection {
        x1,
        y1,
        x2,
        y2,
        confidence,
        keypoints,
    })
}

/// Converts a pixel-space detection into a normalized observation.
///
/// Both mouth corners form the lips group so its first point is the left corner.
fn to_observation(det: &RawDetection, frame_w: u32, frame_h: u32) -> FaceObservation {
    let fw = frame_w as f64;
    let fh = frame_h as f64;
    let x1 = det.x1.clamp(0.0, fw);
    let y1 = det.y1.clamp(0.0, fh);
    let x2 = det.x2.clamp(0.0, fw);
    let y2 = det.y2.clamp(0.0, fh);

    let mut observation = FaceObservation::new(NormalizedRect::new(
        x1 / fw,
        y1 / fh,
        (x2 - x1) / fw,
        (y2 - y1) / fh,
    ))
    .with_confidence(det.confidence as f32);

    let normalize = |k: usize| det.keypoints[k].map(|(x, y)| Point::new(x / fw, y / fh));

    for (group, k) in [
        (LandmarkGroup::LeftEye, LEFT_EYE),
        (LandmarkGroup::RightEye, RIGHT_EYE),
        (LandmarkGroup::Nose, NOSE),
    ] {
        if let Some(point) = normalize(k) {
            observation = observation.with_landmarks(group, vec![point]);
        }
    }

    let lips: Vec<Point> = [LEFT_MOUTH, RIGHT_MOUTH]
        .into_iter()
        .filter_map(normalize)
        .collect();
    if !lips.is_empty() {
        observation = observation.with_landmarks(LandmarkGroup::InnerLips, lips);
    }

    observation
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        let bbox = [det.x1, det.y1, det.x2, det.y2];
        let suppressed = keep
            .iter()
            .any(|k| bbox_iou(&[k.x1, k.y1, k.x2, k.y2], &bbox) > iou_thresh);
        if !suppressed {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
