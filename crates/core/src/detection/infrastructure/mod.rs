pub mod onnx_yolo_detector;
pub mod replay_face_detector;
