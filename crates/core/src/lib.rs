//! Frame-sampling and proximity decision pipeline.
//!
//! Frames flow `capture → throttle → detect → evaluate → alert`, with the
//! alert state published to a presentation layer as snapshot messages.
//! Capture sources, detectors, and the warning sound are ports with
//! infrastructure adapters alongside.

pub mod alert;
pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod proximity;
pub mod shared;
