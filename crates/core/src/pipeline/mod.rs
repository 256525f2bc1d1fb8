pub mod face_policy;
pub mod frame_throttle;
pub mod infrastructure;
pub mod pipeline_driver;
pub mod proximity_session;
pub mod session_config;
pub mod session_event;
pub mod session_logger;

#[cfg(test)]
mod test_support;
