pub mod session_lanes;
