pub mod alert_direction;
pub mod area_metric;
pub mod landmark_metric;
pub mod metric_strategy;
pub mod proximity_evaluator;
pub mod threshold;
