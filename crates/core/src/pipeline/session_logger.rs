use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting observer for session activity.
///
/// Keeps counters and timings out of the driver so the CLI, tests and any
/// other front end can each decide what to do with them.
pub trait SessionLogger: Send {
    /// A new run begins. Default: no-op.
    fn session_started(&mut self) {}

    /// A frame arrived on the worker lane.
    fn frame_seen(&mut self);

    /// The throttle let a frame through to detection.
    fn frame_sampled(&mut self);

    /// The capture lane discarded frames because the worker was busy.
    fn frames_dropped(&mut self, count: usize);

    /// Record how long a named stage took for one sampled frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    fn alert_changed(&mut self, is_alerting: bool);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by tests.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn frame_seen(&mut self) {}
    fn frame_sampled(&mut self) {}
    fn frames_dropped(&mut self, _count: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn alert_changed(&mut self, _is_alerting: bool) {}
}

/// Running totals for one named stage.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub count: usize,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl StageStats {
    fn record(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_ms += duration_ms;
        self.max_ms = self.max_ms.max(duration_ms);
    }

    pub fn avg_ms(&self) -> f64 {
        self.total_ms / self.count.max(1) as f64
    }
}

/// Accumulates counters and per-stage timings and logs a summary at stop.
pub struct StatsSessionLogger {
    started: Instant,
    frames_seen: usize,
    frames_sampled: usize,
    frames_dropped: usize,
    alerts_raised: usize,
    alerts_cleared: usize,
    timings: HashMap<String, StageStats>,
}

impl StatsSessionLogger {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            frames_seen: 0,
            frames_sampled: 0,
            frames_dropped: 0,
            alerts_raised: 0,
            alerts_cleared: 0,
            timings: HashMap::new(),
        }
    }

    /// Returns the formatted summary, or `None` if no frame was seen.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames_seen == 0 && self.frames_dropped == 0 {
            return None;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![
            format!("Session summary ({elapsed:.1}s):"),
            format!(
                "  frames: {} seen, {} sampled, {} dropped",
                self.frames_seen, self.frames_sampled, self.frames_dropped
            ),
            format!(
                "  alerts: {} raised, {} cleared",
                self.alerts_raised, self.alerts_cleared
            ),
        ];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = &self.timings[stage];
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  ({} runs)",
                stats.avg_ms(),
                stats.max_ms,
                stats.count
            ));
        }

        if elapsed > 0.0 {
            let fps = self.frames_seen as f64 / elapsed;
            lines.push(format!("  Capture rate: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    #[cfg(test)]
    fn timings_for(&self, stage: &str) -> Option<&StageStats> {
        self.timings.get(stage)
    }
}

impl Default for StatsSessionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLogger for StatsSessionLogger {
    fn session_started(&mut self) {
        *self = Self::new();
    }

    fn frame_seen(&mut self) {
        self.frames_seen += 1;
    }

    fn frame_sampled(&mut self) {
        self.frames_sampled += 1;
    }

    fn frames_dropped(&mut self, count: usize) {
        self.frames_dropped += count;
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        match self.timings.get_mut(stage) {
            Some(stats) => stats.record(duration_ms),
            None => {
                let mut stats = StageStats::default();
                stats.record(duration_ms);
                self.timings.insert(stage.to_string(), stats);
            }
        }
    }

    fn alert_changed(&mut self, is_alerting: bool) {
        if is_alerting {
            self.alerts_raised += 1;
        } else {
            self.alerts_cleared += 1;
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
