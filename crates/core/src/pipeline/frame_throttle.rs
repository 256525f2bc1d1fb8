/// Lets one frame through every `interval + 1` frames.
///
/// Detection is far slower than capture; the throttle keeps the worker lane
/// from queueing work it can never catch up on.
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: usize,
    counter: usize,
}

impl FrameThrottle {
    pub fn new(interval: usize) -> Self {
        Self {
            interval,
            counter: 0,
        }
    }

    /// Call once per incoming frame.
    pub fn should_process(&mut self) -> bool {
        if self.counter == self.interval {
            self.counter = 0;
            true
        } else {
            self.counter += 1;
            false
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}
