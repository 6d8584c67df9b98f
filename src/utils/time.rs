#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Timer for tracking frame timing and elapsed time.
pub struct Timer {
    start_time: Instant,
    last_update: Instant,
    /// Time since last tick
    pub delta: Duration,
    /// Total elapsed time since creation
    pub elapsed: Duration,
    /// Total number of ticks
    pub frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Creates a new timer starting from now.
    #[must_use]
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_update: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
        }
    }

    /// Updates the timer (called once per rendered frame).
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_update;
        self.elapsed = now - self.start_time;
        self.last_update = now;
        self.frame_count += 1;
    }

    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// Rolling frame-rate average over the last few frames.
///
/// The adaptive update interval reacts to this value; a short window keeps
/// it responsive to sudden load spikes without flapping on single slow
/// frames.
pub struct FpsCounter {
    buffer: [f32; Self::WINDOW],
    cursor: usize,
}

impl FpsCounter {
    const WINDOW: usize = 5;

    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: [60.0; Self::WINDOW],
            cursor: 0,
        }
    }

    /// Records one frame delta and returns the smoothed FPS.
    pub fn push_delta(&mut self, delta_seconds: f32) -> f32 {
        if delta_seconds > 0.0 {
            self.buffer[self.cursor] = 1.0 / delta_seconds;
            self.cursor = (self.cursor + 1) % Self::WINDOW;
        }
        self.average()
    }

    #[must_use]
    pub fn average(&self) -> f32 {
        self.buffer.iter().sum::<f32>() / Self::WINDOW as f32
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_counter_averages_window() {
        let mut fps = FpsCounter::new();
        for _ in 0..5 {
            fps.push_delta(1.0 / 30.0);
        }
        assert!((fps.average() - 30.0).abs() < 0.5);
    }

    #[test]
    fn fps_counter_ignores_zero_delta() {
        let mut fps = FpsCounter::new();
        let before = fps.average();
        fps.push_delta(0.0);
        assert!((fps.average() - before).abs() < f32::EPSILON);
    }
}
