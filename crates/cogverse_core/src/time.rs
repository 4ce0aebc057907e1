//! Step counting, simulated time and real-time pacing.

use crate::config::TimeConfig;
use std::time::Duration;

/// Weight of the previous average in the ticks-per-second estimate.
const FPS_SMOOTHING: f64 = 0.9;

#[derive(Debug, Clone)]
pub struct TimeManager {
    dt: f64,
    max_steps: u64,
    real_time: bool,
    target_fps: u32,
    step: u64,
    achieved_fps: f64,
}

impl TimeManager {
    pub fn new(config: &TimeConfig) -> Self {
        Self {
            dt: config.dt,
            max_steps: config.max_steps,
            real_time: config.real_time,
            target_fps: config.target_fps,
            step: 0,
            achieved_fps: 0.0,
        }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Simulated time: `step * dt`.
    pub fn current_time(&self) -> f64 {
        self.step as f64 * self.dt
    }

    pub fn finished(&self) -> bool {
        self.step >= self.max_steps
    }

    /// Advances the counter after a completed tick and returns the new step.
    pub fn step(&mut self) -> u64 {
        self.step += 1;
        self.step
    }

    /// Folds the wall time of the last tick into the ticks-per-second average.
    pub fn record_tick_duration(&mut self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return;
        }
        let fps = 1.0 / secs;
        self.achieved_fps = if self.achieved_fps == 0.0 {
            fps
        } else {
            FPS_SMOOTHING * self.achieved_fps + (1.0 - FPS_SMOOTHING) * fps
        };
    }

    pub fn achieved_fps(&self) -> f64 {
        self.achieved_fps
    }

    /// Time left in the tick budget, `None` when not pacing.
    pub fn remaining_budget(&self, elapsed: Duration) -> Option<Duration> {
        if !self.real_time || self.target_fps == 0 {
            return None;
        }
        let budget = Duration::from_secs_f64(1.0 / f64::from(self.target_fps));
        Some(budget.saturating_sub(elapsed))
    }
}
