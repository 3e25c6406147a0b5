//! Simulation clock
//!
//! Turns variable frame deltas into the fixed ticks consumed by the combat scheduler.

use serde::{Deserialize, Serialize};

/// Clock tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Simulated seconds per real second
    pub time_scale: f32,
    /// Length of one scheduler tick in seconds
    pub fixed_timestep: f32,
    /// Longest frame delta accepted; longer frames are clamped
    pub max_delta_time: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            fixed_timestep: 1.0 / 60.0,
            max_delta_time: 0.25,
        }
    }
}

/// Fixed-step simulation clock
#[derive(Debug, Clone)]
pub struct GameTime {
    pub config: TimeConfig,
    /// Simulated seconds elapsed
    pub total_time: f64,
    /// Fixed ticks handed out so far
    pub tick_count: u64,
    pub paused: bool,
    accumulator: f32,
}

impl Default for GameTime {
    fn default() -> Self {
        Self::new(TimeConfig::default())
    }
}

impl GameTime {
    pub fn new(config: TimeConfig) -> Self {
        Self {
            config,
            total_time: 0.0,
            tick_count: 0,
            paused: false,
            accumulator: 0.0,
        }
    }

    /// Feed one frame's real delta. Returns how many fixed ticks are due.
    pub fn advance(&mut self, raw_delta: f32) -> u32 {
        if self.paused || !(self.config.fixed_timestep > 0.0) {
            return 0;
        }
        let delta = raw_delta.max(0.0).min(self.config.max_delta_time.max(0.0)) * self.config.time_scale.max(0.0);
        self.total_time += f64::from(delta);
        self.accumulator += delta;

        let mut steps = 0;
        while self.accumulator >= self.config.fixed_timestep {
            self.accumulator -= self.config.fixed_timestep;
            steps += 1;
        }
        self.tick_count += u64::from(steps);
        steps
    }

    pub fn fixed_timestep(&self) -> f32 {
        self.config.fixed_timestep
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// 0.0 freezes the clock, 2.0 runs it at double speed
    pub fn set_time_scale(&mut self, scale: f32) {
        self.config.time_scale = scale.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(step: f32) -> GameTime {
        GameTime::new(TimeConfig {
            fixed_timestep: step,
            ..Default::default()
        })
    }

    #[test]
    fn test_steps_accumulate_across_frames() {
        let mut time = clock(0.1);
        assert_eq!(time.advance(0.25), 2);
        assert_eq!(time.advance(0.06), 1);
        assert_eq!(time.tick_count, 3);
        assert!((time.total_time - 0.31).abs() < 1e-6);
    }

    #[test]
    fn test_paused_clock_hands_out_nothing() {
        let mut time = clock(0.125);
        time.pause();
        assert_eq!(time.advance(0.25), 0);
        assert_eq!(time.total_time, 0.0);
        time.resume();
        assert_eq!(time.advance(0.25), 2);
    }

    #[test]
    fn test_delta_is_clamped_and_scaled() {
        let mut time = clock(0.125);
        assert_eq!(time.advance(5.0), 2);
        time.set_time_scale(-1.0);
        assert_eq!(time.advance(0.1), 0);
        time.set_time_scale(2.0);
        assert_eq!(time.advance(0.125), 2);
    }

    #[test]
    fn test_bad_config_never_runs_backwards() {
        let mut time = GameTime::new(TimeConfig {
            time_scale: -3.0,
            fixed_timestep: 0.125,
            max_delta_time: -1.0,
        });
        assert_eq!(time.advance(0.5), 0);
        assert_eq!(time.total_time, 0.0);
        time.config.fixed_timestep = 0.0;
        assert_eq!(time.advance(0.5), 0);
    }
}
