use std::collections::VecDeque;

use foundation::time::Millis;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GovernorConfig {
    /// Frames averaged per evaluation; also the evaluation period.
    pub window_frames: usize,
    pub slow_frame_ms: f64,
    pub fast_frame_ms: f64,
    pub step: f64,
    pub floor: f64,
    /// Device-native pixel ratio cap.
    pub ceiling: f64,
    /// Minimum time between two adjustments.
    pub min_adjust_interval_ms: f64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            window_frames: 60,
            slow_frame_ms: 22.0,
            fast_frame_ms: 14.0,
            step: 0.25,
            floor: 0.5,
            ceiling: 2.0,
            min_adjust_interval_ms: 2000.0,
        }
    }
}

/// Bang-bang controller over the render surface pixel ratio.
///
/// The scale always stays within `[floor, ceiling]`. Under sustained slow
/// frames it only moves down, under sustained fast frames only up.
#[derive(Debug, Clone)]
pub struct ResolutionGovernor {
    config: GovernorConfig,
    window: VecDeque<f64>,
    frames_since_eval: usize,
    scale: f64,
    last_adjust: Option<Millis>,
}

impl ResolutionGovernor {
    pub fn new(mut config: GovernorConfig) -> Self {
        config.window_frames = config.window_frames.max(1);
        config.ceiling = config.ceiling.max(config.floor);
        let scale = config.ceiling;
        Self {
            config,
            window: VecDeque::with_capacity(config.window_frames),
            frames_since_eval: 0,
            scale,
            last_adjust: None,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn ceiling(&self) -> f64 {
        self.config.ceiling
    }

    pub fn floor(&self) -> f64 {
        self.config.floor
    }

    /// Changes the device ceiling (e.g. after moving to another display).
    pub fn set_ceiling(&mut self, ceiling: f64) {
        self.config.ceiling = ceiling.max(self.config.floor);
        self.scale = self.scale.min(self.config.ceiling);
    }

    /// Forgets collected samples; the current scale is kept.
    pub fn reset_window(&mut self) {
        self.window.clear();
        self.frames_since_eval = 0;
    }

    pub fn average_frame_ms(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
    }

    /// Records one frame duration; returns the new scale when it changed.
    pub fn record(&mut self, frame_ms: f64, now: Millis) -> Option<f64> {
        if !frame_ms.is_finite() || frame_ms < 0.0 {
            return None;
        }
        if self.window.len() == self.config.window_frames {
            self.window.pop_front();
        }
        self.window.push_back(frame_ms);
        self.frames_since_eval += 1;
        if self.frames_since_eval < self.config.window_frames {
            return None;
        }
        self.frames_since_eval = 0;

        if let Some(last) = self.last_adjust {
            if now.since(last) < self.config.min_adjust_interval_ms {
                return None;
            }
        }

        let avg = self.average_frame_ms()?;
        let next = if avg > self.config.slow_frame_ms && self.scale > self.config.floor {
            (self.scale - self.config.step).max(self.config.floor)
        } else if avg < self.config.fast_frame_ms && self.scale < self.config.ceiling {
            (self.scale + self.config.step).min(self.config.ceiling)
        } else {
            return None;
        };
        self.scale = next;
        self.last_adjust = Some(now);
        Some(next)
    }
}
