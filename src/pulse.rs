//! Pulsing marker shown while the user picks a starting place.
//!
//! A timer-driven interpolation between a base and a peak radius/opacity.
//! Each cycle eases from base to peak and then jumps back to base. Frames
//! are a pure function of the elapsed time, so any UI tick source can drive
//! it.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::PulseConfig;

/// Circle style for one animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PulseFrame {
    pub radius: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone)]
pub struct PulseAnimation {
    config: PulseConfig,
    started_at: Option<Instant>,
}

impl PulseAnimation {
    pub fn new(config: PulseConfig) -> Self {
        Self {
            config,
            started_at: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Start a fresh cycle at `now`. No-op if already running.
    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Stop animating; frames fall back to the base values.
    pub fn stop(&mut self) {
        self.started_at = None;
    }

    /// The resting frame.
    pub fn base_frame(&self) -> PulseFrame {
        PulseFrame {
            radius: self.config.base_radius,
            opacity: self.config.base_opacity,
        }
    }

    /// Frame at `now`, or the base frame when stopped.
    pub fn frame_at(&self, now: Instant) -> PulseFrame {
        match self.started_at {
            Some(start) => self.frame_after(now.saturating_duration_since(start)),
            None => self.base_frame(),
        }
    }

    /// Frame `elapsed` after the animation started.
    pub fn frame_after(&self, elapsed: Duration) -> PulseFrame {
        let period = u128::from(self.config.period_ms.max(1));
        let t = (elapsed.as_millis() % period) as f64 / period as f64;
        let eased = ease_in_out(t);

        PulseFrame {
            radius: lerp(self.config.base_radius, self.config.peak_radius, eased),
            opacity: lerp(self.config.base_opacity, self.config.peak_opacity, eased),
        }
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Smoothstep easing on [0, 1].
fn ease_in_out(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}
