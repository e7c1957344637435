//! Fade parameters shared by the engine and configuration.

use std::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

/// Timeline a fade advances on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Game time, affected by the clock's time scale (pause menus, slow motion).
    #[default]
    Scaled,
    /// Real time.
    Unscaled,
}

/// Easing curve mapping linear progress to interpolation weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// y = t
    #[default]
    Linear,
    /// y = t², slow start.
    QuadIn,
    /// y = 1 - (1 - t)², slow finish.
    QuadOut,
    /// Quadratic ease in the first half, ease out in the second.
    QuadInOut,
    /// y = 0.5 × (1 - cos(πt))
    SCurve,
    /// y = sin(t × π/2), keeps perceived loudness steady across a crossfade.
    EqualPower,
}

impl Ease {
    /// Weight at normalized position `t` (clamped to 0..=1).
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv
            }
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let inv = (-2.0f32).mul_add(t, 2.0);
                    1.0 - inv * inv / 2.0
                }
            }
            Self::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            Self::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }
}

/// How progress behaves once a fade reaches the end of its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadeRepeat {
    /// Clamp at the end value and complete.
    #[default]
    Once,
    /// Jump back to the start value and run again.
    Loop,
    /// Run back and forth between start and end.
    Yoyo,
}

/// Action applied to a fade target's channels when the fade completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnComplete {
    #[default]
    None,
    Stop,
    Pause,
}

/// Everything about a fade except its target and end value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeSpec {
    /// Seconds. Zero or negative applies the end value at once.
    pub duration: f32,
    #[serde(default)]
    pub clock: ClockMode,
    #[serde(default)]
    pub ease: Ease,
    #[serde(default)]
    pub repeat: FadeRepeat,
    #[serde(default)]
    pub on_complete: OnComplete,
}

impl FadeSpec {
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            clock: ClockMode::default(),
            ease: Ease::default(),
            repeat: FadeRepeat::default(),
            on_complete: OnComplete::default(),
        }
    }

    #[must_use]
    pub const fn clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    #[must_use]
    pub const fn repeat(mut self, repeat: FadeRepeat) -> Self {
        self.repeat = repeat;
        self
    }

    #[must_use]
    pub const fn on_complete(mut self, on_complete: OnComplete) -> Self {
        self.on_complete = on_complete;
        self
    }

    /// Whether the fade should skip interpolation entirely.
    ///
    /// Non-finite durations never reach their end, so they resolve at once.
    pub fn is_instant(&self) -> bool {
        !self.duration.is_finite() || self.duration <= 0.0
    }
}
