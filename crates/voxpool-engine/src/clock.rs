//! Time sources driving fades and play-start timestamps.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use voxpool_core::ClockMode;

/// Monotonic time source, in seconds.
///
/// Scaled time follows the clock's time scale (0 while a pause menu is
/// open), unscaled time follows the wall clock.
pub trait Clock: Send {
    fn now(&self, mode: ClockMode) -> f64;
}

/// Piecewise-linear scaled timeline anchored at the last scale change.
#[derive(Debug, Clone, Copy)]
struct ScaledTimeline {
    scale: f64,
    /// Scaled seconds accumulated up to `anchor`.
    base: f64,
    /// Unscaled seconds at which `scale` last changed.
    anchor: f64,
}

impl ScaledTimeline {
    const fn new() -> Self {
        Self {
            scale: 1.0,
            base: 0.0,
            anchor: 0.0,
        }
    }

    fn at(&self, unscaled: f64) -> f64 {
        (unscaled - self.anchor).mul_add(self.scale, self.base)
    }

    fn rescale(&mut self, unscaled: f64, scale: f64) {
        self.base = self.at(unscaled);
        self.anchor = unscaled;
        self.scale = scale.max(0.0);
    }
}

/// Wall-clock time with a settable time scale.
///
/// Cloning yields another handle onto the same clock so the owner of the
/// game loop can change the time scale after handing the clock to the
/// manager.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    timeline: Arc<Mutex<ScaledTimeline>>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            timeline: Arc::new(Mutex::new(ScaledTimeline::new())),
        }
    }

    fn unscaled(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    /// Change how fast scaled time runs relative to real time.
    pub fn set_time_scale(&self, scale: f64) {
        let now = self.unscaled();
        self.timeline.lock().rescale(now, scale);
    }

    pub fn time_scale(&self) -> f64 {
        self.timeline.lock().scale
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self, mode: ClockMode) -> f64 {
        let unscaled = self.unscaled();
        match mode {
            ClockMode::Unscaled => unscaled,
            ClockMode::Scaled => self.timeline.lock().at(unscaled),
        }
    }
}

#[derive(Debug)]
struct ManualState {
    unscaled: f64,
    timeline: ScaledTimeline,
}

/// Clock advanced explicitly by the caller.
///
/// Used by deterministic simulations and tests. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                unscaled: 0.0,
                timeline: ScaledTimeline::new(),
            })),
        }
    }

    /// Move real time forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        self.state.lock().unscaled += seconds.max(0.0);
    }

    pub fn set_time_scale(&self, scale: f64) {
        let mut state = self.state.lock();
        let now = state.unscaled;
        state.timeline.rescale(now, scale);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self, mode: ClockMode) -> f64 {
        let state = self.state.lock();
        match mode {
            ClockMode::Unscaled => state.unscaled,
            ClockMode::Scaled => state.timeline.at(state.unscaled),
        }
    }
}
