//! Tick-driven fade scheduler.
//!
//! A fade interpolates one volume (or a captured set of channel volumes)
//! towards an end value. The scheduler keeps at most one fade per target;
//! installing a fade on an occupied target drops the previous one without
//! running its completion behaviour.

use serde::Serialize;
use tracing::debug;
use voxpool_core::{ClipId, FadeRepeat, FadeSpec, OnComplete};

use crate::channel::ChannelHandle;
use crate::clock::Clock;

/// Identifier of a started fade, unique per manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FadeId(u64);

impl FadeId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// What a fade drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FadeTarget {
    /// The global volume multiplier.
    Global,
    /// Unmodified volume of every channel playing when the fade started.
    GlobalSources,
    /// A group's volume multiplier, by group index.
    Group(usize),
    /// Unmodified volume of a group's channels playing when the fade started.
    GroupSources(usize),
    /// Unmodified volume of one channel lease.
    Channel(ChannelHandle),
    /// Unmodified volume of every channel playing the clip when the fade started.
    Clip(ClipId),
}

impl FadeTarget {
    /// Whether the fade writes channel volumes rather than a multiplier.
    pub const fn drives_sources(&self) -> bool {
        !matches!(self, Self::Global | Self::Group(_))
    }
}

/// Start value(s) captured when the fade was installed.
#[derive(Debug, Clone, PartialEq)]
pub enum FadeOrigin {
    Scalar(f32),
    Channels(Vec<(ChannelHandle, f32)>),
}

/// Values a fade writes on one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FadeValue {
    Scalar(f32),
    Channels(Vec<(ChannelHandle, f32)>),
}

/// One scheduled interpolation.
#[derive(Debug, Clone)]
pub struct Fade {
    id: FadeId,
    target: FadeTarget,
    origin: FadeOrigin,
    to: f32,
    spec: FadeSpec,
    started_at: f64,
}

impl Fade {
    pub const fn id(&self) -> FadeId {
        self.id
    }

    pub const fn target(&self) -> &FadeTarget {
        &self.target
    }

    pub const fn end_value(&self) -> f32 {
        self.to
    }

    pub const fn spec(&self) -> &FadeSpec {
        &self.spec
    }

    /// Eased weight at `now`, and whether a one-shot fade has run out.
    fn position(&self, now: f64) -> (f32, bool) {
        let elapsed = (now - self.started_at).max(0.0);
        let raw = elapsed / f64::from(self.spec.duration);
        let (t, finished) = match self.spec.repeat {
            FadeRepeat::Once => (raw.min(1.0), raw >= 1.0),
            FadeRepeat::Loop => (raw.fract(), false),
            FadeRepeat::Yoyo => {
                let cycle = raw.floor();
                let frac = raw - cycle;
                if cycle as u64 % 2 == 1 {
                    (1.0 - frac, false)
                } else {
                    (frac, false)
                }
            }
        };
        (self.spec.ease.apply(t as f32), finished)
    }

    /// Values at interpolation weight `weight`.
    pub(crate) fn value_at(&self, weight: f32) -> FadeValue {
        let lerp = |from: f32| (self.to - from).mul_add(weight, from);
        match &self.origin {
            FadeOrigin::Scalar(from) => FadeValue::Scalar(lerp(*from)),
            FadeOrigin::Channels(channels) => FadeValue::Channels(
                channels
                    .iter()
                    .map(|(handle, from)| (*handle, lerp(*from)))
                    .collect(),
            ),
        }
    }

    /// Channel leases captured by a source fade.
    pub fn channels(&self) -> impl Iterator<Item = ChannelHandle> + '_ {
        let captured = match &self.origin {
            FadeOrigin::Channels(channels) => channels.as_slice(),
            FadeOrigin::Scalar(_) => &[],
        };
        captured.iter().map(|(handle, _)| *handle)
    }
}

/// Result of evaluating one fade on one tick.
#[derive(Debug, Clone)]
pub struct FadeStep {
    pub id: FadeId,
    pub target: FadeTarget,
    pub value: FadeValue,
    /// Set when the fade finished on this tick and has been removed.
    pub completed: Option<OnComplete>,
}

/// Active fades, at most one per target.
#[derive(Debug, Default)]
pub struct FadeScheduler {
    fades: Vec<Fade>,
    next_id: u64,
}

impl FadeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> FadeId {
        self.next_id += 1;
        FadeId(self.next_id)
    }

    /// Resolve a zero-length fade on the spot.
    ///
    /// Any fade already on `target` is cancelled; the returned step carries
    /// the end value and the completion behaviour.
    pub(crate) fn instant(
        &mut self,
        target: FadeTarget,
        origin: FadeOrigin,
        to: f32,
        spec: FadeSpec,
    ) -> FadeStep {
        self.cancel(&target);
        let fade = Fade {
            id: self.allocate_id(),
            target,
            origin,
            to,
            spec,
            started_at: 0.0,
        };
        debug!("Fade {} applied instantly on {:?}", fade.id.0, fade.target);
        FadeStep {
            id: fade.id,
            value: fade.value_at(1.0),
            target: fade.target,
            completed: Some(spec.on_complete),
        }
    }

    /// Install a fade, returning its id and the fade it replaced.
    pub(crate) fn start(
        &mut self,
        target: FadeTarget,
        origin: FadeOrigin,
        to: f32,
        spec: FadeSpec,
        now: f64,
    ) -> (FadeId, Option<Fade>) {
        let replaced = self.cancel(&target);
        let id = self.allocate_id();
        debug!(
            "Fade {} started on {:?}: -> {:.3} over {:.3}s ({:?}, {:?})",
            id.0, target, to, spec.duration, spec.clock, spec.repeat
        );
        self.fades.push(Fade {
            id,
            target,
            origin,
            to,
            spec,
            started_at: now,
        });
        (id, replaced)
    }

    /// Remove the fade on `target` without completing it.
    pub(crate) fn cancel(&mut self, target: &FadeTarget) -> Option<Fade> {
        let index = self.fades.iter().position(|f| &f.target == target)?;
        let fade = self.fades.remove(index);
        debug!("Fade {} on {:?} cancelled", fade.id.0, fade.target);
        Some(fade)
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&Fade) -> bool) {
        self.fades.retain(keep);
    }

    pub(crate) fn clear(&mut self) {
        self.fades.clear();
    }

    /// Evaluate every fade against `clock`, removing those that complete.
    pub(crate) fn advance(&mut self, clock: &dyn Clock) -> Vec<FadeStep> {
        let mut steps = Vec::with_capacity(self.fades.len());
        self.fades.retain(|fade| {
            let (weight, finished) = fade.position(clock.now(fade.spec.clock));
            let value = if finished {
                fade.value_at(1.0)
            } else {
                fade.value_at(weight)
            };
            steps.push(FadeStep {
                id: fade.id,
                target: fade.target.clone(),
                value,
                completed: finished.then_some(fade.spec.on_complete),
            });
            !finished
        });
        steps
    }

    pub fn get(&self, target: &FadeTarget) -> Option<&Fade> {
        self.fades.iter().find(|f| &f.target == target)
    }

    pub fn is_active(&self, target: &FadeTarget) -> bool {
        self.get(target).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fade> {
        self.fades.iter()
    }

    pub fn len(&self) -> usize {
        self.fades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fades.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::channel::ChannelKey;
    use crate::clock::ManualClock;
    use voxpool_core::{ClockMode, Ease};

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn scalar(step: &FadeStep) -> f32 {
        match step.value {
            FadeValue::Scalar(v) => v,
            FadeValue::Channels(_) => f32::NAN,
        }
    }

    #[test]
    fn test_linear_fade_progresses_and_completes() {
        let clock = ManualClock::new();
        let mut scheduler = FadeScheduler::new();
        scheduler.start(
            FadeTarget::Global,
            FadeOrigin::Scalar(1.0),
            0.0,
            FadeSpec::new(2.0).on_complete(OnComplete::Stop),
            0.0,
        );

        clock.advance(0.5);
        let steps = scheduler.advance(&clock);
        assert!(close(scalar(&steps[0]), 0.75));
        assert_eq!(steps[0].completed, None);

        clock.advance(2.0);
        let steps = scheduler.advance(&clock);
        assert!(close(scalar(&steps[0]), 0.0));
        assert_eq!(steps[0].completed, Some(OnComplete::Stop));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_new_fade_replaces_old_on_same_target() {
        let mut scheduler = FadeScheduler::new();
        let (first, _) = scheduler.start(
            FadeTarget::Group(1),
            FadeOrigin::Scalar(1.0),
            0.0,
            FadeSpec::new(1.0),
            0.0,
        );
        let (second, replaced) = scheduler.start(
            FadeTarget::Group(1),
            FadeOrigin::Scalar(0.5),
            1.0,
            FadeSpec::new(2.0),
            0.0,
        );

        let replaced = replaced.unwrap();
        assert_eq!(replaced.id(), first);
        assert!(close(replaced.end_value(), 0.0));
        assert_ne!(first, second);
        assert_eq!(scheduler.len(), 1);

        let current = scheduler.get(&FadeTarget::Group(1)).unwrap();
        assert_eq!(current.id(), second);
        assert!(close(current.end_value(), 1.0));
        assert!(close(current.spec().duration, 2.0));
    }

    #[test]
    fn test_distinct_targets_coexist() {
        let mut scheduler = FadeScheduler::new();
        for target in [
            FadeTarget::Global,
            FadeTarget::GlobalSources,
            FadeTarget::Group(0),
            FadeTarget::GroupSources(0),
        ] {
            scheduler.start(target, FadeOrigin::Scalar(0.0), 1.0, FadeSpec::new(1.0), 0.0);
        }
        assert_eq!(scheduler.len(), 4);
        assert!(scheduler.cancel(&FadeTarget::Group(0)).is_some());
        assert!(scheduler.cancel(&FadeTarget::Group(0)).is_none());
        assert_eq!(scheduler.len(), 3);
    }

    #[test]
    fn test_unscaled_fade_ignores_time_scale() {
        let clock = ManualClock::new();
        clock.set_time_scale(0.0);
        let mut scheduler = FadeScheduler::new();
        scheduler.start(
            FadeTarget::Group(0),
            FadeOrigin::Scalar(0.0),
            1.0,
            FadeSpec::new(1.0).clock(ClockMode::Scaled),
            0.0,
        );
        scheduler.start(
            FadeTarget::Group(1),
            FadeOrigin::Scalar(0.0),
            1.0,
            FadeSpec::new(1.0).clock(ClockMode::Unscaled),
            0.0,
        );

        clock.advance(0.5);
        let steps = scheduler.advance(&clock);
        assert!(close(scalar(&steps[0]), 0.0));
        assert!(close(scalar(&steps[1]), 0.5));
    }

    #[test]
    fn test_loop_and_yoyo_never_complete() {
        let clock = ManualClock::new();
        let mut scheduler = FadeScheduler::new();
        scheduler.start(
            FadeTarget::Group(0),
            FadeOrigin::Scalar(0.0),
            1.0,
            FadeSpec::new(1.0).repeat(FadeRepeat::Loop),
            0.0,
        );
        scheduler.start(
            FadeTarget::Group(1),
            FadeOrigin::Scalar(0.0),
            1.0,
            FadeSpec::new(1.0).repeat(FadeRepeat::Yoyo),
            0.0,
        );

        clock.advance(1.25);
        let steps = scheduler.advance(&clock);
        assert!(close(scalar(&steps[0]), 0.25));
        assert!(close(scalar(&steps[1]), 0.75));
        assert!(steps.iter().all(|s| s.completed.is_none()));

        clock.advance(1.0);
        let steps = scheduler.advance(&clock);
        assert!(close(scalar(&steps[1]), 0.25));
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn test_eased_fade() {
        let clock = ManualClock::new();
        let mut scheduler = FadeScheduler::new();
        scheduler.start(
            FadeTarget::Global,
            FadeOrigin::Scalar(0.0),
            1.0,
            FadeSpec::new(1.0).ease(Ease::QuadIn),
            0.0,
        );
        clock.advance(0.5);
        let steps = scheduler.advance(&clock);
        assert!(close(scalar(&steps[0]), 0.25));
    }

    #[test]
    fn test_source_fade_keeps_per_channel_origins() {
        let clock = ManualClock::new();
        let mut scheduler = FadeScheduler::new();
        let a = ChannelHandle {
            key: ChannelKey::new(0, 0),
            lease: 1,
        };
        let b = ChannelHandle {
            key: ChannelKey::new(0, 1),
            lease: 1,
        };
        scheduler.start(
            FadeTarget::GroupSources(0),
            FadeOrigin::Channels(vec![(a, 1.0), (b, 0.5)]),
            0.0,
            FadeSpec::new(1.0),
            0.0,
        );
        assert_eq!(
            scheduler
                .get(&FadeTarget::GroupSources(0))
                .unwrap()
                .channels()
                .count(),
            2
        );

        clock.advance(0.5);
        let steps = scheduler.advance(&clock);
        let FadeValue::Channels(values) = &steps[0].value else {
            unreachable!("source fade yields channel values");
        };
        assert!(close(values[0].1, 0.5));
        assert!(close(values[1].1, 0.25));
    }

    #[test]
    fn test_instant_resolves_and_replaces() {
        let mut scheduler = FadeScheduler::new();
        scheduler.start(
            FadeTarget::Global,
            FadeOrigin::Scalar(1.0),
            0.0,
            FadeSpec::new(5.0),
            0.0,
        );

        let step = scheduler.instant(
            FadeTarget::Global,
            FadeOrigin::Scalar(1.0),
            0.25,
            FadeSpec::new(0.0).on_complete(OnComplete::Pause),
        );
        assert!(close(scalar(&step), 0.25));
        assert_eq!(step.completed, Some(OnComplete::Pause));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_drives_sources() {
        assert!(!FadeTarget::Global.drives_sources());
        assert!(!FadeTarget::Group(0).drives_sources());
        assert!(FadeTarget::GroupSources(0).drives_sources());
        assert!(FadeTarget::Clip(ClipId::new("x")).drives_sources());
    }
}
