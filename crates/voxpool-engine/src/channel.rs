//! Playback channels: one voice, one clip at a time.

use serde::Serialize;
use voxpool_core::{sanitize_volume, ClipId, PlayParams};

use crate::backend::Voice;

/// Transport state of a channel. `locked` is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Position of a channel inside the manager: owning group and slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    pub(crate) group: usize,
    pub(crate) slot: usize,
}

impl ChannelKey {
    pub(crate) const fn new(group: usize, slot: usize) -> Self {
        Self { group, slot }
    }

    pub const fn slot(&self) -> usize {
        self.slot
    }
}

/// Reference to a channel for the duration of one play request.
///
/// The pool bumps a channel's lease each time it hands the channel to a new
/// play request; handles from earlier leases no longer resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    pub(crate) key: ChannelKey,
    pub(crate) lease: u64,
}

impl ChannelHandle {
    pub const fn key(&self) -> ChannelKey {
        self.key
    }

    pub const fn slot(&self) -> usize {
        self.key.slot
    }

    pub const fn lease(&self) -> u64 {
        self.lease
    }
}

/// Multipliers sitting above a channel's own volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cascade {
    pub group: f32,
    pub global: f32,
}

impl Cascade {
    pub const fn new(group: f32, global: f32) -> Self {
        Self { group, global }
    }

    /// Effective output volume for an unmodified channel volume.
    pub fn apply(self, unmodified: f32) -> f32 {
        unmodified * self.group * self.global
    }
}

/// A pooled playback channel.
pub struct Channel {
    key: ChannelKey,
    voice: Box<dyn Voice>,
    lease: u64,
    locked: bool,
    clip: Option<ClipId>,
    volume: f32,
    pitch: f32,
    looping: bool,
    started_at: f64,
    state: ChannelState,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("key", &self.key)
            .field("lease", &self.lease)
            .field("state", &self.state)
            .field("locked", &self.locked)
            .field("clip", &self.clip)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}

impl Channel {
    pub(crate) fn new(key: ChannelKey, voice: Box<dyn Voice>) -> Self {
        Self {
            key,
            voice,
            lease: 0,
            locked: false,
            clip: None,
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            started_at: 0.0,
            state: ChannelState::Idle,
        }
    }

    pub const fn key(&self) -> ChannelKey {
        self.key
    }

    /// Handle for the current lease.
    pub const fn handle(&self) -> ChannelHandle {
        ChannelHandle {
            key: self.key,
            lease: self.lease,
        }
    }

    pub const fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ChannelState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == ChannelState::Paused
    }

    /// Playing or paused.
    pub fn is_active(&self) -> bool {
        self.state != ChannelState::Idle
    }

    /// Eligible for the pool allocator: neither locked nor busy.
    pub fn is_free(&self) -> bool {
        !self.locked && self.state == ChannelState::Idle
    }

    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    pub const fn bound_clip(&self) -> Option<&ClipId> {
        self.clip.as_ref()
    }

    pub fn is_bound_to(&self, clip: &ClipId) -> bool {
        self.clip.as_ref() == Some(clip)
    }

    /// Volume requested by the caller, before the cascade.
    pub const fn unmodified_volume(&self) -> f32 {
        self.volume
    }

    /// Volume currently applied to the voice.
    pub fn effective_volume(&self) -> f32 {
        self.voice.volume()
    }

    pub const fn pitch(&self) -> f32 {
        self.pitch
    }

    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// Unscaled clock time of the last play request.
    pub const fn started_at(&self) -> f64 {
        self.started_at
    }

    pub(crate) fn holds(&self, handle: ChannelHandle) -> bool {
        self.key == handle.key && self.lease == handle.lease
    }

    /// Start a new lease, invalidating handles from the previous one.
    pub(crate) fn begin_lease(&mut self) -> ChannelHandle {
        self.lease += 1;
        self.handle()
    }

    /// (Re)start playback from the beginning. Never clears the lock flag.
    pub(crate) fn play(&mut self, clip: ClipId, params: PlayParams, now: f64, cascade: Cascade) {
        self.volume = sanitize_volume(params.volume);
        self.pitch = params.pitch;
        self.looping = params.looping;
        self.locked |= params.lock;
        self.started_at = now;
        self.update_volume(cascade);
        self.voice.start(&clip, self.pitch, self.looping);
        self.clip = Some(clip);
        self.state = ChannelState::Playing;
    }

    pub(crate) fn stop(&mut self) {
        if self.state == ChannelState::Idle {
            return;
        }
        self.voice.stop();
        self.state = ChannelState::Idle;
    }

    pub(crate) fn pause(&mut self) {
        if self.state == ChannelState::Playing {
            self.voice.pause();
            self.state = ChannelState::Paused;
        }
    }

    pub(crate) fn resume(&mut self, volume: Option<f32>, cascade: Cascade) {
        if self.state != ChannelState::Paused {
            return;
        }
        if let Some(volume) = volume {
            self.volume = sanitize_volume(volume);
        }
        self.update_volume(cascade);
        self.voice.resume();
        self.state = ChannelState::Playing;
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Change the unmodified volume and push the result to the voice.
    pub(crate) fn set_volume(&mut self, volume: f32, cascade: Cascade) {
        self.volume = sanitize_volume(volume);
        self.update_volume(cascade);
    }

    /// Recompute the effective volume from the cascade.
    pub(crate) fn update_volume(&mut self, cascade: Cascade) {
        self.voice.set_volume(cascade.apply(self.volume));
    }

    /// Move to idle if a one-shot clip has run out. Returns true on that edge.
    pub(crate) fn poll_finished(&mut self) -> bool {
        if self.state == ChannelState::Playing && !self.looping && self.voice.is_finished() {
            self.state = ChannelState::Idle;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;
    use crate::backend::{Backend, SilentBackend, VoiceTransport};

    fn channel(backend: &mut SilentBackend) -> Channel {
        Channel::new(ChannelKey::new(0, 0), backend.create_voice("fx", 0))
    }

    const FULL: Cascade = Cascade::new(1.0, 1.0);

    #[test]
    fn test_new_channel_is_free() {
        let mut backend = SilentBackend::new();
        let channel = channel(&mut backend);
        assert!(channel.is_free());
        assert_eq!(channel.state(), ChannelState::Idle);
        assert!(channel.bound_clip().is_none());
    }

    #[test]
    fn test_play_pause_resume_stop() {
        let mut backend = SilentBackend::new();
        let mut channel = channel(&mut backend);
        let probe = backend.probe("fx", 0).unwrap();

        channel.play(ClipId::new("hit"), PlayParams::new().volume(0.5), 2.0, FULL);
        assert!(channel.is_playing());
        assert!(!channel.is_free());
        assert_eq!(channel.started_at(), 2.0);
        assert_eq!(probe.transport(), VoiceTransport::Playing);

        channel.pause();
        assert!(channel.is_paused());
        assert!(!channel.is_free());

        channel.resume(Some(0.8), Cascade::new(0.5, 1.0));
        assert!(channel.is_playing());
        assert_eq!(channel.unmodified_volume(), 0.8);
        assert_eq!(channel.effective_volume(), 0.4);

        channel.stop();
        assert!(channel.is_free());
        assert_eq!(probe.transport(), VoiceTransport::Stopped);
    }

    #[test]
    fn test_stop_from_idle_is_noop() {
        let mut backend = SilentBackend::new();
        let mut channel = channel(&mut backend);
        channel.stop();
        assert_eq!(channel.state(), ChannelState::Idle);
    }

    #[test]
    fn test_resume_requires_pause() {
        let mut backend = SilentBackend::new();
        let mut channel = channel(&mut backend);
        channel.resume(Some(0.3), FULL);
        assert_eq!(channel.state(), ChannelState::Idle);
        assert_eq!(channel.unmodified_volume(), 1.0);
    }

    #[test]
    fn test_play_keeps_lock_flag() {
        let mut backend = SilentBackend::new();
        let mut channel = channel(&mut backend);

        channel.play(ClipId::new("a"), PlayParams::new().locked(true), 0.0, FULL);
        channel.stop();
        assert!(channel.is_locked());
        assert!(!channel.is_free());

        channel.play(ClipId::new("b"), PlayParams::new(), 1.0, FULL);
        assert!(channel.is_locked());
        assert!(channel.is_bound_to(&ClipId::new("b")));
    }

    #[test]
    fn test_effective_volume_is_cascade_product() {
        let mut backend = SilentBackend::new();
        let mut channel = channel(&mut backend);
        channel.play(
            ClipId::new("theme"),
            PlayParams::new(),
            0.0,
            Cascade::new(0.8, 0.5),
        );
        assert!((channel.effective_volume() - 0.4).abs() < 1e-6);

        channel.update_volume(Cascade::new(0.8, 1.0));
        assert!((channel.effective_volume() - 0.8).abs() < 1e-6);
        assert_eq!(channel.unmodified_volume(), 1.0);
    }

    #[test]
    fn test_natural_completion() {
        let mut backend = SilentBackend::new();
        let mut channel = channel(&mut backend);
        let probe = backend.probe("fx", 0).unwrap();

        channel.play(ClipId::new("hit"), PlayParams::new(), 0.0, FULL);
        assert!(!channel.poll_finished());
        probe.finish();
        assert!(channel.poll_finished());
        assert!(channel.is_free());
        assert!(!channel.poll_finished());
    }

    #[test]
    fn test_lease_invalidates_old_handles() {
        let mut backend = SilentBackend::new();
        let mut channel = channel(&mut backend);
        let first = channel.begin_lease();
        assert!(channel.holds(first));
        let second = channel.begin_lease();
        assert!(!channel.holds(first));
        assert!(channel.holds(second));
    }
}
