//! Channel groups: bounded pools with a recycling policy and a shared volume.

use serde::Serialize;
use tracing::debug;
use voxpool_core::{sanitize_volume, ClipId, GroupConfig, OnComplete, PlayParams};

use crate::backend::Backend;
use crate::bus::VolumeBus;
use crate::channel::{Cascade, Channel, ChannelHandle, ChannelKey, ChannelState};

/// How the pool satisfied a play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// An idle, unlocked channel was reused.
    Reused(usize),
    /// The pool grew by one channel.
    Created(usize),
    /// The pool was full and its oldest channel was culled.
    Recycled(usize),
}

impl Acquisition {
    pub const fn slot(self) -> usize {
        match self {
            Self::Reused(slot) | Self::Created(slot) | Self::Recycled(slot) => slot,
        }
    }
}

/// A named pool of channels.
#[derive(Debug)]
pub struct Group {
    index: usize,
    id: String,
    capacity: Option<usize>,
    recycle: bool,
    volume: f32,
    crossfade_complete: OnComplete,
    /// Creation order.
    channels: Vec<Channel>,
}

impl Group {
    /// Build a group and create its preallocated channels.
    pub(crate) fn from_config(
        index: usize,
        config: &GroupConfig,
        backend: &mut dyn Backend,
        bus: &mut VolumeBus,
    ) -> Self {
        let mut group = Self {
            index,
            id: config.id.clone(),
            capacity: config.capacity_limit(),
            recycle: config.recycle,
            volume: sanitize_volume(config.volume),
            crossfade_complete: config.crossfade_complete,
            channels: Vec::with_capacity(config.preallocate_count()),
        };
        for _ in 0..config.preallocate_count() {
            group.spawn_channel(backend, bus);
        }
        group
    }

    pub const fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Channel limit, `None` when unbounded.
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub const fn recycles(&self) -> bool {
        self.recycle
    }

    pub const fn volume(&self) -> f32 {
        self.volume
    }

    pub const fn crossfade_complete(&self) -> OnComplete {
        self.crossfade_complete
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, slot: usize) -> Option<&Channel> {
        self.channels.get(slot)
    }

    pub(crate) fn channel_mut(&mut self, slot: usize) -> Option<&mut Channel> {
        self.channels.get_mut(slot)
    }

    /// The channel currently leased by `handle`, if the lease is still live.
    pub fn leased(&self, handle: ChannelHandle) -> Option<&Channel> {
        self.channels
            .get(handle.key.slot)
            .filter(|c| c.holds(handle))
    }

    pub(crate) fn leased_mut(&mut self, handle: ChannelHandle) -> Option<&mut Channel> {
        self.channels
            .get_mut(handle.key.slot)
            .filter(|c| c.holds(handle))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn playing_count(&self) -> usize {
        self.channels.iter().filter(|c| c.is_playing()).count()
    }

    fn has_room(&self) -> bool {
        self.capacity.map_or(true, |limit| self.channels.len() < limit)
    }

    fn spawn_channel(&mut self, backend: &mut dyn Backend, bus: &mut VolumeBus) -> usize {
        let slot = self.channels.len();
        let key = ChannelKey::new(self.index, slot);
        let voice = backend.create_voice(&self.id, slot);
        self.channels.push(Channel::new(key, voice));
        bus.subscribe(key);
        debug!("Group '{}' created channel {}", self.id, slot);
        slot
    }

    /// Pick a channel for a new play request, or refuse with `None`.
    pub(crate) fn acquire_channel(
        &mut self,
        backend: &mut dyn Backend,
        bus: &mut VolumeBus,
    ) -> Option<Acquisition> {
        if let Some(slot) = self.channels.iter().position(Channel::is_free) {
            return Some(Acquisition::Reused(slot));
        }

        if self.has_room() {
            return Some(Acquisition::Created(self.spawn_channel(backend, bus)));
        }

        if !self.recycle {
            return None;
        }

        // min_by keeps the first of equal timestamps, i.e. insertion order.
        let slot = self
            .channels
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.started_at().total_cmp(&b.started_at()))
            .map(|(slot, _)| slot)?;

        let channel = &mut self.channels[slot];
        debug!(
            "Group '{}' recycling channel {} (clip {:?}, started {:.3})",
            self.id,
            slot,
            channel.bound_clip().map(ClipId::as_str),
            channel.started_at()
        );
        channel.stop();
        Some(Acquisition::Recycled(slot))
    }

    /// Acquire a channel and start `clip` on it.
    pub(crate) fn play(
        &mut self,
        clip: ClipId,
        params: PlayParams,
        now: f64,
        global_volume: f32,
        backend: &mut dyn Backend,
        bus: &mut VolumeBus,
    ) -> Option<(ChannelHandle, Acquisition)> {
        let acquisition = self.acquire_channel(backend, bus)?;
        let cascade = Cascade::new(self.volume, global_volume);
        let channel = &mut self.channels[acquisition.slot()];
        let handle = channel.begin_lease();
        channel.play(clip, params, now, cascade);
        Some((handle, acquisition))
    }

    /// Set the group volume. The caller publishes the change on the bus.
    pub(crate) fn set_volume(&mut self, volume: f32) {
        self.volume = sanitize_volume(volume);
    }

    /// Channels matching an optional clip filter.
    fn matching_mut<'a>(
        &'a mut self,
        clip: Option<&'a ClipId>,
    ) -> impl Iterator<Item = &'a mut Channel> + 'a {
        self.channels
            .iter_mut()
            .filter(move |c| clip.map_or(true, |clip| c.is_bound_to(clip)))
    }

    pub(crate) fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.iter_mut()
    }

    pub(crate) fn stop(&mut self, clip: Option<&ClipId>) {
        self.matching_mut(clip).for_each(Channel::stop);
    }

    pub(crate) fn pause(&mut self, clip: Option<&ClipId>) {
        self.matching_mut(clip).for_each(Channel::pause);
    }

    pub(crate) fn resume(&mut self, clip: Option<&ClipId>, global_volume: f32) {
        let cascade = Cascade::new(self.volume, global_volume);
        self.matching_mut(clip).for_each(|c| c.resume(None, cascade));
    }

    pub(crate) fn unlock(&mut self, clip: Option<&ClipId>) {
        self.matching_mut(clip).for_each(|c| c.set_locked(false));
    }

    /// Set the unmodified volume of matching active channels.
    pub(crate) fn set_source_volume(
        &mut self,
        clip: Option<&ClipId>,
        volume: f32,
        global_volume: f32,
    ) {
        let cascade = Cascade::new(self.volume, global_volume);
        self.matching_mut(clip)
            .filter(|c| c.is_active())
            .for_each(|c| c.set_volume(volume, cascade));
    }

    /// Leases and unmodified volumes of the channels currently playing.
    pub(crate) fn playing_sources(&self, clip: Option<&ClipId>) -> Vec<(ChannelHandle, f32)> {
        self.channels
            .iter()
            .filter(|c| c.is_playing() && clip.map_or(true, |clip| c.is_bound_to(clip)))
            .map(|c| (c.handle(), c.unmodified_volume()))
            .collect()
    }

    /// Idle every channel whose one-shot clip ran out, returning their leases.
    pub(crate) fn poll_finished(&mut self) -> Vec<ChannelHandle> {
        self.channels
            .iter_mut()
            .filter_map(|c| c.poll_finished().then(|| c.handle()))
            .collect()
    }

    /// Point-in-time view for presentation layers.
    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            id: self.id.clone(),
            volume: self.volume,
            capacity: self.capacity,
            recycle: self.recycle,
            channels: self
                .channels
                .iter()
                .map(|c| ChannelSnapshot {
                    slot: c.key().slot(),
                    clip: c.bound_clip().cloned(),
                    state: c.state(),
                    locked: c.is_locked(),
                    volume: c.unmodified_volume(),
                    effective_volume: c.effective_volume(),
                    pitch: c.pitch(),
                    looping: c.is_looping(),
                    started_at: c.started_at(),
                })
                .collect(),
        }
    }
}

/// Serializable view of a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub slot: usize,
    pub clip: Option<ClipId>,
    pub state: ChannelState,
    pub locked: bool,
    pub volume: f32,
    pub effective_volume: f32,
    pub pitch: f32,
    pub looping: bool,
    pub started_at: f64,
}

/// Serializable view of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSnapshot {
    pub id: String,
    pub volume: f32,
    pub capacity: Option<usize>,
    pub recycle: bool,
    pub channels: Vec<ChannelSnapshot>,
}
