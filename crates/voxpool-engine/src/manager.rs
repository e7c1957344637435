//! Audio manager owning every group, the volume cascade, and the fade
//! scheduler.
//!
//! The manager is an explicit context object: construct it with a backend
//! and a clock, initialize it once from configuration, drive it with
//! [`AudioManager::update`] once per frame, and dispose of it when done.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;
use tracing::{debug, info, trace, warn};
use voxpool_core::{
    sanitize_volume, ClipDescriptor, ClipId, ClipVariants, ClockMode, Ease, Error, FadeRepeat,
    FadeSpec, GroupConfig, ManagerConfig, OnComplete, PlayOverrides, PlayParams, Result,
    GLOBAL_GROUP_ID,
};

use crate::backend::Backend;
use crate::bus::{VolumeBus, VolumeEvent};
use crate::channel::{Cascade, Channel, ChannelHandle, ChannelKey};
use crate::clock::Clock;
use crate::events::EngineEvent;
use crate::fade::{FadeId, FadeOrigin, FadeScheduler, FadeStep, FadeTarget, FadeValue};
use crate::group::{Acquisition, Group, GroupSnapshot};

/// Events held for observers before new ones are dropped.
pub const EVENT_CAPACITY: usize = 1024;

/// Lifecycle of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerState {
    #[default]
    Uninitialized,
    Initialized,
    Disposed,
}

/// Operation applied uniformly across a [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupOperation {
    Stop,
    Pause,
    Resume,
    Unlock,
    /// Group volume for group scopes, channel volume for clip scopes.
    SetVolume(f32),
}

/// Which channels an operation reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    All,
    Group(&'a str),
    Clip(&'a ClipId),
}

/// Serializable view of the whole manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerSnapshot {
    pub state: ManagerState,
    pub global_volume: f32,
    pub active_fades: usize,
    pub groups: Vec<GroupSnapshot>,
}

/// Runtime audio channel manager.
pub struct AudioManager {
    state: ManagerState,
    backend: Box<dyn Backend>,
    clock: Box<dyn Clock>,
    /// Index 0 is the implicit global group once initialized.
    groups: Vec<Group>,
    global_volume: f32,
    default_ease: Ease,
    default_clock: ClockMode,
    bus: VolumeBus,
    fades: FadeScheduler,
    event_tx: Sender<EngineEvent>,
    event_rx: Receiver<EngineEvent>,
}

impl AudioManager {
    /// Create an uninitialized manager.
    pub fn new(backend: impl Backend + 'static, clock: impl Clock + 'static) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
        Self {
            state: ManagerState::Uninitialized,
            backend: Box::new(backend),
            clock: Box::new(clock),
            groups: Vec::new(),
            global_volume: 1.0,
            default_ease: Ease::default(),
            default_clock: ClockMode::default(),
            bus: VolumeBus::new(),
            fades: FadeScheduler::new(),
            event_tx,
            event_rx,
        }
    }

    /// Build the groups described by `config`.
    ///
    /// Calling this again while initialized logs a warning and changes
    /// nothing.
    pub fn initialize(&mut self, config: &ManagerConfig) -> Result<()> {
        match self.state {
            ManagerState::Initialized => {
                warn!("Audio manager already initialized, ignoring");
                return Ok(());
            }
            ManagerState::Disposed => return Err(Error::Disposed),
            ManagerState::Uninitialized => {}
        }

        config.validate()?;

        let mut groups = Vec::with_capacity(config.groups.len() + 1);
        groups.push(Group::from_config(
            0,
            &GroupConfig::new(GLOBAL_GROUP_ID),
            &mut *self.backend,
            &mut self.bus,
        ));
        for (offset, group_config) in config.groups.iter().enumerate() {
            groups.push(Group::from_config(
                offset + 1,
                group_config,
                &mut *self.backend,
                &mut self.bus,
            ));
        }

        self.groups = groups;
        self.global_volume = config.global_volume;
        self.default_ease = config.default_ease;
        self.default_clock = config.default_clock;
        self.state = ManagerState::Initialized;

        info!(
            "Audio manager initialized: {} groups, {} preallocated channels, global volume {:.2}",
            self.groups.len(),
            self.bus.len(),
            self.global_volume
        );
        Ok(())
    }

    /// Stop everything and tear down all groups.
    pub fn dispose(&mut self) {
        if self.state == ManagerState::Disposed {
            return;
        }
        for group in &mut self.groups {
            group.stop(None);
            self.bus.unsubscribe_group(group.index());
        }
        self.groups.clear();
        self.fades.clear();
        self.state = ManagerState::Disposed;
        info!("Audio manager disposed");
    }

    pub const fn state(&self) -> ManagerState {
        self.state
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            ManagerState::Initialized => Ok(()),
            ManagerState::Uninitialized => Err(Error::NotInitialized),
            ManagerState::Disposed => Err(Error::Disposed),
        }
    }

    fn now(&self, mode: ClockMode) -> f64 {
        self.clock.now(mode)
    }

    /// Queue an event for observers. Dropped when nobody drains the outbox.
    fn emit(&self, event: EngineEvent) {
        if let Err(TrySendError::Full(event)) = self.event_tx.try_send(event) {
            trace!("Event outbox full, dropping {event:?}");
        }
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    /// Index of the group named `id`.
    pub fn group_index(&self, id: &str) -> Result<usize> {
        self.ensure_ready()?;
        self.groups
            .iter()
            .position(|g| g.id() == id)
            .ok_or_else(|| Error::UnknownGroup(id.to_string()))
    }

    /// All groups, the global group first.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Result<&Group> {
        let index = self.group_index(id)?;
        Ok(&self.groups[index])
    }

    pub fn group_mut(&mut self, id: &str) -> Result<GroupMut<'_>> {
        let index = self.group_index(id)?;
        Ok(GroupMut {
            manager: self,
            index,
        })
    }

    /// The implicit group used for ungrouped playback.
    pub fn global_group_mut(&mut self) -> Result<GroupMut<'_>> {
        self.group_mut(GLOBAL_GROUP_ID)
    }

    /// The channel leased by `handle`, if the lease is still live.
    pub fn channel(&self, handle: ChannelHandle) -> Option<&Channel> {
        self.groups.get(handle.key.group)?.leased(handle)
    }

    pub fn channel_mut(&mut self, handle: ChannelHandle) -> Option<ChannelMut<'_>> {
        self.channel(handle)?;
        Some(ChannelMut {
            manager: self,
            handle,
        })
    }

    fn leased_mut(&mut self, handle: ChannelHandle) -> Option<(&mut Channel, Cascade)> {
        let global = self.global_volume;
        let group = self.groups.get_mut(handle.key.group)?;
        let cascade = Cascade::new(group.volume(), global);
        Some((group.leased_mut(handle)?, cascade))
    }

    // ---------------------------------------------------------------------
    // Playback
    // ---------------------------------------------------------------------

    /// Play `clip` in the group named `group`.
    ///
    /// `Ok(None)` means the group's pool was full and does not recycle.
    pub fn play(
        &mut self,
        group: &str,
        clip: impl Into<ClipId>,
        params: PlayParams,
    ) -> Result<Option<ChannelHandle>> {
        let index = self.group_index(group)?;
        Ok(self.play_in(index, clip.into(), params))
    }

    /// Play an authored descriptor, with optional overrides.
    pub fn play_descriptor(
        &mut self,
        descriptor: &ClipDescriptor,
        overrides: PlayOverrides,
    ) -> Result<Option<ChannelHandle>> {
        let group = descriptor.group.as_deref().unwrap_or(GLOBAL_GROUP_ID);
        let index = self.group_index(group)?;
        Ok(self.play_in(index, descriptor.clip.clone(), overrides.apply(descriptor)))
    }

    /// Pick a variant from `variants` and play it.
    pub fn play_variant(
        &mut self,
        variants: &mut ClipVariants,
        overrides: PlayOverrides,
    ) -> Result<Option<ChannelHandle>> {
        self.ensure_ready()?;
        let descriptor = variants.pick()?.clone();
        self.play_descriptor(&descriptor, overrides)
    }

    fn play_in(&mut self, index: usize, clip: ClipId, params: PlayParams) -> Option<ChannelHandle> {
        let now = self.now(ClockMode::Unscaled);
        let global = self.global_volume;
        let group = &mut self.groups[index];
        let group_id = group.id().to_string();

        let Some((handle, acquisition)) = group.play(
            clip.clone(),
            params,
            now,
            global,
            &mut *self.backend,
            &mut self.bus,
        ) else {
            info!("Group '{group_id}' is full, refused to play {clip}");
            self.emit(EngineEvent::PlayRefused {
                group: group_id,
                clip,
            });
            return None;
        };

        trace!(
            "Group '{}' playing {} on channel {} ({:?})",
            group_id,
            clip,
            handle.slot(),
            acquisition
        );
        let event = match acquisition {
            Acquisition::Recycled(_) => EngineEvent::ChannelRecycled {
                group: group_id,
                handle,
                clip,
            },
            Acquisition::Reused(_) | Acquisition::Created(_) => EngineEvent::ChannelStarted {
                group: group_id,
                handle,
                clip,
            },
        };
        self.emit(event);
        Some(handle)
    }

    /// Apply `operation` to every channel in `scope`.
    pub fn apply(&mut self, operation: GroupOperation, scope: Scope<'_>) -> Result<()> {
        self.ensure_ready()?;
        let (indices, clip): (Vec<usize>, Option<&ClipId>) = match scope {
            Scope::All => ((0..self.groups.len()).collect(), None),
            Scope::Group(id) => (vec![self.group_index(id)?], None),
            Scope::Clip(clip) => ((0..self.groups.len()).collect(), Some(clip)),
        };
        for index in indices {
            self.apply_to_group(index, operation, clip);
        }
        Ok(())
    }

    fn apply_to_group(&mut self, index: usize, operation: GroupOperation, clip: Option<&ClipId>) {
        let global = self.global_volume;
        match operation {
            GroupOperation::Stop => self.groups[index].stop(clip),
            GroupOperation::Pause => self.groups[index].pause(clip),
            GroupOperation::Resume => self.groups[index].resume(clip, global),
            GroupOperation::Unlock => self.groups[index].unlock(clip),
            GroupOperation::SetVolume(volume) => match clip {
                None => self.set_group_volume_in(index, volume),
                Some(clip) => self.groups[index].set_source_volume(Some(clip), volume, global),
            },
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        self.apply(GroupOperation::Stop, Scope::All)
    }

    pub fn stop_group(&mut self, id: &str) -> Result<()> {
        self.apply(GroupOperation::Stop, Scope::Group(id))
    }

    pub fn stop_clip(&mut self, clip: &ClipId) -> Result<()> {
        self.apply(GroupOperation::Stop, Scope::Clip(clip))
    }

    pub fn pause(&mut self) -> Result<()> {
        self.apply(GroupOperation::Pause, Scope::All)
    }

    pub fn pause_group(&mut self, id: &str) -> Result<()> {
        self.apply(GroupOperation::Pause, Scope::Group(id))
    }

    pub fn pause_clip(&mut self, clip: &ClipId) -> Result<()> {
        self.apply(GroupOperation::Pause, Scope::Clip(clip))
    }

    pub fn resume(&mut self) -> Result<()> {
        self.apply(GroupOperation::Resume, Scope::All)
    }

    pub fn resume_group(&mut self, id: &str) -> Result<()> {
        self.apply(GroupOperation::Resume, Scope::Group(id))
    }

    pub fn resume_clip(&mut self, clip: &ClipId) -> Result<()> {
        self.apply(GroupOperation::Resume, Scope::Clip(clip))
    }

    pub fn unlock(&mut self) -> Result<()> {
        self.apply(GroupOperation::Unlock, Scope::All)
    }

    pub fn unlock_group(&mut self, id: &str) -> Result<()> {
        self.apply(GroupOperation::Unlock, Scope::Group(id))
    }

    pub fn unlock_clip(&mut self, clip: &ClipId) -> Result<()> {
        self.apply(GroupOperation::Unlock, Scope::Clip(clip))
    }

    // ---------------------------------------------------------------------
    // Volume cascade
    // ---------------------------------------------------------------------

    pub const fn global_volume(&self) -> f32 {
        self.global_volume
    }

    /// Set the global volume and recompute every live channel.
    pub fn set_global_volume(&mut self, volume: f32) -> Result<()> {
        self.ensure_ready()?;
        self.set_global_volume_inner(volume);
        self.emit(EngineEvent::GlobalVolumeChanged(self.global_volume));
        Ok(())
    }

    fn set_global_volume_inner(&mut self, volume: f32) {
        self.global_volume = sanitize_volume(volume);
        self.publish(VolumeEvent::GlobalVolumeChanged);
    }

    fn set_group_volume_in(&mut self, index: usize, volume: f32) {
        self.set_group_volume_quiet(index, volume);
        let group = &self.groups[index];
        self.emit(EngineEvent::GroupVolumeChanged {
            group: group.id().to_string(),
            volume: group.volume(),
        });
    }

    fn set_group_volume_quiet(&mut self, index: usize, volume: f32) {
        self.groups[index].set_volume(volume);
        self.publish(VolumeEvent::GroupVolumeChanged(index));
    }

    /// Push recomputed effective volumes to every subscriber of `event`.
    fn publish(&mut self, event: VolumeEvent) {
        let global = self.global_volume;
        for key in self.bus.publish(event) {
            Self::recompute(&mut self.groups, key, global);
        }
    }

    fn recompute(groups: &mut [Group], key: ChannelKey, global: f32) {
        let Some(group) = groups.get_mut(key.group) else {
            return;
        };
        let cascade = Cascade::new(group.volume(), global);
        if let Some(channel) = group.channel_mut(key.slot) {
            channel.update_volume(cascade);
            trace!(
                "Channel {}/{} effective volume {:.3}",
                key.group,
                key.slot,
                channel.effective_volume()
            );
        }
    }

    // ---------------------------------------------------------------------
    // Fades
    // ---------------------------------------------------------------------

    /// A fade spec carrying the configured default ease and clock.
    pub fn fade_spec(&self, duration: f32) -> FadeSpec {
        FadeSpec::new(duration)
            .ease(self.default_ease)
            .clock(self.default_clock)
    }

    /// Fade the global volume multiplier.
    pub fn fade_global(&mut self, to: f32, spec: FadeSpec) -> Result<FadeId> {
        self.ensure_ready()?;
        let origin = FadeOrigin::Scalar(self.global_volume);
        Ok(self.start_fade(FadeTarget::Global, origin, to, spec))
    }

    /// Fade the own volume of every channel currently playing.
    pub fn fade_global_sources(&mut self, to: f32, spec: FadeSpec) -> Result<FadeId> {
        self.ensure_ready()?;
        let sources = self
            .groups
            .iter()
            .flat_map(|g| g.playing_sources(None))
            .collect();
        Ok(self.start_fade(FadeTarget::GlobalSources, FadeOrigin::Channels(sources), to, spec))
    }

    /// Fade every channel currently playing `clip`, in any group.
    pub fn fade_clip(&mut self, clip: &ClipId, to: f32, spec: FadeSpec) -> Result<FadeId> {
        self.ensure_ready()?;
        let sources = self
            .groups
            .iter()
            .flat_map(|g| g.playing_sources(Some(clip)))
            .collect();
        Ok(self.start_fade(
            FadeTarget::Clip(clip.clone()),
            FadeOrigin::Channels(sources),
            to,
            spec,
        ))
    }

    /// Cancel the fade on `target`. Returns whether one was active.
    ///
    /// With `snap_to_end` the end value is applied; the completion behaviour
    /// never runs.
    pub fn cancel_fade(&mut self, target: &FadeTarget, snap_to_end: bool) -> Result<bool> {
        self.ensure_ready()?;
        Ok(self.cancel_fade_inner(target, snap_to_end))
    }

    fn cancel_fade_inner(&mut self, target: &FadeTarget, snap_to_end: bool) -> bool {
        let Some(fade) = self.fades.cancel(target) else {
            return false;
        };
        if snap_to_end {
            self.apply_fade_value(fade.target(), &fade.value_at(1.0));
        }
        true
    }

    /// Active fades.
    pub const fn fades(&self) -> &FadeScheduler {
        &self.fades
    }

    fn start_fade(
        &mut self,
        target: FadeTarget,
        origin: FadeOrigin,
        to: f32,
        spec: FadeSpec,
    ) -> FadeId {
        let to = sanitize_volume(to);
        if spec.is_instant() {
            let step = self.fades.instant(target, origin, to, spec);
            let id = step.id;
            self.apply_step(step);
            return id;
        }
        let now = self.now(spec.clock);
        self.fades.start(target, origin, to, spec, now).0
    }

    fn apply_step(&mut self, step: FadeStep) {
        self.apply_fade_value(&step.target, &step.value);
        if let Some(behaviour) = step.completed {
            self.complete_fade(&step.target, &step.value, behaviour);
            debug!("Fade {} on {:?} completed", step.id.get(), step.target);
            self.emit(EngineEvent::FadeCompleted {
                id: step.id,
                target: step.target,
            });
        }
    }

    fn apply_fade_value(&mut self, target: &FadeTarget, value: &FadeValue) {
        match (target, value) {
            (FadeTarget::Global, FadeValue::Scalar(volume)) => {
                self.set_global_volume_inner(*volume);
            }
            (FadeTarget::Group(index), FadeValue::Scalar(volume)) => {
                if *index < self.groups.len() {
                    self.set_group_volume_quiet(*index, *volume);
                }
            }
            (FadeTarget::Channel(handle), FadeValue::Scalar(volume)) => {
                if let Some((channel, cascade)) = self.leased_mut(*handle) {
                    channel.set_volume(*volume, cascade);
                }
            }
            (_, FadeValue::Channels(values)) => {
                for (handle, volume) in values {
                    if let Some((channel, cascade)) = self.leased_mut(*handle) {
                        channel.set_volume(*volume, cascade);
                    }
                }
            }
            (target, FadeValue::Scalar(_)) => {
                warn!("Scalar fade value has no meaning for {target:?}, ignoring");
            }
        }
    }

    fn complete_fade(&mut self, target: &FadeTarget, value: &FadeValue, behaviour: OnComplete) {
        let act = |channel: &mut Channel| match behaviour {
            OnComplete::None => {}
            OnComplete::Stop => channel.stop(),
            OnComplete::Pause => channel.pause(),
        };

        match target {
            FadeTarget::Global => {
                for group in &mut self.groups {
                    group.channels_mut().for_each(act);
                }
            }
            FadeTarget::Group(index) => {
                if let Some(group) = self.groups.get_mut(*index) {
                    group.channels_mut().for_each(act);
                }
            }
            FadeTarget::Channel(handle) => {
                if let Some((channel, _)) = self.leased_mut(*handle) {
                    act(channel);
                }
            }
            FadeTarget::GlobalSources | FadeTarget::GroupSources(_) | FadeTarget::Clip(_) => {
                let FadeValue::Channels(values) = value else {
                    return;
                };
                for (handle, _) in values {
                    if let Some((channel, _)) = self.leased_mut(*handle) {
                        act(channel);
                    }
                }
            }
        }
    }

    /// Play `clip` in `group` while fading out everything else playing there.
    ///
    /// All-or-nothing: if the pool refuses the new clip, no fade starts and
    /// `Ok(None)` is returned.
    pub fn crossfade(
        &mut self,
        group: &str,
        clip: impl Into<ClipId>,
        params: PlayParams,
        spec: FadeSpec,
    ) -> Result<Option<ChannelHandle>> {
        let index = self.group_index(group)?;
        Ok(self.crossfade_in(index, clip.into(), params, spec))
    }

    fn crossfade_in(
        &mut self,
        index: usize,
        clip: ClipId,
        params: PlayParams,
        spec: FadeSpec,
    ) -> Option<ChannelHandle> {
        let outgoing = self.groups[index].playing_sources(None);
        let incoming = self.play_in(
            index,
            clip,
            PlayParams {
                volume: 0.0,
                ..params
            },
        )?;

        let once = FadeSpec {
            repeat: FadeRepeat::Once,
            ..spec
        };
        self.start_fade(
            FadeTarget::Channel(incoming),
            FadeOrigin::Scalar(0.0),
            params.volume,
            once.on_complete(OnComplete::None),
        );

        let behaviour = self.groups[index].crossfade_complete();
        for (handle, from) in outgoing {
            // The pool may have recycled one of them for the incoming clip.
            if self.channel(handle).is_none() {
                continue;
            }
            self.start_fade(
                FadeTarget::Channel(handle),
                FadeOrigin::Scalar(from),
                0.0,
                once.on_complete(behaviour),
            );
        }
        Some(incoming)
    }

    // ---------------------------------------------------------------------
    // Tick
    // ---------------------------------------------------------------------

    /// Advance fades and detect clips that played to their end.
    ///
    /// Call once per frame. Does nothing unless initialized.
    pub fn update(&mut self) {
        if self.state != ManagerState::Initialized {
            return;
        }

        for step in self.fades.advance(&*self.clock) {
            self.apply_step(step);
        }

        let groups = &self.groups;
        self.fades.retain(|fade| match fade.target() {
            FadeTarget::Channel(handle) => groups
                .get(handle.key.group)
                .and_then(|g| g.leased(*handle))
                .is_some(),
            _ => true,
        });

        for index in 0..self.groups.len() {
            let finished = self.groups[index].poll_finished();
            for handle in finished {
                let group = self.groups[index].id().to_string();
                trace!("Group '{}' channel {} finished", group, handle.slot());
                self.emit(EngineEvent::ChannelFinished { group, handle });
            }
        }
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    /// Try to receive an event without blocking.
    pub fn try_recv_event(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Drain every pending event.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.event_rx.try_iter().collect()
    }

    /// A receiver observers can poll from elsewhere.
    pub fn event_receiver(&self) -> Receiver<EngineEvent> {
        self.event_rx.clone()
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        ManagerSnapshot {
            state: self.state,
            global_volume: self.global_volume,
            active_fades: self.fades.len(),
            groups: self.groups.iter().map(Group::snapshot).collect(),
        }
    }
}

/// Mutable access to one group through the manager.
pub struct GroupMut<'a> {
    manager: &'a mut AudioManager,
    index: usize,
}

impl GroupMut<'_> {
    pub fn group(&self) -> &Group {
        &self.manager.groups[self.index]
    }

    pub fn id(&self) -> &str {
        self.group().id()
    }

    pub fn volume(&self) -> f32 {
        self.group().volume()
    }

    /// Play `clip`; `None` when the pool refuses.
    pub fn play(&mut self, clip: impl Into<ClipId>, params: PlayParams) -> Option<ChannelHandle> {
        self.manager.play_in(self.index, clip.into(), params)
    }

    pub fn stop(&mut self) {
        self.manager.apply_to_group(self.index, GroupOperation::Stop, None);
    }

    pub fn stop_clip(&mut self, clip: &ClipId) {
        self.manager
            .apply_to_group(self.index, GroupOperation::Stop, Some(clip));
    }

    pub fn pause(&mut self) {
        self.manager.apply_to_group(self.index, GroupOperation::Pause, None);
    }

    pub fn pause_clip(&mut self, clip: &ClipId) {
        self.manager
            .apply_to_group(self.index, GroupOperation::Pause, Some(clip));
    }

    pub fn resume(&mut self) {
        self.manager
            .apply_to_group(self.index, GroupOperation::Resume, None);
    }

    pub fn resume_clip(&mut self, clip: &ClipId) {
        self.manager
            .apply_to_group(self.index, GroupOperation::Resume, Some(clip));
    }

    pub fn unlock(&mut self) {
        self.manager
            .apply_to_group(self.index, GroupOperation::Unlock, None);
    }

    pub fn unlock_clip(&mut self, clip: &ClipId) {
        self.manager
            .apply_to_group(self.index, GroupOperation::Unlock, Some(clip));
    }

    /// Set the group volume; only this group's channels recompute.
    pub fn set_volume(&mut self, volume: f32) {
        self.manager.set_group_volume_in(self.index, volume);
    }

    /// Fade the group volume multiplier.
    pub fn fade_to(&mut self, to: f32, spec: FadeSpec) -> FadeId {
        let origin = FadeOrigin::Scalar(self.volume());
        self.manager
            .start_fade(FadeTarget::Group(self.index), origin, to, spec)
    }

    /// Fade the own volume of this group's playing channels.
    pub fn fade_sources_to(&mut self, to: f32, spec: FadeSpec) -> FadeId {
        let origin = FadeOrigin::Channels(self.group().playing_sources(None));
        self.manager
            .start_fade(FadeTarget::GroupSources(self.index), origin, to, spec)
    }

    pub fn cancel_fade(&mut self, snap_to_end: bool) -> bool {
        self.manager
            .cancel_fade_inner(&FadeTarget::Group(self.index), snap_to_end)
    }

    pub fn cancel_sources_fade(&mut self, snap_to_end: bool) -> bool {
        self.manager
            .cancel_fade_inner(&FadeTarget::GroupSources(self.index), snap_to_end)
    }

    /// See [`AudioManager::crossfade`].
    pub fn crossfade(
        &mut self,
        clip: impl Into<ClipId>,
        params: PlayParams,
        spec: FadeSpec,
    ) -> Option<ChannelHandle> {
        self.manager
            .crossfade_in(self.index, clip.into(), params, spec)
    }
}

/// Direct control of one leased channel.
///
/// Direct calls bypass the pool's locking decisions but never clear the
/// lock flag.
pub struct ChannelMut<'a> {
    manager: &'a mut AudioManager,
    handle: ChannelHandle,
}

impl ChannelMut<'_> {
    pub const fn handle(&self) -> ChannelHandle {
        self.handle
    }

    /// The leased channel. The borrow on the manager keeps the lease live.
    pub fn channel(&self) -> &Channel {
        let key = self.handle.key;
        &self.manager.groups[key.group].channels()[key.slot]
    }

    fn with_channel(&mut self, f: impl FnOnce(&mut Channel, Cascade)) {
        if let Some((channel, cascade)) = self.manager.leased_mut(self.handle) {
            f(channel, cascade);
        }
    }

    /// Restart playback on this channel with a new clip.
    pub fn play(&mut self, clip: impl Into<ClipId>, params: PlayParams) {
        let now = self.manager.now(ClockMode::Unscaled);
        let clip = clip.into();
        self.with_channel(|channel, cascade| channel.play(clip, params, now, cascade));
    }

    pub fn stop(&mut self) {
        self.with_channel(|channel, _| channel.stop());
    }

    pub fn pause(&mut self) {
        self.with_channel(|channel, _| channel.pause());
    }

    /// Resume, optionally reasserting the unmodified volume.
    pub fn resume(&mut self, volume: Option<f32>) {
        self.with_channel(|channel, cascade| channel.resume(volume, cascade));
    }

    /// Set the unmodified volume.
    pub fn set_volume(&mut self, volume: f32) {
        self.with_channel(|channel, cascade| channel.set_volume(volume, cascade));
    }

    pub fn lock(&mut self) {
        self.with_channel(|channel, _| channel.set_locked(true));
    }

    pub fn unlock(&mut self) {
        self.with_channel(|channel, _| channel.set_locked(false));
    }

    /// Fade this channel's unmodified volume.
    pub fn fade_to(&mut self, to: f32, spec: FadeSpec) -> FadeId {
        let origin = FadeOrigin::Scalar(self.channel().unmodified_volume());
        self.manager
            .start_fade(FadeTarget::Channel(self.handle), origin, to, spec)
    }

    pub fn cancel_fade(&mut self, snap_to_end: bool) -> bool {
        self.manager
            .cancel_fade_inner(&FadeTarget::Channel(self.handle), snap_to_end)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;
    use crate::backend::{SilentBackend, VoiceTransport};
    use crate::channel::ChannelState;
    use crate::clock::ManualClock;
    use proptest::prelude::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    struct Fixture {
        manager: AudioManager,
        backend: SilentBackend,
        clock: ManualClock,
    }

    impl Fixture {
        fn new(config: &ManagerConfig) -> Self {
            let backend = SilentBackend::new();
            let clock = ManualClock::new();
            let mut manager = AudioManager::new(backend.clone(), clock.clone());
            manager.initialize(config).unwrap();
            Self {
                manager,
                backend,
                clock,
            }
        }

        fn tick(&mut self, seconds: f64) {
            self.clock.advance(seconds);
            self.manager.update();
        }

        fn play(&mut self, group: &str, clip: &str, params: PlayParams) -> ChannelHandle {
            self.manager.play(group, clip, params).unwrap().unwrap()
        }

        fn channel(&self, handle: ChannelHandle) -> &Channel {
            self.manager.channel(handle).unwrap()
        }

        fn volume_of(&self, handle: ChannelHandle) -> f32 {
            self.channel(handle).unmodified_volume()
        }
    }

    fn config() -> ManagerConfig {
        ManagerConfig::new()
            .with_group(GroupConfig::new("music").capacity(2))
            .with_group(GroupConfig::new("fx").capacity(2).recycle(true))
            .with_group(GroupConfig::new("ui"))
    }

    #[test]
    fn test_volume_cascade() {
        let mut fx = Fixture::new(
            &ManagerConfig::new()
                .global_volume(0.5)
                .with_group(GroupConfig::new("music").volume(0.8)),
        );
        let handle = fx.play("music", "theme", PlayParams::new());
        assert!(close(fx.channel(handle).effective_volume(), 0.4));

        fx.manager.set_global_volume(1.0).unwrap();
        assert!(close(fx.channel(handle).effective_volume(), 0.8));
        assert_eq!(fx.manager.group("music").unwrap().volume(), 0.8);
        assert_eq!(fx.volume_of(handle), 1.0);
    }

    #[test]
    fn test_group_volume_leaves_other_groups() {
        let mut fx = Fixture::new(&config());
        let music = fx.play("music", "theme", PlayParams::new());
        let ui = fx.play("ui", "click", PlayParams::new().volume(0.6));

        fx.manager.group_mut("music").unwrap().set_volume(0.25);

        assert!(close(fx.channel(music).effective_volume(), 0.25));
        assert!(close(fx.channel(ui).effective_volume(), 0.6));
        let probe = fx.backend.probe("ui", ui.slot()).unwrap();
        assert!(close(probe.volume(), 0.6));
    }

    #[test]
    fn test_full_recycling_pool_culls_oldest() {
        let mut fx = Fixture::new(&config());
        let first = fx.play("fx", "shot", PlayParams::new());
        fx.clock.advance(0.1);
        let second = fx.play("fx", "shot", PlayParams::new());
        fx.clock.advance(0.1);
        let third = fx.play("fx", "boom", PlayParams::new());

        assert_eq!(third.slot(), first.slot());
        assert!(fx.manager.channel(first).is_none());
        assert!(fx.channel(second).is_playing());
        assert_eq!(fx.manager.group("fx").unwrap().len(), 2);

        let events = fx.manager.events();
        assert!(matches!(
            events.last(),
            Some(EngineEvent::ChannelRecycled { clip, .. }) if clip.as_str() == "boom"
        ));
    }

    #[test]
    fn test_full_pool_refuses() {
        let mut fx = Fixture::new(&config());
        let a = fx.play("music", "a", PlayParams::new());
        let b = fx.play("music", "b", PlayParams::new());
        fx.manager.events();

        assert_eq!(fx.manager.play("music", "c", PlayParams::new()).unwrap(), None);
        assert!(fx.channel(a).is_playing());
        assert!(fx.channel(b).is_playing());
        assert_eq!(
            fx.manager.events(),
            vec![EngineEvent::PlayRefused {
                group: "music".to_string(),
                clip: ClipId::new("c"),
            }]
        );
    }

    #[test]
    fn test_paused_channel_is_not_reused() {
        let mut fx = Fixture::new(&config());
        let a = fx.play("music", "a", PlayParams::new());
        fx.manager.pause_group("music").unwrap();
        let b = fx.play("music", "b", PlayParams::new());
        assert_ne!(a.slot(), b.slot());
        assert!(fx.channel(a).is_paused());
    }

    #[test]
    fn test_locked_channel_held_until_unlocked() {
        let mut fx = Fixture::new(&config());
        let a = fx.play("ui", "hover", PlayParams::new().locked(true));
        fx.manager.stop_group("ui").unwrap();
        let channel = fx.channel(a);
        assert_eq!(channel.state(), ChannelState::Idle);
        assert!(channel.is_locked());

        let b = fx.play("ui", "click", PlayParams::new());
        assert_ne!(a.slot(), b.slot());

        fx.manager.stop_group("ui").unwrap();
        fx.manager.unlock_group("ui").unwrap();
        let c = fx.play("ui", "click", PlayParams::new());
        assert_eq!(c.slot(), a.slot());
    }

    #[test]
    fn test_direct_play_keeps_lock() {
        let mut fx = Fixture::new(&config());
        let handle = fx.play("ui", "hover", PlayParams::new().locked(true));
        let mut channel = fx.manager.channel_mut(handle).unwrap();
        channel.play("tooltip", PlayParams::new());
        assert!(channel.channel().is_locked());
        assert_eq!(channel.handle(), handle);
        channel.unlock();
        assert!(!channel.channel().is_locked());
    }

    #[test]
    fn test_new_fade_cancels_previous_on_same_target() {
        let mut fx = Fixture::new(&config());
        let handle = fx.play("music", "theme", PlayParams::new());

        let a = fx
            .manager
            .fade_global(0.0, FadeSpec::new(1.0).on_complete(OnComplete::Stop))
            .unwrap();
        fx.tick(0.5);
        assert!(close(fx.manager.global_volume(), 0.5));

        let b = fx.manager.fade_global(1.0, FadeSpec::new(1.0)).unwrap();
        assert_ne!(a, b);
        assert_eq!(fx.manager.fades().len(), 1);
        fx.tick(0.5);
        assert!(close(fx.manager.global_volume(), 0.75));
        fx.tick(1.0);

        assert!(close(fx.manager.global_volume(), 1.0));
        assert!(fx.channel(handle).is_playing());
        let completed: Vec<_> = fx
            .manager
            .events()
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::FadeCompleted { id, .. } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec![b]);
        assert!(fx.manager.fades().is_empty());
    }

    #[test]
    fn test_fade_completion_stops_group() {
        let mut fx = Fixture::new(&config());
        let music = fx.play("music", "theme", PlayParams::new());
        let ui = fx.play("ui", "click", PlayParams::new());

        fx.manager
            .group_mut("music")
            .unwrap()
            .fade_to(0.0, FadeSpec::new(0.5).on_complete(OnComplete::Stop));
        fx.tick(0.6);

        assert!(!fx.channel(music).is_active());
        assert!(fx.channel(ui).is_playing());
        assert_eq!(fx.manager.group("music").unwrap().volume(), 0.0);
    }

    #[test]
    fn test_cancel_fade_with_snap() {
        let mut fx = Fixture::new(&config());
        let handle = fx.play("music", "theme", PlayParams::new());
        fx.manager
            .fade_global(0.2, FadeSpec::new(2.0).on_complete(OnComplete::Pause))
            .unwrap();
        fx.tick(0.5);

        assert!(fx.manager.cancel_fade(&FadeTarget::Global, true).unwrap());
        assert!(close(fx.manager.global_volume(), 0.2));
        assert!(fx.channel(handle).is_playing());
        assert!(!fx.manager.cancel_fade(&FadeTarget::Global, false).unwrap());
    }

    #[test]
    fn test_instant_fade_applies_immediately() {
        let mut fx = Fixture::new(&config());
        let handle = fx.play("ui", "click", PlayParams::new());
        let id = fx
            .manager
            .channel_mut(handle)
            .unwrap()
            .fade_to(0.3, FadeSpec::new(0.0).on_complete(OnComplete::Stop));

        let channel = fx.channel(handle);
        assert!(close(channel.unmodified_volume(), 0.3));
        assert!(!channel.is_active());
        assert!(fx.manager.fades().is_empty());
        assert!(fx
            .manager
            .events()
            .contains(&EngineEvent::FadeCompleted {
                id,
                target: FadeTarget::Channel(handle),
            }));
    }

    #[test]
    fn test_cancel_group_sources_fade_with_snap() {
        let mut fx = Fixture::new(&config());
        let first = fx.play("music", "theme", PlayParams::new());
        let second = fx.play("music", "stinger", PlayParams::new().volume(0.6));
        fx.manager
            .group_mut("music")
            .unwrap()
            .fade_sources_to(0.2, FadeSpec::new(2.0));
        fx.tick(0.5);
        assert!(fx.volume_of(first) > 0.2);

        let mut music = fx.manager.group_mut("music").unwrap();
        assert!(music.cancel_sources_fade(true));
        assert!(!music.cancel_sources_fade(false));
        assert!(close(fx.volume_of(first), 0.2));
        assert!(close(fx.volume_of(second), 0.2));
        assert!(fx.manager.fades().is_empty());
    }

    #[test]
    fn test_non_finite_fade_duration_completes_at_once() {
        let mut fx = Fixture::new(&config());
        let handle = fx.play("music", "theme", PlayParams::new());

        let spec = FadeSpec::new(f32::NAN).on_complete(OnComplete::Stop);
        let id = fx.manager.fade_global(0.2, spec).unwrap();

        assert!(close(fx.manager.global_volume(), 0.2));
        assert!(!fx.channel(handle).is_active());
        assert!(fx.manager.fades().is_empty());
        assert!(fx
            .manager
            .events()
            .contains(&EngineEvent::FadeCompleted {
                id,
                target: FadeTarget::Global,
            }));

        fx.manager
            .fade_global(0.7, FadeSpec::new(f32::INFINITY))
            .unwrap();
        assert!(close(fx.manager.global_volume(), 0.7));
        assert!(fx.manager.fades().is_empty());
    }

    #[test]
    fn test_non_finite_volumes_are_silent() {
        let mut fx = Fixture::new(&config());
        let handle = fx.play("music", "theme", PlayParams::new());

        fx.manager.set_global_volume(f32::NAN).unwrap();
        assert_eq!(fx.manager.global_volume(), 0.0);
        assert_eq!(fx.channel(handle).effective_volume(), 0.0);
        fx.manager.set_global_volume(1.0).unwrap();

        fx.manager.group_mut("music").unwrap().set_volume(f32::NAN);
        assert_eq!(fx.manager.group("music").unwrap().volume(), 0.0);
        assert_eq!(fx.channel(handle).effective_volume(), 0.0);
        fx.manager.group_mut("music").unwrap().set_volume(1.0);

        fx.manager
            .channel_mut(handle)
            .unwrap()
            .set_volume(f32::INFINITY);
        assert_eq!(fx.volume_of(handle), 0.0);
        assert!(fx.channel(handle).effective_volume().is_finite());

        let quiet = fx.play("ui", "click", PlayParams::new().volume(f32::NAN));
        assert_eq!(fx.volume_of(quiet), 0.0);
        assert_eq!(fx.channel(quiet).effective_volume(), 0.0);

        fx.manager
            .fade_global(f32::NAN, FadeSpec::new(1.0))
            .unwrap();
        fx.tick(0.5);
        assert!(fx.manager.global_volume().is_finite());
        fx.tick(0.6);
        assert_eq!(fx.manager.global_volume(), 0.0);
    }

    #[test]
    fn test_undrained_events_stay_bounded() {
        let mut fx = Fixture::new(&config());
        for round in 0..EVENT_CAPACITY * 4 {
            fx.play("fx", &format!("shot_{}", round % 8), PlayParams::new());
            fx.manager.update();
        }

        let outbox = fx.manager.event_receiver();
        assert_eq!(outbox.len(), EVENT_CAPACITY);
        assert_eq!(fx.manager.events().len(), EVENT_CAPACITY);
        assert!(outbox.is_empty());

        fx.play("fx", "shot", PlayParams::new());
        assert!(!fx.manager.events().is_empty());
    }

    #[test]
    fn test_crossfade_swaps_tracks() {
        let mut fx = Fixture::new(&config());
        let old = fx.play("music", "day", PlayParams::new());
        let new = fx
            .manager
            .crossfade("music", "night", PlayParams::new(), FadeSpec::new(1.0))
            .unwrap()
            .unwrap();
        assert_eq!(fx.volume_of(new), 0.0);

        fx.tick(0.5);
        assert!(close(fx.volume_of(old), 0.5));
        assert!(close(fx.volume_of(new), 0.5));

        fx.tick(0.6);
        assert!(!fx.channel(old).is_active());
        assert!(close(fx.volume_of(new), 1.0));
        assert!(fx.channel(new).is_playing());
        assert!(fx.manager.fades().is_empty());
    }

    #[test]
    fn test_crossfade_refused_starts_nothing() {
        let mut fx = Fixture::new(&config());
        let a = fx.play("music", "a", PlayParams::new());
        let b = fx.play("music", "b", PlayParams::new());

        let result = fx
            .manager
            .crossfade("music", "c", PlayParams::new(), FadeSpec::new(1.0))
            .unwrap();
        assert_eq!(result, None);
        assert!(fx.manager.fades().is_empty());

        fx.tick(2.0);
        assert!(fx.channel(a).is_playing());
        assert!(fx.channel(b).is_playing());
        assert_eq!(fx.volume_of(a), 1.0);
    }

    #[test]
    fn test_crossfade_into_recycled_slot() {
        let mut fx = Fixture::new(
            &ManagerConfig::new()
                .with_group(GroupConfig::new("music").capacity(1).recycle(true)),
        );
        let old = fx.play("music", "day", PlayParams::new());
        let new = fx
            .manager
            .crossfade("music", "night", PlayParams::new(), FadeSpec::new(1.0))
            .unwrap()
            .unwrap();

        assert!(fx.manager.channel(old).is_none());
        assert_eq!(fx.manager.fades().len(), 1);
        fx.tick(1.5);
        assert!(close(fx.volume_of(new), 1.0));
        assert!(fx.channel(new).is_playing());
    }

    #[test]
    fn test_clip_fade_reaches_every_group() {
        let mut fx = Fixture::new(&config());
        let a = fx.play("music", "rain", PlayParams::new());
        let b = fx.play("ui", "rain", PlayParams::new().volume(0.5));
        let other = fx.play("ui", "click", PlayParams::new());

        fx.manager
            .fade_clip(
                &ClipId::new("rain"),
                0.0,
                FadeSpec::new(1.0).on_complete(OnComplete::Stop),
            )
            .unwrap();
        fx.tick(0.5);
        assert!(close(fx.volume_of(a), 0.5));
        assert!(close(fx.volume_of(b), 0.25));

        fx.tick(0.5);
        assert!(!fx.channel(a).is_active());
        assert!(!fx.channel(b).is_active());
        assert!(fx.channel(other).is_playing());
    }

    #[test]
    fn test_scaled_fade_follows_time_scale() {
        let mut fx = Fixture::new(&config());
        fx.clock.set_time_scale(0.0);

        fx.manager.fade_global(0.0, FadeSpec::new(1.0)).unwrap();
        fx.tick(2.0);
        assert!(close(fx.manager.global_volume(), 1.0));

        fx.manager
            .fade_global(0.0, FadeSpec::new(1.0).clock(ClockMode::Unscaled))
            .unwrap();
        fx.tick(1.0);
        assert!(close(fx.manager.global_volume(), 0.0));
    }

    #[test]
    fn test_group_source_fade_skips_recycled_channels() {
        let mut fx = Fixture::new(&config());
        let a = fx.play("fx", "a", PlayParams::new());
        fx.clock.advance(0.1);
        let b = fx.play("fx", "b", PlayParams::new());

        fx.manager
            .group_mut("fx")
            .unwrap()
            .fade_sources_to(0.0, FadeSpec::new(1.0));
        let c = fx.play("fx", "c", PlayParams::new());
        assert_eq!(c.slot(), a.slot());

        fx.tick(0.5);
        assert_eq!(fx.volume_of(c), 1.0);
        assert!(close(fx.volume_of(b), 0.5));
    }

    #[test]
    fn test_natural_completion() {
        let mut fx = Fixture::new(&config());
        let handle = fx.play("ui", "click", PlayParams::new());
        fx.manager.events();

        fx.backend.probe("ui", handle.slot()).unwrap().finish();
        fx.manager.update();

        assert_eq!(
            fx.manager.events(),
            vec![EngineEvent::ChannelFinished {
                group: "ui".to_string(),
                handle,
            }]
        );
        assert!(fx.channel(handle).is_free());
        let next = fx.play("ui", "click", PlayParams::new());
        assert_eq!(next.slot(), handle.slot());
    }

    #[test]
    fn test_apply_clip_scope() {
        let mut fx = Fixture::new(&config());
        let a = fx.play("music", "wind", PlayParams::new());
        let b = fx.play("ui", "wind", PlayParams::new());
        let c = fx.play("ui", "click", PlayParams::new());
        let wind = ClipId::new("wind");

        fx.manager
            .apply(GroupOperation::SetVolume(0.3), Scope::Clip(&wind))
            .unwrap();
        assert!(close(fx.volume_of(a), 0.3));
        assert!(close(fx.volume_of(b), 0.3));
        assert_eq!(fx.volume_of(c), 1.0);
        assert_eq!(fx.manager.group("ui").unwrap().volume(), 1.0);

        fx.manager.pause_clip(&wind).unwrap();
        assert!(fx.channel(a).is_paused());
        assert!(fx.channel(c).is_playing());
        assert_eq!(
            fx.backend.probe("music", a.slot()).unwrap().transport(),
            VoiceTransport::Paused
        );

        fx.manager.resume().unwrap();
        assert!(fx.channel(b).is_playing());
    }

    #[test]
    fn test_play_descriptor_defaults_to_global_group() {
        let mut fx = Fixture::new(&config());
        let descriptor = ClipDescriptor::new("ambience").with_volume(0.4);
        let handle = fx
            .manager
            .play_descriptor(&descriptor, PlayOverrides::default())
            .unwrap()
            .unwrap();
        assert_eq!(handle.key().group, 0);
        assert!(close(fx.volume_of(handle), 0.4));

        let overridden = fx
            .manager
            .play_descriptor(
                &descriptor.clone().in_group("music"),
                PlayOverrides {
                    volume: Some(0.9),
                    ..PlayOverrides::default()
                },
            )
            .unwrap()
            .unwrap();
        assert!(close(fx.volume_of(overridden), 0.9));
    }

    #[test]
    fn test_play_variant_never_repeats() {
        let mut fx = Fixture::new(&config());
        let mut variants: ClipVariants = ["step_a", "step_b", "step_c"]
            .into_iter()
            .map(|clip| ClipDescriptor::new(clip).in_group("fx"))
            .collect();

        let mut previous: Option<ClipId> = None;
        for _ in 0..50 {
            let handle = fx
                .manager
                .play_variant(&mut variants, PlayOverrides::default())
                .unwrap()
                .unwrap();
            let clip = fx.channel(handle).bound_clip().cloned();
            assert_ne!(clip, previous);
            previous = clip;
            fx.clock.advance(0.01);
        }

        let mut empty = ClipVariants::default();
        assert!(matches!(
            fx.manager.play_variant(&mut empty, PlayOverrides::default()),
            Err(Error::EmptyVariantSet)
        ));
    }

    #[test]
    fn test_lifecycle() {
        let backend = SilentBackend::new();
        let mut manager = AudioManager::new(backend.clone(), ManualClock::new());
        assert!(matches!(
            manager.play("music", "theme", PlayParams::new()),
            Err(Error::NotInitialized)
        ));

        manager.initialize(&config()).unwrap();
        let groups = manager.groups().len();
        manager
            .initialize(&ManagerConfig::new().with_group(GroupConfig::new("other")))
            .unwrap();
        assert_eq!(manager.groups().len(), groups);
        assert!(matches!(manager.group("other"), Err(Error::UnknownGroup(_))));

        let handle = manager
            .play("music", "theme", PlayParams::new())
            .unwrap()
            .unwrap();
        manager.dispose();
        assert_eq!(manager.state(), ManagerState::Disposed);
        assert!(manager.channel(handle).is_none());
        assert_eq!(
            backend.probe("music", handle.slot()).unwrap().transport(),
            VoiceTransport::Stopped
        );
        assert!(matches!(manager.initialize(&config()), Err(Error::Disposed)));
        assert!(matches!(manager.set_global_volume(0.5), Err(Error::Disposed)));
        manager.update();
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut manager = AudioManager::new(SilentBackend::new(), ManualClock::new());
        let config = ManagerConfig::new()
            .with_group(GroupConfig::new("fx"))
            .with_group(GroupConfig::new("fx"));
        assert!(matches!(manager.initialize(&config), Err(Error::DuplicateGroup(_))));
        assert_eq!(manager.state(), ManagerState::Uninitialized);
    }

    #[test]
    fn test_snapshot() {
        let mut fx = Fixture::new(&config());
        fx.manager.play("music", "theme", PlayParams::new()).unwrap();
        fx.manager.fade_global(0.5, FadeSpec::new(1.0)).unwrap();

        let snapshot = fx.manager.snapshot();
        assert_eq!(snapshot.state, ManagerState::Initialized);
        assert_eq!(snapshot.active_fades, 1);
        assert_eq!(snapshot.groups.len(), 4);
        assert_eq!(snapshot.groups[0].id, GLOBAL_GROUP_ID);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "initialized");
        assert_eq!(json["groups"][1]["id"], "music");
    }

    proptest! {
        #[test]
        fn prop_effective_volume_is_cascade_product(
            unmodified in 0.0f32..=1.0,
            group in 0.0f32..=1.0,
            global in 0.0f32..=1.0,
        ) {
            let mut fx = Fixture::new(
                &ManagerConfig::new()
                    .with_group(GroupConfig::new("fx").volume(group)),
            );
            fx.manager.set_global_volume(global).unwrap();
            let handle = fx.play("fx", "shot", PlayParams::new().volume(unmodified));
            let effective = fx.channel(handle).effective_volume();
            prop_assert!((effective - unmodified * group * global).abs() < 1e-6);
        }
    }
}
