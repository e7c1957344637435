//! Volume change notification bus.
//!
//! Channels subscribe when their group creates them. A global volume change
//! notifies every subscriber; a group volume change notifies only that
//! group's channels. Publishing yields the subscribers to recompute, the
//! manager then pushes the new effective volume to each of them.

use crate::channel::ChannelKey;

/// Volume changes carried by the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeEvent {
    GlobalVolumeChanged,
    /// Index of the group whose volume changed.
    GroupVolumeChanged(usize),
}

impl VolumeEvent {
    const fn concerns(self, key: ChannelKey) -> bool {
        match self {
            Self::GlobalVolumeChanged => true,
            Self::GroupVolumeChanged(group) => key.group == group,
        }
    }
}

/// Observer list of live channels.
#[derive(Debug, Default)]
pub struct VolumeBus {
    subscribers: Vec<ChannelKey>,
}

impl VolumeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&mut self, key: ChannelKey) {
        if !self.subscribers.contains(&key) {
            self.subscribers.push(key);
        }
    }

    /// Drop every subscription belonging to `group`.
    pub(crate) fn unsubscribe_group(&mut self, group: usize) {
        self.subscribers.retain(|k| k.group != group);
    }

    /// Subscribers that must recompute for `event`.
    pub fn publish(&self, event: VolumeEvent) -> impl Iterator<Item = ChannelKey> + '_ {
        self.subscribers
            .iter()
            .copied()
            .filter(move |key| event.concerns(*key))
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
