//! # voxpool-engine
//!
//! Runtime audio channel management for voxpool.
//!
//! Features:
//! - Per-group channel pools with reuse, growth, and oldest-first recycling
//! - Global, group and source volume cascade pushed through a notification bus
//! - Fades and crossfades on scaled or unscaled clocks
//! - Pluggable output through the [`Backend`] and [`Voice`] traits

pub mod backend;
pub mod bus;
pub mod channel;
pub mod clock;
pub mod events;
pub mod fade;
pub mod group;
pub mod manager;

pub use backend::{Backend, SilentBackend, Voice, VoiceProbe, VoiceTransport};
pub use channel::{Channel, ChannelHandle, ChannelKey, ChannelState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::EngineEvent;
pub use fade::{FadeId, FadeTarget};
pub use group::{Acquisition, ChannelSnapshot, Group, GroupSnapshot};
pub use manager::{
    AudioManager, ChannelMut, GroupMut, GroupOperation, ManagerSnapshot, ManagerState, Scope,
    EVENT_CAPACITY,
};
