//! Events emitted by the audio manager for observers such as editors and
//! debug overlays.

use voxpool_core::ClipId;

use crate::channel::ChannelHandle;
use crate::fade::{FadeId, FadeTarget};

/// Events emitted by the audio manager.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A channel started playing a clip.
    ChannelStarted {
        group: String,
        handle: ChannelHandle,
        clip: ClipId,
    },
    /// A full pool culled its oldest channel to play a clip.
    ChannelRecycled {
        group: String,
        handle: ChannelHandle,
        clip: ClipId,
    },
    /// A full pool without recycling refused a play request.
    PlayRefused { group: String, clip: ClipId },
    /// A one-shot clip played to its end.
    ChannelFinished {
        group: String,
        handle: ChannelHandle,
    },
    /// A fade reached its end value and ran its completion behaviour.
    FadeCompleted { id: FadeId, target: FadeTarget },
    /// The global volume was set explicitly.
    GlobalVolumeChanged(f32),
    /// A group volume was set explicitly.
    GroupVolumeChanged { group: String, volume: f32 },
}
