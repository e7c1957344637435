//! Playback backend abstraction.
//!
//! The manager never decodes or mixes audio. It drives voices created by a
//! [`Backend`], one voice per channel for the channel's whole lifetime.

use std::sync::Arc;

use parking_lot::Mutex;
use voxpool_core::ClipId;

/// A physical playback unit owned by exactly one channel.
pub trait Voice: Send {
    /// Start `clip` from the beginning, replacing whatever was playing.
    fn start(&mut self, clip: &ClipId, pitch: f32, looping: bool);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    /// Apply the effective (post-cascade) output volume.
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    /// True once a non-looping clip has played to its end.
    fn is_finished(&self) -> bool;
}

/// Factory for voices.
pub trait Backend: Send {
    fn create_voice(&mut self, group: &str, slot: usize) -> Box<dyn Voice>;
}

/// Transport state of a silent voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceTransport {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Default)]
struct SilentVoiceState {
    clip: Option<ClipId>,
    transport: VoiceTransport,
    volume: f32,
    pitch: f32,
    looping: bool,
    finished: bool,
    starts: usize,
}

/// Voice that produces no output and only records what it was told.
struct SilentVoice {
    state: Arc<Mutex<SilentVoiceState>>,
}

impl Voice for SilentVoice {
    fn start(&mut self, clip: &ClipId, pitch: f32, looping: bool) {
        let mut state = self.state.lock();
        state.clip = Some(clip.clone());
        state.transport = VoiceTransport::Playing;
        state.pitch = pitch;
        state.looping = looping;
        state.finished = false;
        state.starts += 1;
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.transport = VoiceTransport::Stopped;
        state.finished = false;
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        if state.transport == VoiceTransport::Playing {
            state.transport = VoiceTransport::Paused;
        }
    }

    fn resume(&mut self) {
        let mut state = self.state.lock();
        if state.transport == VoiceTransport::Paused {
            state.transport = VoiceTransport::Playing;
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().volume = volume;
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn is_finished(&self) -> bool {
        self.state.lock().finished
    }
}

/// Read/write window onto a silent voice, for tests and headless tools.
#[derive(Clone)]
pub struct VoiceProbe {
    group: String,
    slot: usize,
    state: Arc<Mutex<SilentVoiceState>>,
}

impl VoiceProbe {
    pub fn group(&self) -> &str {
        &self.group
    }

    pub const fn slot(&self) -> usize {
        self.slot
    }

    pub fn clip(&self) -> Option<ClipId> {
        self.state.lock().clip.clone()
    }

    pub fn transport(&self) -> VoiceTransport {
        self.state.lock().transport
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    pub fn pitch(&self) -> f32 {
        self.state.lock().pitch
    }

    pub fn is_looping(&self) -> bool {
        self.state.lock().looping
    }

    /// Number of times the voice has been started.
    pub fn starts(&self) -> usize {
        self.state.lock().starts
    }

    /// Simulate the clip reaching its end.
    pub fn finish(&self) {
        let mut state = self.state.lock();
        if state.transport == VoiceTransport::Playing && !state.looping {
            state.transport = VoiceTransport::Stopped;
            state.finished = true;
        }
    }
}

/// Backend whose voices make no sound.
///
/// Clones share the same probe registry, so a test can keep one clone and
/// hand the other to the manager.
#[derive(Clone, Default)]
pub struct SilentBackend {
    probes: Arc<Mutex<Vec<VoiceProbe>>>,
}

impl SilentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// All voices created so far, in creation order.
    pub fn probes(&self) -> Vec<VoiceProbe> {
        self.probes.lock().clone()
    }

    pub fn probe(&self, group: &str, slot: usize) -> Option<VoiceProbe> {
        self.probes
            .lock()
            .iter()
            .find(|p| p.group == group && p.slot == slot)
            .cloned()
    }

    pub fn voice_count(&self) -> usize {
        self.probes.lock().len()
    }
}

impl Backend for SilentBackend {
    fn create_voice(&mut self, group: &str, slot: usize) -> Box<dyn Voice> {
        let state = Arc::new(Mutex::new(SilentVoiceState {
            pitch: 1.0,
            ..SilentVoiceState::default()
        }));
        self.probes.lock().push(VoiceProbe {
            group: group.to_string(),
            slot,
            state: state.clone(),
        });
        Box::new(SilentVoice { state })
    }
}
