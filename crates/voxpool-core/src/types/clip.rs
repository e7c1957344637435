//! Clip handles, authored clip descriptors, and per-play overrides.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to a piece of audio the backend knows how to play.
///
/// Two channels play "the same clip" iff their handles compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(String);

impl ClipId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipId {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ClipId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Authored description of what to play and with which defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    /// Target group. `None` plays through the implicit global group.
    #[serde(default)]
    pub group: Option<String>,
    /// Clip to play.
    pub clip: ClipId,
    /// Base volume (0.0 to 1.0).
    #[serde(default = "unit")]
    pub volume: f32,
    /// Playback pitch (1.0 = original).
    #[serde(default = "unit")]
    pub pitch: f32,
    /// Whether the clip loops.
    #[serde(default, rename = "loop")]
    pub looping: bool,
}

/// Clamp a volume into 0.0..=1.0, mapping NaN and infinities to silence.
pub fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

const fn unit() -> f32 {
    1.0
}

impl ClipDescriptor {
    pub fn new(clip: impl Into<ClipId>) -> Self {
        Self {
            group: None,
            clip: clip.into(),
            volume: 1.0,
            pitch: 1.0,
            looping: false,
        }
    }

    #[must_use]
    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = sanitize_volume(volume);
        self
    }

    #[must_use]
    pub const fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    #[must_use]
    pub const fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

/// Settings applied to a channel by a single play request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayParams {
    /// Unmodified (pre-cascade) volume, 0.0 to 1.0.
    pub volume: f32,
    pub pitch: f32,
    pub looping: bool,
    /// Keep the channel reserved after it stops until explicitly unlocked.
    pub lock: bool,
}

impl Default for PlayParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            lock: false,
        }
    }
}

impl PlayParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = sanitize_volume(volume);
        self
    }

    #[must_use]
    pub const fn pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    #[must_use]
    pub const fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    #[must_use]
    pub const fn locked(mut self, lock: bool) -> Self {
        self.lock = lock;
        self
    }
}

impl From<&ClipDescriptor> for PlayParams {
    fn from(descriptor: &ClipDescriptor) -> Self {
        Self {
            volume: sanitize_volume(descriptor.volume),
            pitch: descriptor.pitch,
            looping: descriptor.looping,
            lock: false,
        }
    }
}

/// Optional overrides layered on top of a descriptor's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayOverrides {
    pub volume: Option<f32>,
    pub pitch: Option<f32>,
    pub looping: Option<bool>,
    pub lock: Option<bool>,
}

impl PlayOverrides {
    /// Resolve the final play parameters for `descriptor`.
    pub fn apply(&self, descriptor: &ClipDescriptor) -> PlayParams {
        let base = PlayParams::from(descriptor);
        PlayParams {
            volume: self.volume.map_or(base.volume, sanitize_volume),
            pitch: self.pitch.unwrap_or(base.pitch),
            looping: self.looping.unwrap_or(base.looping),
            lock: self.lock.unwrap_or(base.lock),
        }
    }
}
