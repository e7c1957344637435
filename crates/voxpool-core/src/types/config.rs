//! Manager and group configuration consumed at initialization.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ClockMode, Ease, OnComplete};
use crate::{Error, Result};

/// Identifier reserved for the implicit group serving ungrouped playback.
pub const GLOBAL_GROUP_ID: &str = "global";

/// Configuration of a single channel group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Unique group identifier.
    pub id: String,
    /// Maximum number of channels, negative for unbounded.
    #[serde(default = "unbounded")]
    pub capacity: i32,
    /// Cull the oldest channel instead of refusing when the pool is full.
    #[serde(default)]
    pub recycle: bool,
    /// Channels created up front at initialization.
    #[serde(default)]
    pub preallocate: usize,
    /// Initial group volume (0.0 to 1.0).
    #[serde(default = "full_volume")]
    pub volume: f32,
    /// Applied to the channels faded out by a crossfade.
    #[serde(default = "stop_on_complete")]
    pub crossfade_complete: OnComplete,
}

const fn unbounded() -> i32 {
    -1
}

const fn full_volume() -> f32 {
    1.0
}

const fn stop_on_complete() -> OnComplete {
    OnComplete::Stop
}

impl GroupConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capacity: unbounded(),
            recycle: false,
            preallocate: 0,
            volume: full_volume(),
            crossfade_complete: stop_on_complete(),
        }
    }

    #[must_use]
    pub const fn capacity(mut self, capacity: i32) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub const fn recycle(mut self, recycle: bool) -> Self {
        self.recycle = recycle;
        self
    }

    #[must_use]
    pub const fn preallocate(mut self, count: usize) -> Self {
        self.preallocate = count;
        self
    }

    #[must_use]
    pub const fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    #[must_use]
    pub const fn crossfade_complete(mut self, behaviour: OnComplete) -> Self {
        self.crossfade_complete = behaviour;
        self
    }

    /// Channel limit, `None` when unbounded.
    pub fn capacity_limit(&self) -> Option<usize> {
        usize::try_from(self.capacity).ok()
    }

    /// Channels to create at initialization, never more than the capacity.
    pub fn preallocate_count(&self) -> usize {
        self.capacity_limit()
            .map_or(self.preallocate, |limit| self.preallocate.min(limit))
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidConfig("group id must not be empty".into()));
        }
        if self.id == GLOBAL_GROUP_ID {
            return Err(Error::ReservedGroupId(self.id.clone()));
        }
        validate_volume(&format!("group '{}' volume", self.id), self.volume)
    }
}

/// Manager-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Initial global volume (0.0 to 1.0).
    #[serde(default = "full_volume")]
    pub global_volume: f32,
    /// Ease used when a fade does not pick one.
    #[serde(default)]
    pub default_ease: Ease,
    /// Clock used when a fade does not pick one.
    #[serde(default)]
    pub default_clock: ClockMode,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            global_volume: full_volume(),
            default_ease: Ease::default(),
            default_clock: ClockMode::default(),
            groups: Vec::new(),
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_group(mut self, group: GroupConfig) -> Self {
        self.groups.push(group);
        self
    }

    #[must_use]
    pub const fn global_volume(mut self, volume: f32) -> Self {
        self.global_volume = volume;
        self
    }

    #[must_use]
    pub const fn default_ease(mut self, ease: Ease) -> Self {
        self.default_ease = ease;
        self
    }

    #[must_use]
    pub const fn default_clock(mut self, clock: ClockMode) -> Self {
        self.default_clock = clock;
        self
    }

    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check the whole configuration, failing on the first problem.
    pub fn validate(&self) -> Result<()> {
        validate_volume("global volume", self.global_volume)?;

        let mut seen = HashSet::with_capacity(self.groups.len());
        for group in &self.groups {
            group.validate()?;
            if !seen.insert(group.id.as_str()) {
                return Err(Error::DuplicateGroup(group.id.clone()));
            }
        }
        Ok(())
    }
}

fn validate_volume(what: &str, volume: f32) -> Result<()> {
    if (0.0..=1.0).contains(&volume) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{what} must be within 0.0..=1.0, got {volume}"
        )))
    }
}
