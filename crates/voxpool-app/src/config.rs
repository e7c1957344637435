//! Configuration discovery for the scene runner.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::{debug, info};
use voxpool_core::{ClockMode, Ease, GroupConfig, ManagerConfig, OnComplete};

const CONFIG_FILE: &str = "voxpool.json";

/// Where the configuration was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    UserConfigDir(PathBuf),
    Builtin,
}

/// Path of the per-user configuration file, if the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "voxpool").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Load the configuration: explicit path, then user config dir, then built-in.
///
/// An explicit path that cannot be read is an error; a missing user file is not.
pub fn resolve(explicit: Option<&Path>) -> Result<(ManagerConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let config = ManagerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    if let Some(path) = user_config_path() {
        if path.is_file() {
            let config = ManagerConfig::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            return Ok((config, ConfigSource::UserConfigDir(path)));
        }
        debug!("No user config at {}", path.display());
    }

    info!("Using built-in configuration");
    Ok((builtin(), ConfigSource::Builtin))
}

/// Groups a typical game scene needs.
pub fn builtin() -> ManagerConfig {
    ManagerConfig::new()
        .default_ease(Ease::QuadInOut)
        .default_clock(ClockMode::Unscaled)
        .with_group(
            GroupConfig::new("music")
                .capacity(2)
                .preallocate(2)
                .volume(0.8)
                .crossfade_complete(OnComplete::Stop),
        )
        .with_group(GroupConfig::new("ambient").capacity(4).volume(0.6))
        .with_group(
            GroupConfig::new("fx")
                .capacity(8)
                .recycle(true)
                .preallocate(4),
        )
        .with_group(GroupConfig::new("ui").capacity(2).recycle(true))
}
