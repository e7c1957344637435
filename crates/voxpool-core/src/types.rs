//! Core domain types for voxpool.

pub mod clip;
pub mod config;
pub mod fade;
pub mod variants;

pub use clip::{sanitize_volume, ClipDescriptor, ClipId, PlayOverrides, PlayParams};
pub use config::{GroupConfig, ManagerConfig, GLOBAL_GROUP_ID};
pub use fade::{ClockMode, Ease, FadeRepeat, FadeSpec, OnComplete};
pub use variants::ClipVariants;
