//! # voxpool-core
//!
//! Core types, configuration, and error handling for the voxpool audio
//! channel manager.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
