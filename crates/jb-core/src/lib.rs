//! jb-core: Shared types for the Jukebox playback coordinator
//!
//! Clips, categories, fade curves, configuration and the error type used
//! across all Jukebox crates.

mod clip;
mod config;
mod curve;
mod error;
mod types;

pub use clip::*;
pub use config::*;
pub use curve::*;
pub use error::*;
pub use types::*;
