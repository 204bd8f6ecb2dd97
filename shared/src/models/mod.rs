//! Data models
//!
//! Shared between the device layer, the engine and the CLI output.

pub mod job;
pub mod notice;
pub mod outcome;

// Re-exports
pub use job::*;
pub use notice::*;
pub use outcome::*;
