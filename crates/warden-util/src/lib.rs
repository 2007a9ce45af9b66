//! Shared utilities for wardend
//!
//! This crate provides:
//! - ID types (TargetId, SessionId)
//! - Time utilities (wall-clock source, duration formatting)
//! - Error types
//! - Default paths for config and data directories

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
