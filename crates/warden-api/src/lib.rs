//! Contract types for the wardend engine
//!
//! This crate defines the stable surface between the engine and whatever
//! hosts it (a UI shell, a service wrapper):
//! - Status snapshots (read-only engine state)
//! - Events (engine -> host push stream)
//! - Versioning

mod events;
mod types;

pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
