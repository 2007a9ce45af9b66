//! Host collaborator trait interfaces for wardend
//!
//! This crate defines the capability-based interface between the engine and
//! the platform it runs on: foreground detection, suppression primitives,
//! overlays and notifications. It contains no platform code itself.
//!
//! Every capability here is best-effort by contract. The detector may return
//! stale or empty results, suppression may silently fail, overlays may be
//! refused because an equivalent surface is already up. The engine is built
//! around those failure modes rather than on top of guarantees.

mod mock;
mod surface;
mod traits;

pub use mock::*;
pub use surface::*;
pub use traits::*;
