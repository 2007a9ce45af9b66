//! Core budget-enforcement engine for wardend
//!
//! The engine is a synchronous state machine: every mutation goes through
//! `start`/`stop`/`restore`/`tick`/`expire_blocking`, each taking the current
//! time as an argument so tests can drive the clock. The async [`Controller`]
//! wraps it with the polling loops, the progress surface and the enforcement
//! task group that runs while blocking.

mod controller;
mod engine;
mod events;
mod milestones;
mod session;
mod state;

pub use controller::*;
pub use engine::*;
pub use events::*;
pub use milestones::*;
pub use session::*;
pub use state::*;
