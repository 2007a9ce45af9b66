//! Command-based host adapter
//!
//! Implements the [`Host`](warden_host_api::Host) trait by shelling out to
//! commands wired up in the
//! `[host]` section of the daemon config. This keeps the engine portable:
//! the platform-specific parts (how to read the foreground app, how to push
//! it to the background, how to draw an overlay) live in small external
//! helpers instead of this process.

mod exec;

pub use exec::*;
