//! Integration layer for blitbridge
//!
//! Ties the loader, link and overlay together into a session that drives a
//! payload's init/tick/render hooks from one tick loop.

pub mod lifecycle;
pub mod loader;
pub mod runner;

pub use lifecycle::{Cartridge, HookBinder, HostApi, LifecycleInvoker, SessionState};
pub use loader::{GameLoader, LoadedCartridge};
pub use runner::{Runtime, TickOutcome};
