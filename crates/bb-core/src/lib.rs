//! Core types for the blitbridge runtime
//!
//! This crate provides the error types, configuration and logging
//! infrastructure shared by the loader, link, overlay and integration crates.

pub mod config;
pub mod error;
pub mod logging;

pub use config::Config;
pub use error::{BridgeError, Result};
