// This module re-exports important pieces for convenience,
// so we can "use crate::config::*" easily.
pub mod client;
pub mod config;
pub mod logging;
pub mod store;

pub use client::*;
pub use config::*;
pub use logging::*;
pub use store::*;
