//! Taskgate Core - shared infrastructure
//!
//! Error handling, logging setup and configuration used by every Taskgate crate.

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tracing;
