//! HTTP request handlers for the Taskgate web server
//!
//! Handlers assume their gate has already run; none of them re-check roles or
//! permissions.

pub mod admin;
pub mod health;
pub mod home;
pub mod tasks;

pub use admin::*;
pub use health::*;
pub use home::*;
pub use tasks::*;
