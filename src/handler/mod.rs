//! Request handler module
//!
//! Per-connection request handling and file content resolution.

pub mod content;
pub mod worker;

// Re-export main entry point
pub use worker::{serve, ServeContext};
