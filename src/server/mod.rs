// Server module entry point
// Provides listener setup, the accept loop, connection spawning and signals

pub mod connection;
pub mod listener;
pub mod signal;

// Rust does not allow `loop` as a module name (keyword), so it is mounted as server_loop
#[path = "loop.rs"]
pub mod server_loop;

// Re-export commonly used types
pub use connection::ConnectionSettings;
pub use listener::create_reusable_listener;
pub use server_loop::{drain_connections, start_server_loop, ServerLoopConfig};
pub use signal::{start_signal_handler, SignalHandler};
