// Connection handling module
// Accepts a single TCP connection and serves it in its own task

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::handler::{self, ServeContext};
use crate::http::ResponseStatus;
use crate::logger::{self, AccessLogEntry};

/// Settings shared by every accepted connection
#[derive(Debug)]
pub struct ConnectionSettings {
    pub serve: ServeContext,
    pub max_connections: Option<u64>,
    pub access_log: bool,
    pub access_log_format: String,
}

/// Accept a connection, checking limits, and serve it in a spawned task.
///
/// A connection over the limit is dropped (closed) without a response.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `settings` - Shared connection settings
/// * `conn_counter` - Active connection counter
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    settings: &Arc<ConnectionSettings>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = settings.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(settings),
        Arc::clone(conn_counter),
    );
}

/// Serve a single connection in a spawned task, then write its access log
/// line and release its slot in the counter.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    settings: Arc<ConnectionSettings>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let started = Instant::now();
        let mut entry = AccessLogEntry::new(peer_addr.to_string());

        let exchange = handler::serve(stream, &settings.serve).await;

        if settings.access_log {
            entry.request_line = exchange.request_line;
            entry.path = exchange.path;
            entry.status = exchange.status.map_or(0, ResponseStatus::code);
            entry.body_bytes = exchange.body_bytes;
            entry.request_time_us =
                u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            logger::log_access(&entry, &settings.access_log_format);
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
