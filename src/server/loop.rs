// Server loop module
// Accepts connections until shutdown is requested

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::{accept_connection, ConnectionSettings};
use crate::logger;

/// Configuration for server loop behavior
pub struct ServerLoopConfig {
    pub settings: Arc<ConnectionSettings>,
    pub shutdown: Arc<Notify>,
}

/// Accept connections and hand each one to its own task.
///
/// Returns once `shutdown` is notified. The listener is closed on return;
/// connections already accepted keep running in their own tasks, so callers
/// that tear down the runtime should [`drain_connections`] first.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    active_connections: Arc<AtomicUsize>,
    config: ServerLoopConfig,
) -> std::io::Result<()> {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &config.settings,
                            &active_connections,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = config.shutdown.notified() => {
                logger::log_server_stop(active_connections.load(Ordering::SeqCst));
                return Ok(());
            }
        }
    }
}

/// Interval between checks of the active connection counter while draining
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Wait for in-flight connections to finish, at most `grace`.
///
/// Returns how many connections were still active when waiting stopped.
pub async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + grace;

    loop {
        let remaining = active_connections.load(Ordering::SeqCst);
        if remaining == 0 {
            return 0;
        }
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return remaining;
        }
        tokio::time::sleep(DRAIN_POLL.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::handler::ServeContext;
    use crate::server::create_reusable_listener;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn settings(root: &std::path::Path, max_connections: Option<u64>) -> Arc<ConnectionSettings> {
        let http = HttpConfig {
            document_root: root.to_string_lossy().into_owned(),
            ..HttpConfig::default()
        };
        Arc::new(ConnectionSettings {
            serve: ServeContext::from_config(&http),
            max_connections,
            access_log: false,
            access_log_format: "common".to_string(),
        })
    }

    async fn fetch(addr: std::net::SocketAddr, request: &[u8]) -> String {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(request).await.unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>cs371server></p>\n").unwrap();

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let active = Arc::new(AtomicUsize::new(0));

        let server = tokio::spawn(start_server_loop(
            listener,
            Arc::clone(&active),
            ServerLoopConfig {
                settings: settings(dir.path(), None),
                shutdown: Arc::clone(&shutdown),
            },
        ));

        // one request per connection, each on its own connection
        let found = fetch(addr, b"GET /index.html HTTP/1.1\r\n").await;
        assert!(found.starts_with("HTTP/1.1 200 OK\n"));
        assert!(found.ends_with("\n\nThe contents are:  Luke's Server\n"));

        let missing = fetch(addr, b"GET /nope.html HTTP/1.1\r\n").await;
        assert!(missing.starts_with("HTTP/1.1 404 Error\n"));
        assert!(missing.ends_with("\n\n404: File not found"));

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("loop stops on shutdown")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejects_over_limit() {
        let dir = tempfile::tempdir().unwrap();
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let active = Arc::new(AtomicUsize::new(0));

        let server = tokio::spawn(start_server_loop(
            listener,
            Arc::clone(&active),
            ServerLoopConfig {
                settings: settings(dir.path(), Some(0)),
                shutdown: Arc::clone(&shutdown),
            },
        ));

        // rejected connections are closed without a response
        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());
        assert_eq!(active.load(Ordering::SeqCst), 0);

        shutdown.notify_one();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_accepted_connection_survives_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.html"), "still here\n").unwrap();

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let active = Arc::new(AtomicUsize::new(0));

        // run the loop and the drain in order, the way the binary does
        let server = {
            let active = Arc::clone(&active);
            let config = ServerLoopConfig {
                settings: settings(dir.path(), None),
                shutdown: Arc::clone(&shutdown),
            };
            tokio::spawn(async move {
                start_server_loop(listener, Arc::clone(&active), config).await?;
                Ok::<_, std::io::Error>(drain_connections(&active, Duration::from_secs(5)).await)
            })
        };

        let mut client = TcpStream::connect(addr).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while active.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("connection accepted");

        shutdown.notify_one();
        client.write_all(b"GET /a.html HTTP/1.1\r\n").await.unwrap();
        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK\n"));
        assert!(response.ends_with("\n\nThe contents are:  still here\n"));

        let remaining = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("drain finishes")
            .unwrap()
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_drain_gives_up_at_deadline() {
        let active = AtomicUsize::new(2);
        let remaining = drain_connections(&active, Duration::from_millis(30)).await;
        assert_eq!(remaining, 2);
    }

    #[tokio::test]
    async fn test_drain_returns_when_idle() {
        let active = Arc::new(AtomicUsize::new(1));
        let release = {
            let active = Arc::clone(&active);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            })
        };
        let remaining = drain_connections(&active, Duration::from_secs(5)).await;
        assert_eq!(remaining, 0);
        release.await.unwrap();
    }
}
