//! Request line parsing
//!
//! Only the first line of a request is read. It is split on single spaces and
//! the second token is taken as the resource path:
//!
//! ```text
//! GET /test.html HTTP/1.1\r\n
//! ```
//!
//! Headers and body are never read.

use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Why no resource path could be taken from the connection
#[derive(Debug)]
pub enum RequestParseError {
    /// Peer closed the connection before sending anything
    Empty,
    /// No line terminator within the configured limit
    TooLong(usize),
    /// Line is not valid UTF-8
    InvalidUtf8,
    /// Line has no second space-delimited token
    MissingPath(String),
    /// Nothing arrived before the read deadline
    Timeout(Duration),
    Io(io::Error),
}

impl fmt::Display for RequestParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "connection closed before a request line was sent"),
            Self::TooLong(limit) => write!(f, "request line exceeds {limit} bytes"),
            Self::InvalidUtf8 => write!(f, "request line is not valid UTF-8"),
            Self::MissingPath(line) => write!(f, "no resource path in request line ({line})"),
            Self::Timeout(after) => {
                write!(f, "no request line after {}s", after.as_secs_f64())
            }
            Self::Io(e) => write!(f, "failed to read request line: {e}"),
        }
    }
}

impl std::error::Error for RequestParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RequestParseError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// A request line and the resource path taken from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// The line without its terminator
    pub raw: String,
    pub path: String,
}

/// Take the resource path (second token) from a request line
///
/// # Examples
/// ```ignore
/// assert_eq!(parse_path("GET /index.html HTTP/1.1"), Some("/index.html"));
/// assert_eq!(parse_path("GET"), None);
/// ```
pub fn parse_path(line: &str) -> Option<&str> {
    line.split(' ').nth(1).filter(|token| !token.is_empty())
}

/// Read one request line and extract its resource path
///
/// Waits for the line with an ordinary async read, bounded by `deadline`
/// when one is given.
pub async fn read_request_line<R>(
    reader: &mut R,
    max_len: usize,
    deadline: Option<Duration>,
) -> Result<RequestLine, RequestParseError>
where
    R: AsyncBufRead + Unpin,
{
    let raw = match deadline {
        Some(after) => tokio::time::timeout(after, read_line_limited(reader, max_len))
            .await
            .map_err(|_| RequestParseError::Timeout(after))??,
        None => read_line_limited(reader, max_len).await?,
    };

    match parse_path(&raw) {
        Some(path) => Ok(RequestLine {
            path: path.to_string(),
            raw,
        }),
        None => Err(RequestParseError::MissingPath(raw)),
    }
}

/// Read bytes up to the first `\n` or `\r`, at most `max_len` of them
///
/// The terminator is consumed; a `\n` following a `\r` is left unread since
/// nothing after the request line is read.
async fn read_line_limited<R>(reader: &mut R, max_len: usize) -> Result<String, RequestParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut received = false;

    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            break;
        }
        received = true;

        let window = &chunk[..chunk.len().min(max_len - buf.len())];
        if let Some(end) = window.iter().position(|&b| b == b'\n' || b == b'\r') {
            buf.extend_from_slice(&window[..end]);
            reader.consume(end + 1);
            return String::from_utf8(buf).map_err(|_| RequestParseError::InvalidUtf8);
        }

        let taken = window.len();
        buf.extend_from_slice(window);
        reader.consume(taken);
        if buf.len() >= max_len {
            return Err(RequestParseError::TooLong(max_len));
        }
    }

    if !received {
        return Err(RequestParseError::Empty);
    }
    // A final line without terminator before EOF is still a line
    String::from_utf8(buf).map_err(|_| RequestParseError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, BufReader};

    const LIMIT: usize = 8192;

    #[test]
    fn test_parse_path_common_methods() {
        for method in ["GET", "HEAD", "POST", "DELETE"] {
            let line = format!("{method} /path HTTP/1.1");
            assert_eq!(parse_path(&line), Some("/path"));
        }
    }

    #[test]
    fn test_parse_path_keeps_query_verbatim() {
        assert_eq!(parse_path("GET /a.html?x=1 HTTP/1.1"), Some("/a.html?x=1"));
    }

    #[test]
    fn test_parse_path_missing_token() {
        assert_eq!(parse_path("GET"), None);
        assert_eq!(parse_path(""), None);
        assert_eq!(parse_path("GET "), None);
        // double space yields an empty second token
        assert_eq!(parse_path("GET  /x HTTP/1.1"), None);
    }

    #[tokio::test]
    async fn test_read_first_line_only() {
        let mut input: &[u8] = b"GET /test.html HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let line = read_request_line(&mut input, LIMIT, None).await.unwrap();
        assert_eq!(line.path, "/test.html");
        assert_eq!(line.raw, "GET /test.html HTTP/1.1");
        // the reader stops right after the `\r`
        assert_eq!(input, b"\nHost: localhost\r\n\r\n");
    }

    #[tokio::test]
    async fn test_read_bare_carriage_return() {
        let mut input: &[u8] = b"GET /cr.html HTTP/1.1\rHost: localhost\r";
        let line = read_request_line(&mut input, LIMIT, None).await.unwrap();
        assert_eq!(line.raw, "GET /cr.html HTTP/1.1");
        assert_eq!(line.path, "/cr.html");
    }

    #[tokio::test]
    async fn test_read_carriage_return_without_newline_does_not_wait() {
        // peer sends a `\r`-terminated line and keeps the connection open
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(b"GET /now.html HTTP/1.1\r").await.unwrap();
        let mut reader = BufReader::new(server);
        let line = read_request_line(&mut reader, LIMIT, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(line.path, "/now.html");
        drop(client);
    }

    #[tokio::test]
    async fn test_read_bare_newline_and_unterminated() {
        let mut input: &[u8] = b"GET /a HTTP/1.1\n";
        let line = read_request_line(&mut input, LIMIT, None).await.unwrap();
        assert_eq!(line.raw, "GET /a HTTP/1.1");

        let mut input: &[u8] = b"GET /b HTTP/1.1";
        let line = read_request_line(&mut input, LIMIT, None).await.unwrap();
        assert_eq!(line.path, "/b");
    }

    #[tokio::test]
    async fn test_read_malformed_line() {
        let mut input: &[u8] = b"GARBAGE\r\n";
        let err = read_request_line(&mut input, LIMIT, None).await.unwrap_err();
        assert!(matches!(err, RequestParseError::MissingPath(ref raw) if raw == "GARBAGE"));
    }

    #[tokio::test]
    async fn test_read_empty_connection() {
        let mut input: &[u8] = b"";
        let err = read_request_line(&mut input, LIMIT, None).await.unwrap_err();
        assert!(matches!(err, RequestParseError::Empty));
    }

    #[tokio::test]
    async fn test_read_too_long() {
        let mut input: &[u8] = b"GET /very/long/path HTTP/1.1\r\n";
        let err = read_request_line(&mut input, 8, None).await.unwrap_err();
        assert!(matches!(err, RequestParseError::TooLong(8)));
    }

    #[tokio::test]
    async fn test_read_invalid_utf8() {
        let mut input: &[u8] = b"GET /\xff\xfe HTTP/1.1\r\n";
        let err = read_request_line(&mut input, LIMIT, None).await.unwrap_err();
        assert!(matches!(err, RequestParseError::InvalidUtf8));
    }

    #[tokio::test]
    async fn test_read_times_out() {
        // client end stays open but silent
        let (_client, server) = tokio::io::duplex(64);
        let mut reader = BufReader::new(server);
        let deadline = Duration::from_millis(20);
        let err = read_request_line(&mut reader, LIMIT, Some(deadline))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestParseError::Timeout(d) if d == deadline));
    }

    #[tokio::test]
    async fn test_read_waits_for_late_data() {
        let (mut client, server) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            client.write_all(b"GET /late.html HTTP/1.1\r\n").await.unwrap();
            client
        });
        let mut reader = BufReader::new(server);
        let line = read_request_line(&mut reader, LIMIT, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(line.path, "/late.html");
        drop(writer.await.unwrap());
    }
}
