//! Per-connection request handling
//!
//! Drives one connection through its three phases: read the request line,
//! resolve content, write the response. Exactly one request is served and the
//! stream is shut down afterwards, whether or not a phase failed.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::config::HttpConfig;
use crate::handler::content::ContentResolver;
use crate::http::{self, RequestParseError, ResponseStatus};
use crate::logger;

/// Everything a connection needs, shared read-only between tasks
#[derive(Debug, Clone)]
pub struct ServeContext {
    pub resolver: ContentResolver,
    pub server_name: String,
    pub content_type: String,
    pub read_deadline: Option<Duration>,
    pub max_request_line: usize,
}

impl ServeContext {
    pub fn from_config(http: &HttpConfig) -> Self {
        Self {
            resolver: ContentResolver::new(&http.document_root, &http.content_server_name),
            server_name: http.server_name.clone(),
            content_type: http.content_type.clone(),
            read_deadline: http.read_deadline(),
            max_request_line: http.max_request_line,
        }
    }
}

/// What happened on one connection, for access logging
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub request_line: Option<String>,
    pub path: Option<String>,
    /// Set once the header has been accepted by the writer
    pub status: Option<ResponseStatus>,
    pub body_bytes: usize,
}

/// Serve one request on `stream`, then shut it down
///
/// Errors are logged here and never returned; the stream is closed on every
/// path.
pub async fn serve<S>(stream: S, ctx: &ServeContext) -> Exchange
where
    S: AsyncRead + AsyncWrite,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);
    let mut exchange = Exchange::default();

    if let Err(e) = respond(&mut reader, &mut writer, ctx, &mut exchange).await {
        logger::log_connection_error(&e);
    }

    // Flushes anything still buffered before closing the write side
    if let Err(e) = writer.shutdown().await {
        logger::log_debug(&format!("Shutdown after response failed: {e}"));
    }

    exchange
}

async fn respond<R, W>(
    reader: &mut R,
    writer: &mut W,
    ctx: &ServeContext,
    exchange: &mut Exchange,
) -> io::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let path = match http::read_request_line(reader, ctx.max_request_line, ctx.read_deadline).await
    {
        Ok(line) => {
            logger::log_request_line(&line.raw);
            exchange.request_line = Some(line.raw);
            exchange.path = Some(line.path.clone());
            Some(line.path)
        }
        Err(e) => {
            log_parse_error(&e);
            if let RequestParseError::MissingPath(raw) = e {
                exchange.request_line = Some(raw);
            }
            None
        }
    };

    let content = ctx.resolver.resolve(path.as_deref()).await;
    let status = ResponseStatus::from(&content);

    http::write_header(writer, status, &ctx.server_name, &ctx.content_type).await?;
    exchange.status = Some(status);
    exchange.body_bytes = http::write_content(writer, content.body()).await?;
    writer.flush().await
}

fn log_parse_error(err: &RequestParseError) {
    match err {
        RequestParseError::Empty => logger::log_debug(&format!("Request error: {err}")),
        _ => logger::log_warning(&format!("Request error: {err}")),
    }
}
