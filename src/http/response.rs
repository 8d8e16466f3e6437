//! HTTP response writing module
//!
//! Writes the fixed header block and the body straight to the connection.
//! Lines end with a bare `\n`; no `Content-Length` is sent since every
//! connection is closed after one response.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::date;

/// Body sent when no content could be resolved
pub const NOT_FOUND_BODY: &str = "404: File not found";

/// Prefix written before resolved content
pub const CONTENTS_PREFIX: &str = "The contents are: ";

/// Outcome reported on the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    Error,
}

impl ResponseStatus {
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Error => 404,
        }
    }

    pub const fn status_line(self) -> &'static str {
        match self {
            Self::Ok => "HTTP/1.1 200 OK",
            Self::Error => "HTTP/1.1 404 Error",
        }
    }
}

/// Render the header block, including the terminating blank line
pub fn header_block(status: ResponseStatus, date: &str, server: &str, content_type: &str) -> String {
    format!(
        "{}\nDate: {date}\nServer: {server}\nConnection: close\nContent-Type: {content_type}\n\n",
        status.status_line()
    )
}

/// Render the body for resolved content, or the not-found text when `None`
pub fn body_text(content: Option<&str>) -> String {
    match content {
        Some(text) => format!("{CONTENTS_PREFIX}{text}"),
        None => NOT_FOUND_BODY.to_string(),
    }
}

/// Write the status line and header fields, stamped with the current GMT time
pub async fn write_header<W>(
    writer: &mut W,
    status: ResponseStatus,
    server: &str,
    content_type: &str,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let head = header_block(status, &date::now_gmt(), server, content_type);
    writer.write_all(head.as_bytes()).await
}

/// Write the body and return its size in bytes
pub async fn write_content<W>(writer: &mut W, content: Option<&str>) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let body = body_text(content);
    writer.write_all(body.as_bytes()).await?;
    Ok(body.len())
}
