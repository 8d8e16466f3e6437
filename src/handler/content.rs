//! Content resolution module
//!
//! Maps a request path to a file under the document root and reads it line
//! by line, replacing whole lines that carry one of the template markers.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::http::{date, ResponseStatus};
use crate::logger;

/// A line containing this is replaced by the current GMT date
pub const DATE_MARKER: &str = "<cs371date>";

/// A line containing this is replaced by the content server identity
pub const SERVER_MARKER: &str = "cs371server>";

/// Accumulated bodies start with a single space
const BODY_LEAD: &str = " ";

/// Result of resolving one request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedContent {
    Found(String),
    NotFound,
}

impl ResolvedContent {
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Found(body) => Some(body),
            Self::NotFound => None,
        }
    }
}

impl From<&ResolvedContent> for ResponseStatus {
    fn from(content: &ResolvedContent) -> Self {
        match content {
            ResolvedContent::Found(_) => Self::Ok,
            ResolvedContent::NotFound => Self::Error,
        }
    }
}

/// Apply marker substitution to one line
///
/// Markers match anywhere in the line and replace the entire line. The date
/// marker wins when both are present.
pub fn substitute_line<'a>(line: &'a str, server_identity: &'a str) -> Cow<'a, str> {
    if line.contains(DATE_MARKER) {
        Cow::Owned(date::now_gmt())
    } else if line.contains(SERVER_MARKER) {
        Cow::Borrowed(server_identity)
    } else {
        Cow::Borrowed(line)
    }
}

/// Split text into lines ended by `\n`, `\r\n` or a lone `\r`
///
/// Terminators are dropped. Text after the last terminator is a final line;
/// a trailing terminator does not start an empty one.
fn text_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(end) = rest.find(|c: char| c == '\r' || c == '\n') else {
            return Some(std::mem::take(&mut rest));
        };
        let line = &rest[..end];
        let skip = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[end + skip..];
        Some(line)
    })
}

/// Resolves request paths against a document root
#[derive(Debug, Clone)]
pub struct ContentResolver {
    root: PathBuf,
    server_identity: String,
}

impl ContentResolver {
    pub fn new(root: impl Into<PathBuf>, server_identity: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            server_identity: server_identity.into(),
        }
    }

    /// Map a request path to a file location under the root
    ///
    /// The path must start with `/`, which is stripped. Empty paths and any
    /// path that could climb out of the root are refused.
    pub fn locate(&self, path: &str) -> Option<PathBuf> {
        let relative = path.strip_prefix('/')?;
        if relative.is_empty() {
            return None;
        }
        let escapes = Path::new(relative)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            logger::log_warning(&format!("Path traversal attempt blocked: {path}"));
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Resolve `path` to substituted file content
    ///
    /// `None` stands for a request whose path could not be parsed.
    pub async fn resolve(&self, path: Option<&str>) -> ResolvedContent {
        let Some(file_path) = path.and_then(|p| self.locate(p)) else {
            return ResolvedContent::NotFound;
        };

        // File not found is common (404), no need to log at warning level
        let file = match File::open(&file_path).await {
            Ok(f) => f,
            Err(e) => {
                logger::log_debug(&format!("Cannot open '{}': {e}", file_path.display()));
                return ResolvedContent::NotFound;
            }
        };

        match self.render(file).await {
            Ok(body) => ResolvedContent::Found(body),
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to read file '{}': {e}",
                    file_path.display()
                ));
                ResolvedContent::NotFound
            }
        }
    }

    async fn render(&self, mut file: File) -> std::io::Result<String> {
        let mut text = String::new();
        file.read_to_string(&mut text).await?;

        let mut body = String::from(BODY_LEAD);
        for line in text_lines(&text) {
            body.push_str(&substitute_line(line, &self.server_identity));
            body.push('\n');
        }
        Ok(body)
    }
}
