//! HTTP protocol layer module
//!
//! Request line parsing, response header/body emission and date formatting,
//! decoupled from file resolution.

pub mod date;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{read_request_line, RequestParseError};
pub use response::{write_content, write_header, ResponseStatus};
