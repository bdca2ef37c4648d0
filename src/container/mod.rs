//! WARC container decoding
//!
//! [`ContainerReader`] walks the records of a (possibly truncated, possibly
//! gzip-compressed) segment file. Records whose payload is an HTTP response
//! with an HTML content type are in scope for text extraction; everything
//! else is counted and skipped.

mod http;
mod reader;

pub use http::HttpResponse;
pub use reader::{ContainerReader, ContainerRecord, HtmlResponse};

use std::path::PathBuf;
use thiserror::Error;

/// Container errors
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Failed to open segment file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed or truncated record after {records} records: {message}")]
    Malformed { records: usize, message: String },

    #[error("Invalid chunked body: {0}")]
    Chunked(String),

    #[error("Failed to inflate {encoding} body: {source}")]
    Inflate {
        encoding: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported content encoding: {0}")]
    UnsupportedEncoding(String),
}
