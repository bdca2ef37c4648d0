//! ccsample: byte-bounded Common Crawl sampling
//!
//! Picks a few segments of a recent crawl, downloads a size-capped prefix of
//! each, and writes keyword-filtered plain text from the HTML responses as
//! JSON lines:
//! - Crawl id discovery and reproducible segment sampling, with fallbacks
//! - Streaming downloads that stop at a byte budget
//! - Tolerant WARC reading that keeps every record before a truncation
//! - Encoding-aware HTML to text extraction
//! - One output file per segment, written by a single writer

pub mod archive;
pub mod config;
pub mod container;
pub mod content;
pub mod filter;
pub mod output;
pub mod pipeline;
pub mod types;
pub mod util;

pub use config::Config;
pub use pipeline::{Pipeline, PipelineError, RunSummary};
pub use types::*;
