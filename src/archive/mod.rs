//! Remote archive access
//!
//! - [`SegmentLocator`]: crawl id discovery and segment sampling, with fallbacks
//! - [`BoundedFetcher`]: size-capped streaming download of one segment
//! - [`RetryPolicy`]: bounded exponential backoff shared by both

mod fetcher;
mod locator;
mod progress;
mod retry;

pub use fetcher::{BoundedFetcher, FetchError, FetchedSegment};
pub use locator::{
    find_crawl_id, parse_manifest, sample_segments, LocateError, Provenance, Resolution,
    SegmentLocator,
};
pub use progress::TransferProgress;
pub use retry::{RetryPolicy, Transient};

use std::time::Duration;

use crate::config::FetchConfig;

/// HTTP client shared by the locator and the fetcher.
///
/// Response bodies are not decompressed: segments and manifests are stored
/// gzip files and must be written byte-for-byte.
pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
}
