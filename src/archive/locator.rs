//! Crawl and segment discovery

use flate2::read::MultiGzDecoder;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regex::Regex;
use std::io::Read;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::retry::{is_transient_http, is_transient_status, RetryPolicy, Transient};
use crate::config::ArchiveConfig;
use crate::types::SegmentRef;

/// Errors while discovering crawls and segments
#[derive(Error, Debug)]
pub enum LocateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("No crawl identifier found at {0}")]
    NoCrawlId(String),

    #[error("Failed to decompress manifest: {0}")]
    Manifest(#[source] std::io::Error),

    #[error("Manifest for {0} lists no segments")]
    EmptyManifest(String),
}

impl Transient for LocateError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => is_transient_http(e),
            Self::Status { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Read from the remote index or manifest
    Discovered,
    /// Given explicitly in configuration
    Configured,
    /// Built-in fallback after a failure
    Fallback,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Discovered => "discovered",
            Self::Configured => "configured",
            Self::Fallback => "fallback",
        })
    }
}

/// Crawl id and the segments selected from it
#[derive(Debug, Clone)]
pub struct Resolution {
    pub crawl_id: String,
    pub crawl_id_source: Provenance,
    pub segments: Vec<SegmentRef>,
    pub segments_source: Provenance,
}

static RE_CRAWL_ID: OnceLock<Regex> = OnceLock::new();

/// First crawl identifier in an index page
pub fn find_crawl_id(page: &str) -> Option<&str> {
    let re = RE_CRAWL_ID.get_or_init(|| Regex::new(r"CC-MAIN-\d{4}-\d{2}").unwrap());
    re.find(page).map(|m| m.as_str())
}

/// Decompress a gzip path manifest into segment references (blank lines skipped)
pub fn parse_manifest(compressed: &[u8]) -> Result<Vec<SegmentRef>, std::io::Error> {
    let mut text = String::new();
    MultiGzDecoder::new(compressed).read_to_string(&mut text)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(SegmentRef::new)
        .collect())
}

/// Uniform sample of `count` distinct segments (all of them if fewer exist).
///
/// A seed makes the selection reproducible; without one, every call differs.
pub fn sample_segments(paths: &[SegmentRef], count: usize, seed: Option<u64>) -> Vec<SegmentRef> {
    match seed {
        Some(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            paths.choose_multiple(&mut rng, count).cloned().collect()
        }
        None => paths
            .choose_multiple(&mut rand::thread_rng(), count)
            .cloned()
            .collect(),
    }
}

/// Resolves the crawl to sample and which of its segments to fetch.
///
/// Every network failure degrades to the configured fallbacks instead of
/// failing the run.
pub struct SegmentLocator {
    client: reqwest::Client,
    archive: ArchiveConfig,
    retry: RetryPolicy,
}

impl SegmentLocator {
    pub fn new(client: reqwest::Client, archive: ArchiveConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            archive,
            retry,
        }
    }

    /// Resolve a crawl id and sample `count` segment paths from it
    pub async fn resolve(&self, count: usize) -> Resolution {
        let (crawl_id, crawl_id_source) = self.crawl_id().await;

        let (segments, segments_source) = match self.list_segments(&crawl_id).await {
            Ok(paths) => {
                let selected = sample_segments(&paths, count, self.archive.seed);
                info!(
                    crawl_id = %crawl_id,
                    available = paths.len(),
                    selected = selected.len(),
                    "Sampled segments from manifest"
                );
                (selected, Provenance::Discovered)
            }
            Err(e) => {
                warn!(crawl_id = %crawl_id, error = %e, "Failed to get segment manifest, using fallback segments");
                (self.fallback_segments(count), Provenance::Fallback)
            }
        };

        Resolution {
            crawl_id,
            crawl_id_source,
            segments,
            segments_source,
        }
    }

    /// Configured crawl id, else the latest from the index, else the fallback
    pub async fn crawl_id(&self) -> (String, Provenance) {
        if let Some(id) = &self.archive.crawl_id {
            return (id.clone(), Provenance::Configured);
        }
        match self.latest_crawl_id().await {
            Ok(id) => {
                info!(crawl_id = %id, "Discovered latest crawl");
                (id, Provenance::Discovered)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = %self.archive.fallback_crawl_id,
                    "Failed to get latest crawl id, using fallback"
                );
                (self.archive.fallback_crawl_id.clone(), Provenance::Fallback)
            }
        }
    }

    /// Scrape the index page for the first crawl identifier
    pub async fn latest_crawl_id(&self) -> Result<String, LocateError> {
        let url = self.archive.index_url.as_str();
        let page = self
            .retry
            .run("index request", || self.get_text(url))
            .await?;
        find_crawl_id(&page)
            .map(str::to_string)
            .ok_or_else(|| LocateError::NoCrawlId(url.to_string()))
    }

    /// Every segment path listed in the crawl's manifest
    pub async fn list_segments(&self, crawl_id: &str) -> Result<Vec<SegmentRef>, LocateError> {
        let url = self.archive.manifest_url(crawl_id);
        debug!(url = %url, "Fetching segment manifest");
        let compressed = self
            .retry
            .run("manifest request", || self.get_bytes(&url))
            .await?;
        let paths = parse_manifest(&compressed).map_err(LocateError::Manifest)?;
        if paths.is_empty() {
            return Err(LocateError::EmptyManifest(crawl_id.to_string()));
        }
        Ok(paths)
    }

    fn fallback_segments(&self, count: usize) -> Vec<SegmentRef> {
        self.archive
            .fallback_segments
            .iter()
            .take(count.max(1))
            .map(|path| SegmentRef::new(path.as_str()))
            .collect()
    }

    async fn get_text(&self, url: &str) -> Result<String, LocateError> {
        Ok(self.get_checked(url).await?.text().await?)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, LocateError> {
        Ok(self.get_checked(url).await?.bytes().await?.to_vec())
    }

    async fn get_checked(&self, url: &str) -> Result<reqwest::Response, LocateError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LocateError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }
}
