//! Remote archive locations and fallbacks

use serde::{Deserialize, Serialize};

use crate::util::join_url;

/// Crawl identifier used when the index endpoint cannot be reached
pub const FALLBACK_CRAWL_ID: &str = "CC-MAIN-2023-23";

/// Segment paths known to exist, used when the manifest cannot be fetched
pub const FALLBACK_SEGMENTS: [&str; 2] = [
    "crawl-data/CC-MAIN-2023-23/segments/1685224643388.28/warc/CC-MAIN-20230528083433-20230528113433-00000.warc.gz",
    "crawl-data/CC-MAIN-2023-23/segments/1685224643388.28/warc/CC-MAIN-20230528083433-20230528113433-00001.warc.gz",
];

/// Where crawl ids, manifests and segments are found
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Index page scraped for the latest crawl id
    pub index_url: String,
    /// Base URL of the segment store (manifests and segments live under it)
    pub data_base_url: String,
    /// Skip index discovery and use this crawl id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_id: Option<String>,
    /// Crawl id used when discovery fails
    pub fallback_crawl_id: String,
    /// Segment paths used when the manifest cannot be fetched
    pub fallback_segments: Vec<String>,
    /// Seed for segment sampling (unseeded runs are not reproducible)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ArchiveConfig {
    /// URL of the gzip manifest listing every segment of a crawl
    pub fn manifest_url(&self, crawl_id: &str) -> String {
        join_url(
            &self.data_base_url,
            &format!("crawl-data/{}/warc.paths.gz", crawl_id),
        )
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            index_url: "https://index.commoncrawl.org/".to_string(),
            data_base_url: "https://data.commoncrawl.org/".to_string(),
            crawl_id: None,
            fallback_crawl_id: FALLBACK_CRAWL_ID.to_string(),
            fallback_segments: FALLBACK_SEGMENTS.iter().map(|s| s.to_string()).collect(),
            seed: None,
        }
    }
}
