//! Byte-bounded segment downloads

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::progress::TransferProgress;
use super::retry::{is_transient_http, is_transient_status, RetryPolicy, Transient};
use crate::types::SegmentRef;
use crate::util::{format_bytes, join_url};

/// Errors that can occur while downloading a segment
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Segment path has no file name: '{0}'")]
    InvalidSegment(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => is_transient_http(e),
            Self::Status { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

/// A local prefix of a remote segment
#[derive(Debug, Clone)]
pub struct FetchedSegment {
    pub segment: SegmentRef,
    pub path: PathBuf,
    /// Bytes written to `path`
    pub bytes_written: u64,
    /// Size announced by the server, if any
    pub declared_len: Option<u64>,
}

impl FetchedSegment {
    /// Whether the whole remote file was stored (unknown length counts as partial)
    pub fn is_complete(&self) -> bool {
        self.declared_len
            .map(|len| self.bytes_written >= len)
            .unwrap_or(false)
    }
}

/// Streams a segment to disk, stopping once a byte budget is spent.
///
/// The budget is `min(declared length, max_bytes)` when the server sends a
/// positive `Content-Length`, and `max_bytes` otherwise. The connection is
/// dropped as soon as the budget is reached, never drained.
pub struct BoundedFetcher {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    progress: TransferProgress,
}

impl BoundedFetcher {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            retry,
            progress: TransferProgress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: TransferProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Full URL of a segment
    pub fn segment_url(&self, segment: &SegmentRef) -> String {
        join_url(&self.base_url, segment.as_str())
    }

    /// Download at most `max_bytes` of `segment` into `dest_dir`.
    ///
    /// The file is named after the segment's final path component. On error
    /// any partially written file is removed.
    pub async fn fetch(
        &self,
        segment: &SegmentRef,
        dest_dir: &Path,
        max_bytes: u64,
    ) -> Result<FetchedSegment, FetchError> {
        let file_name = segment
            .file_name()
            .ok_or_else(|| FetchError::InvalidSegment(segment.to_string()))?;
        let dest = dest_dir.join(file_name);
        let url = self.segment_url(segment);

        info!(url = %url, budget = %format_bytes(max_bytes), "Downloading segment");

        let mut response = self
            .retry
            .run("segment request", || self.open(&url))
            .await?;

        let declared_len = response.content_length().filter(|&len| len > 0);
        let budget = declared_len.map_or(max_bytes, |len| len.min(max_bytes));
        debug!(url = %url, ?declared_len, budget, "Segment response received");

        let bar = self.progress.start(file_name, budget);
        match stream_prefix(&mut response, &dest, budget, &bar).await {
            Ok(bytes_written) => {
                bar.finish();
                info!(
                    path = %dest.display(),
                    bytes = bytes_written,
                    size = %format_bytes(bytes_written),
                    "Segment saved"
                );
                Ok(FetchedSegment {
                    segment: segment.clone(),
                    path: dest,
                    bytes_written,
                    declared_len,
                })
            }
            Err(e) => {
                bar.abandon();
                if let Err(rm) = tokio::fs::remove_file(&dest).await {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %dest.display(), error = %rm, "Failed to remove partial segment");
                    }
                }
                Err(e)
            }
        }
    }

    async fn open(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }
}

/// Copy at most `budget` body bytes into a new file at `dest`
async fn stream_prefix(
    response: &mut reqwest::Response,
    dest: &Path,
    budget: u64,
    bar: &indicatif::ProgressBar,
) -> Result<u64, FetchError> {
    let io_err = |source| FetchError::Io {
        path: dest.to_path_buf(),
        source,
    };

    let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
    let mut written: u64 = 0;

    while written < budget {
        let Some(chunk) = response.chunk().await? else {
            break;
        };
        let take = (chunk.len() as u64).min(budget - written) as usize;
        file.write_all(&chunk[..take]).await.map_err(io_err)?;
        written += take as u64;
        bar.inc(take as u64);
    }

    file.flush().await.map_err(io_err)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_url() {
        let fetcher = BoundedFetcher::new(
            reqwest::Client::new(),
            "https://data.example.org/",
            RetryPolicy::none(),
        );
        assert_eq!(
            fetcher.segment_url(&SegmentRef::new("/crawl-data/a/b.warc.gz")),
            "https://data.example.org/crawl-data/a/b.warc.gz"
        );
    }

    #[test]
    fn test_completeness() {
        let fetched = FetchedSegment {
            segment: SegmentRef::new("a/b.warc.gz"),
            path: PathBuf::from("b.warc.gz"),
            bytes_written: 10,
            declared_len: Some(10),
        };
        assert!(fetched.is_complete());
        assert!(!FetchedSegment { declared_len: Some(11), ..fetched.clone() }.is_complete());
        assert!(!FetchedSegment { declared_len: None, ..fetched }.is_complete());
    }

    #[test]
    fn test_status_errors_classified() {
        let server = FetchError::Status {
            url: "u".to_string(),
            status: reqwest::StatusCode::BAD_GATEWAY,
        };
        let missing = FetchError::Status {
            url: "u".to_string(),
            status: reqwest::StatusCode::NOT_FOUND,
        };
        assert!(server.is_transient());
        assert!(!missing.is_transient());
        assert!(!FetchError::InvalidSegment("x/".to_string()).is_transient());
    }
}
