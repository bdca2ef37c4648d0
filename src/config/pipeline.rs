//! Run-level settings: how many segments, where files go, how much work per file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Size of one planned segment download (MiB)
pub const SEGMENT_PLAN_MB: u64 = 50;

/// Pipeline driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root output directory (`warc/` and `jsonl/` are created beneath it)
    pub output_dir: PathBuf,
    /// Number of segments to sample
    pub segment_count: usize,
    /// Upper bound on container records read per segment file
    pub max_records_per_segment: usize,
    /// Concurrent segment workers (0 = one per segment)
    pub workers: usize,
    /// Keep raw segment files after processing
    pub keep_raw: bool,
    /// Suppress progress bars and the printed summary
    pub quiet: bool,
}

impl PipelineConfig {
    /// Directory for downloaded segment prefixes
    pub fn raw_dir(&self) -> PathBuf {
        self.output_dir.join("warc")
    }

    /// Directory for JSONL output
    pub fn extracted_dir(&self) -> PathBuf {
        self.output_dir.join("jsonl")
    }

    /// Worker pool size for `segments` selected segments (at least one)
    pub fn worker_count(&self, segments: usize) -> usize {
        let limit = if self.workers == 0 { segments } else { self.workers };
        limit.min(segments).max(1)
    }

    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            segment_count: 2,
            max_records_per_segment: 1000,
            workers: 4,
            keep_raw: true,
            quiet: false,
        }
    }
}

/// Split a total download size into segment count and per-segment budget
///
/// Returns `(segments, per_segment_mb)`: one segment per 50 MiB (at least one),
/// each capped at `min(50, total_mb)`.
pub fn plan_download(total_mb: u64) -> (usize, u64) {
    let segments = (total_mb / SEGMENT_PLAN_MB).max(1) as usize;
    let per_segment = SEGMENT_PLAN_MB.min(total_mb).max(1);
    (segments, per_segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_download() {
        assert_eq!(plan_download(100), (2, 50));
        assert_eq!(plan_download(20), (1, 20));
        assert_eq!(plan_download(175), (3, 50));
        assert_eq!(plan_download(0), (1, 1));
    }

    #[test]
    fn test_worker_count() {
        let config = PipelineConfig::default();
        assert_eq!(config.worker_count(2), 2);
        assert_eq!(config.worker_count(10), 4);
        assert_eq!(config.worker_count(0), 1);

        let unbounded = PipelineConfig { workers: 0, ..PipelineConfig::default() };
        assert_eq!(unbounded.worker_count(7), 7);
    }

    #[test]
    fn test_directories() {
        let config = PipelineConfig::default().with_output_dir("/tmp/run");
        assert_eq!(config.raw_dir(), PathBuf::from("/tmp/run/warc"));
        assert_eq!(config.extracted_dir(), PathBuf::from("/tmp/run/jsonl"));
    }
}
