//! Per-segment state and the end-of-run summary

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::SegmentRef;
use crate::util::format_bytes;

/// Lifecycle of one selected segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Pending,
    Fetching,
    Fetched,
    FetchFailed,
    Processing,
    Processed,
    Failed,
    Cancelled,
}

impl SegmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Fetched => "fetched",
            Self::FetchFailed => "fetch-failed",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// No further transitions happen from this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed | Self::Processed | Self::Failed | Self::Cancelled
        )
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record-level counters for one processed segment file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentStats {
    /// Container records read, of any type
    pub records_seen: usize,
    /// Records that were HTML responses
    pub html_records: usize,
    /// In-scope records whose body could not be decoded
    pub body_errors: usize,
    /// In-scope records that produced no text
    pub empty_texts: usize,
    /// Texts rejected by the content filter
    pub filtered_out: usize,
    /// Documents written
    pub documents_saved: usize,
    /// Iteration stopped at a malformed or truncated record
    pub truncated: bool,
}

/// Everything known about one segment at the end of a run
#[derive(Debug, Clone)]
pub struct SegmentReport {
    pub segment: SegmentRef,
    pub state: SegmentState,
    pub local_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub bytes_downloaded: u64,
    pub stats: SegmentStats,
    pub error: Option<String>,
}

impl SegmentReport {
    pub fn new(segment: SegmentRef) -> Self {
        Self {
            segment,
            state: SegmentState::Pending,
            local_path: None,
            output_path: None,
            bytes_downloaded: 0,
            stats: SegmentStats::default(),
            error: None,
        }
    }

    /// Short display name (file name, or the full path if it has none)
    pub fn name(&self) -> &str {
        self.segment.file_name().unwrap_or(self.segment.as_str())
    }

    pub(crate) fn fail(&mut self, state: SegmentState, error: impl fmt::Display) {
        self.state = state;
        self.error = Some(error.to_string());
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub crawl_id: Option<String>,
    pub segments: Vec<SegmentReport>,
    pub raw_dir: PathBuf,
    pub extracted_dir: PathBuf,
    /// Combined size of the raw and extracted files still on disk
    pub disk_bytes: u64,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn segments_fetched(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.local_path.is_some())
            .count()
    }

    pub fn segments_processed(&self) -> usize {
        self.count_state(SegmentState::Processed)
    }

    pub fn count_state(&self, state: SegmentState) -> usize {
        self.segments.iter().filter(|s| s.state == state).count()
    }

    pub fn records_seen(&self) -> usize {
        self.segments.iter().map(|s| s.stats.records_seen).sum()
    }

    pub fn documents_saved(&self) -> usize {
        self.segments.iter().map(|s| s.stats.documents_saved).sum()
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.segments.iter().map(|s| s.bytes_downloaded).sum()
    }

    /// Output files written (one per processed segment)
    pub fn output_files(&self) -> Vec<&Path> {
        self.segments
            .iter()
            .filter(|s| s.state == SegmentState::Processed)
            .filter_map(|s| s.output_path.as_deref())
            .collect()
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!("\nSampling Summary");
        println!("================");
        if let Some(crawl_id) = &self.crawl_id {
            println!("Crawl:               {}", crawl_id);
        }
        println!(
            "Segments fetched:    {}/{}",
            self.segments_fetched(),
            self.segments.len()
        );
        println!("Segments processed:  {}", self.segments_processed());
        println!("Records seen:        {}", self.records_seen());
        println!("Documents saved:     {}", self.documents_saved());
        println!("Downloaded:          {}", format_bytes(self.bytes_downloaded()));
        println!("Total size on disk:  {}", format_bytes(self.disk_bytes));
        println!("Elapsed time:        {:.1}s", self.elapsed.as_secs_f64());
        if self.cancelled {
            println!("Run was cancelled before all segments finished");
        }

        println!();
        println!(
            "{:<52} {:>13} {:>10} {:>8} {:>11}",
            "Segment", "State", "Downloaded", "Records", "Saved"
        );
        for report in &self.segments {
            println!(
                "{:<52} {:>13} {:>10} {:>8} {:>11}",
                report.name(),
                report.state.as_str(),
                format_bytes(report.bytes_downloaded),
                report.stats.records_seen,
                report.stats.documents_saved
            );
            if let Some(error) = &report.error {
                println!("    error: {}", error);
            }
        }

        println!();
        println!("Raw segments:        {}", self.raw_dir.display());
        println!("Extracted documents: {}", self.extracted_dir.display());
    }
}
