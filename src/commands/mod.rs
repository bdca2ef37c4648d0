//! CLI command implementations

pub mod init;
pub mod locate;
pub mod process;
pub mod run;

use ccsample::config::{plan_download, Config};
use ccsample::filter::FilterMode;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// CLI filter mode enum (mirrors FilterMode but with clap support)
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliFilterMode {
    /// Keep documents mentioning at least one keyword
    Bias,
    /// Keep every document with enough text
    All,
}

impl From<CliFilterMode> for FilterMode {
    fn from(mode: CliFilterMode) -> Self {
        match mode {
            CliFilterMode::Bias => FilterMode::Bias,
            CliFilterMode::All => FilterMode::All,
        }
    }
}

/// Segment selection overrides
#[derive(Args, Debug, Default)]
pub struct SampleArgs {
    /// Total download size in MB (one segment per 50 MB, each capped at 50 MB)
    #[arg(long)]
    pub size: Option<u64>,

    /// Number of segments (overrides the count derived from --size)
    #[arg(long)]
    pub segments: Option<usize>,

    /// Seed for reproducible segment selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Crawl to sample instead of the latest one
    #[arg(long)]
    pub crawl_id: Option<String>,
}

impl SampleArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(size) = self.size {
            let (segments, per_segment_mb) = plan_download(size);
            config.pipeline.segment_count = segments;
            config.fetch.max_segment_mb = per_segment_mb;
        }
        if let Some(segments) = self.segments {
            config.pipeline.segment_count = segments;
        }
        if let Some(seed) = self.seed {
            config.archive.seed = Some(seed);
        }
        if let Some(crawl_id) = &self.crawl_id {
            config.archive.crawl_id = Some(crawl_id.clone());
        }
    }
}

/// Extraction and output overrides
#[derive(Args, Debug, Default)]
pub struct ExtractArgs {
    /// Output directory (warc/ and jsonl/ are created beneath it)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Which documents to keep
    #[arg(long, value_enum)]
    pub filter_mode: Option<CliFilterMode>,

    /// Newline-delimited keyword file
    #[arg(long)]
    pub keywords_file: Option<PathBuf>,

    /// Maximum records read per segment
    #[arg(long)]
    pub max_records: Option<usize>,
}

impl ExtractArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.pipeline.output_dir = output.clone();
        }
        if let Some(mode) = self.filter_mode {
            config.filter.mode = mode.into();
        }
        if let Some(path) = &self.keywords_file {
            config.filter.keywords_file = Some(path.clone());
        }
        if let Some(max_records) = self.max_records {
            config.pipeline.max_records_per_segment = max_records;
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub sample: SampleArgs,

    #[command(flatten)]
    pub extract: ExtractArgs,

    /// Keep raw segment files after processing
    #[arg(long, conflicts_with = "delete_raw")]
    pub keep_raw: bool,

    /// Delete raw segment files after processing
    #[arg(long)]
    pub delete_raw: bool,

    /// Concurrent segment workers
    #[arg(long)]
    pub workers: Option<usize>,
}

impl RunArgs {
    pub fn apply(&self, config: &mut Config) {
        self.sample.apply(config);
        self.extract.apply(config);
        if self.keep_raw {
            config.pipeline.keep_raw = true;
        }
        if self.delete_raw {
            config.pipeline.keep_raw = false;
        }
        if let Some(workers) = self.workers {
            config.pipeline.workers = workers;
        }
    }
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Segment files (.warc or .warc.gz)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub extract: ExtractArgs,
}

#[derive(Args, Debug, Default)]
pub struct LocateArgs {
    #[command(flatten)]
    pub sample: SampleArgs,
}

/// What a Ctrl-C asks for
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// Stop scheduling, finish work in progress
    Cancel,
    /// Cancellation was already requested; leave now
    Exit,
}

fn next_interrupt(cancel: &AtomicBool) -> Interrupt {
    if cancel.swap(true, Ordering::SeqCst) {
        Interrupt::Exit
    } else {
        Interrupt::Cancel
    }
}

/// Set `cancel` on the first Ctrl-C and exit with status 130 on the second
fn cancel_on_interrupt(cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match next_interrupt(&cancel) {
                Interrupt::Cancel => {
                    warn!("Interrupted, finishing segments already in progress (Ctrl-C again to abort)")
                }
                Interrupt::Exit => {
                    warn!("Interrupted twice, aborting");
                    std::process::exit(130);
                }
            }
        }
    });
}
