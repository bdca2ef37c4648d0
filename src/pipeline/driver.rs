//! Pipeline driver
//!
//! Locate segments, fetch them concurrently, then process each fetched file
//! on a blocking worker. Failures are contained to the segment they occur
//! in; only workspace setup can fail a run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::report::{RunSummary, SegmentReport, SegmentState, SegmentStats};
use crate::archive::{
    build_client, BoundedFetcher, FetchError, FetchedSegment, RetryPolicy, SegmentLocator,
    TransferProgress,
};
use crate::config::Config;
use crate::container::{ContainerError, ContainerReader};
use crate::content::TextExtractor;
use crate::filter::{ContentFilter, FilterError, FilterMode};
use crate::output::{EmitError, LineSink, OutputHandle, OutputWriter, RecordEmitter};
use crate::types::{domain_of, SegmentRef};

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to create directory {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Output(#[from] EmitError),
}

/// Runs Reader → Extractor → Filter → Emitter over one segment file
pub struct SegmentProcessor {
    extractor: TextExtractor,
    filter: ContentFilter,
    emitter: RecordEmitter,
    mode: FilterMode,
    max_records: usize,
}

impl SegmentProcessor {
    pub fn new(
        extractor: TextExtractor,
        filter: ContentFilter,
        emitter: RecordEmitter,
        mode: FilterMode,
        max_records: usize,
    ) -> Self {
        Self {
            extractor,
            filter,
            emitter,
            mode,
            max_records,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, FilterError> {
        Ok(Self::new(
            TextExtractor::new(&config.extraction),
            ContentFilter::from_config(&config.filter)?,
            RecordEmitter::new(config.extraction.max_text_chars),
            config.filter.mode,
            config.pipeline.max_records_per_segment,
        ))
    }

    /// Process records in stream order, writing retained documents to `sink`.
    ///
    /// At most `max_records` records are read, whatever their type. Bad
    /// records are counted and skipped; only opening the file or writing
    /// output fails the call.
    pub fn process<S: LineSink + ?Sized>(
        &self,
        path: &Path,
        sink: &mut S,
    ) -> Result<SegmentStats, PipelineError> {
        let mut reader = ContainerReader::open(path)?;
        let mut stats = SegmentStats::default();

        for record in reader.by_ref().take(self.max_records) {
            stats.records_seen += 1;

            let Some(html) = record.html_response() else {
                continue;
            };
            stats.html_records += 1;

            let body = match html.http.decoded_body() {
                Ok(body) => body,
                Err(e) => {
                    debug!(url = %html.url, error = %e, "Skipping record with undecodable body");
                    stats.body_errors += 1;
                    continue;
                }
            };

            let text = self.extractor.extract(&body);
            if text.is_empty() {
                stats.empty_texts += 1;
                continue;
            }
            if !self.filter.accept(&text, self.mode) {
                stats.filtered_out += 1;
                continue;
            }

            let domain = domain_of(&html.url);
            self.emitter.emit(&html.url, &domain, &text, sink)?;
            stats.documents_saved += 1;
        }

        stats.truncated = reader.stop_error().is_some();
        info!(
            path = %path.display(),
            records = stats.records_seen,
            html = stats.html_records,
            saved = stats.documents_saved,
            truncated = stats.truncated,
            "Processed segment"
        );
        Ok(stats)
    }
}

/// Output directories of a run
#[derive(Debug, Clone)]
struct Workspace {
    raw_dir: PathBuf,
    extracted_dir: PathBuf,
}

enum ProcessOutcome {
    Done(Result<SegmentStats, PipelineError>),
    Cancelled,
    Aborted(String),
}

/// The sampling pipeline
pub struct Pipeline {
    config: Config,
    client: reqwest::Client,
    cancel: Arc<AtomicBool>,
    progress: TransferProgress,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        let client = build_client(&config.fetch)?;
        let progress = TransferProgress::new(config.pipeline.quiet);
        Ok(Self {
            config,
            client,
            cancel: Arc::new(AtomicBool::new(false)),
            progress,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flag checked at segment boundaries; set it to stop the run early
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Full run: locate, fetch, process
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let (workspace, processor) = self.prepare()?;

        let locator = SegmentLocator::new(
            self.client.clone(),
            self.config.archive.clone(),
            RetryPolicy::from(&self.config.fetch.retry),
        );
        let resolution = locator.resolve(self.config.pipeline.segment_count).await;
        info!(
            crawl_id = %resolution.crawl_id,
            segments = resolution.segments.len(),
            "Resolved segments"
        );

        let reports = resolution
            .segments
            .into_iter()
            .map(SegmentReport::new)
            .collect();
        self.execute(Some(resolution.crawl_id), reports, workspace, processor, started)
            .await
    }

    /// Fetch and process the given segments, skipping discovery
    pub async fn run_segments(
        &self,
        crawl_id: Option<String>,
        segments: Vec<SegmentRef>,
    ) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let (workspace, processor) = self.prepare()?;
        let reports = segments.into_iter().map(SegmentReport::new).collect();
        self.execute(crawl_id, reports, workspace, processor, started)
            .await
    }

    /// Process segment files already on disk. Input files are never deleted.
    pub async fn process_local(&self, files: Vec<PathBuf>) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let (workspace, processor) = self.prepare()?;

        let mut reports: Vec<SegmentReport> = files
            .into_iter()
            .map(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                let mut report = SegmentReport::new(SegmentRef::new(name));
                report.state = SegmentState::Fetched;
                report.local_path = Some(path);
                report
            })
            .collect();

        self.process_all(&mut reports, processor, &workspace.extracted_dir, true)
            .await?;
        Ok(self.summarize(None, reports, workspace, started).await)
    }

    /// Create output directories and build the record processor
    fn prepare(&self) -> Result<(Workspace, Arc<SegmentProcessor>), PipelineError> {
        let workspace = Workspace {
            raw_dir: self.config.pipeline.raw_dir(),
            extracted_dir: self.config.pipeline.extracted_dir(),
        };
        for dir in [&workspace.raw_dir, &workspace.extracted_dir] {
            std::fs::create_dir_all(dir).map_err(|source| PipelineError::Workspace {
                path: dir.clone(),
                source,
            })?;
        }
        let processor = Arc::new(SegmentProcessor::from_config(&self.config)?);
        Ok((workspace, processor))
    }

    async fn execute(
        &self,
        crawl_id: Option<String>,
        mut reports: Vec<SegmentReport>,
        workspace: Workspace,
        processor: Arc<SegmentProcessor>,
        started: Instant,
    ) -> Result<RunSummary, PipelineError> {
        self.fetch_all(&mut reports, &workspace.raw_dir).await;
        self.process_all(
            &mut reports,
            processor,
            &workspace.extracted_dir,
            self.config.pipeline.keep_raw,
        )
        .await?;
        Ok(self.summarize(crawl_id, reports, workspace, started).await)
    }

    /// Download every pending segment, bounded by the worker count
    async fn fetch_all(&self, reports: &mut [SegmentReport], raw_dir: &Path) {
        let fetcher = Arc::new(
            BoundedFetcher::new(
                self.client.clone(),
                self.config.archive.data_base_url.clone(),
                RetryPolicy::from(&self.config.fetch.retry),
            )
            .with_progress(self.progress.clone()),
        );
        let semaphore = Arc::new(Semaphore::new(
            self.config.pipeline.worker_count(reports.len()),
        ));
        let max_bytes = self.config.fetch.max_segment_bytes();
        let mut tasks: JoinSet<(usize, Option<Result<FetchedSegment, FetchError>>)> = JoinSet::new();
        let mut raw_names = HashSet::new();

        for (index, report) in reports.iter_mut().enumerate() {
            if self.is_cancelled() {
                report.state = SegmentState::Cancelled;
                continue;
            }
            // Segments sharing a file name would download into the same raw file
            if let Some(name) = report.segment.file_name() {
                if !raw_names.insert(name.to_string()) {
                    warn!(segment = %report.segment, "Duplicate segment file name, skipping");
                    report.fail(SegmentState::FetchFailed, "duplicate segment file name");
                    continue;
                }
            }
            report.state = SegmentState::Fetching;

            let fetcher = fetcher.clone();
            let semaphore = semaphore.clone();
            let cancel = self.cancel.clone();
            let segment = report.segment.clone();
            let dest = raw_dir.to_path_buf();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };
                if cancel.load(Ordering::SeqCst) {
                    return (index, None);
                }
                (index, Some(fetcher.fetch(&segment, &dest, max_bytes).await))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Fetch task aborted");
                    continue;
                }
            };
            let report = &mut reports[index];
            match outcome {
                None => report.state = SegmentState::Cancelled,
                Some(Ok(fetched)) => {
                    report.state = SegmentState::Fetched;
                    report.bytes_downloaded = fetched.bytes_written;
                    report.local_path = Some(fetched.path);
                }
                Some(Err(e)) => {
                    warn!(segment = %report.segment, error = %e, "Segment fetch failed, skipping");
                    report.fail(SegmentState::FetchFailed, e);
                }
            }
        }

        for report in reports.iter_mut().filter(|r| r.state == SegmentState::Fetching) {
            report.fail(SegmentState::FetchFailed, "fetch task aborted");
        }
    }

    /// Process every fetched segment on blocking workers
    async fn process_all(
        &self,
        reports: &mut [SegmentReport],
        processor: Arc<SegmentProcessor>,
        extracted_dir: &Path,
        keep_raw: bool,
    ) -> Result<(), PipelineError> {
        let writer = OutputWriter::start()?;
        let semaphore = Arc::new(Semaphore::new(
            self.config.pipeline.worker_count(reports.len()),
        ));
        let mut tasks: JoinSet<(usize, ProcessOutcome)> = JoinSet::new();
        let mut taken = HashSet::new();

        for (index, report) in reports.iter_mut().enumerate() {
            if report.state != SegmentState::Fetched {
                continue;
            }
            let Some(input) = report.local_path.clone() else {
                continue;
            };
            if self.is_cancelled() {
                report.state = SegmentState::Cancelled;
                continue;
            }

            let output_name = report
                .segment
                .output_file_name()
                .unwrap_or_else(|| format!("segment-{}.jsonl", index));
            let output_path = extracted_dir.join(unique_output_name(&output_name, &mut taken));
            report.output_path = Some(output_path.clone());
            report.state = SegmentState::Processing;

            let processor = processor.clone();
            let handle = writer.handle();
            let semaphore = semaphore.clone();
            let cancel = self.cancel.clone();
            tasks.spawn(async move {
                let Ok(permit) = semaphore.acquire_owned().await else {
                    return (index, ProcessOutcome::Cancelled);
                };
                if cancel.load(Ordering::SeqCst) {
                    return (index, ProcessOutcome::Cancelled);
                }
                let joined = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    process_segment(&processor, &handle, &input, &output_path, keep_raw)
                })
                .await;
                match joined {
                    Ok(result) => (index, ProcessOutcome::Done(result)),
                    Err(e) => (index, ProcessOutcome::Aborted(e.to_string())),
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Processing task aborted");
                    continue;
                }
            };
            let report = &mut reports[index];
            match outcome {
                ProcessOutcome::Done(Ok(stats)) => {
                    let empty = stats.records_seen == 0;
                    report.stats = stats;
                    if empty {
                        warn!(segment = %report.segment, "No records in segment");
                        report.fail(SegmentState::Failed, "no records in segment");
                    } else {
                        report.state = SegmentState::Processed;
                    }
                }
                ProcessOutcome::Done(Err(e)) => {
                    warn!(segment = %report.segment, error = %e, "Segment processing failed");
                    report.fail(SegmentState::Failed, e);
                }
                ProcessOutcome::Cancelled => report.state = SegmentState::Cancelled,
                ProcessOutcome::Aborted(e) => report.fail(SegmentState::Failed, e),
            }
        }

        for report in reports
            .iter_mut()
            .filter(|r| r.state == SegmentState::Processing)
        {
            report.fail(SegmentState::Failed, "processing task aborted");
        }

        match tokio::task::spawn_blocking(move || writer.finish()).await {
            Ok(written) => debug!(
                files = written.files,
                lines = written.lines,
                failed = written.failed_files,
                "Output writer finished"
            ),
            Err(e) => warn!(error = %e, "Output writer did not shut down cleanly"),
        }
        Ok(())
    }

    async fn summarize(
        &self,
        crawl_id: Option<String>,
        segments: Vec<SegmentReport>,
        workspace: Workspace,
        started: Instant,
    ) -> RunSummary {
        let mut disk_bytes = 0;
        for report in &segments {
            for path in [&report.local_path, &report.output_path].into_iter().flatten() {
                if let Ok(meta) = tokio::fs::metadata(path).await {
                    disk_bytes += meta.len();
                }
            }
        }

        RunSummary {
            crawl_id,
            cancelled: self.is_cancelled(),
            segments,
            raw_dir: workspace.raw_dir,
            extracted_dir: workspace.extracted_dir,
            disk_bytes,
            elapsed: started.elapsed(),
        }
    }
}

/// Claim `name` in `taken`, appending `-1`, `-2`, ... to its stem while it is
/// already claimed by another segment of the same run
fn unique_output_name(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match extension {
            Some(extension) => format!("{}-{}.{}", stem, n, extension),
            None => format!("{}-{}", name, n),
        })
        .find(|candidate| taken.insert(candidate.clone()))
        .unwrap_or_else(|| name.to_string())
}

/// Blocking body of one processing task
fn process_segment(
    processor: &SegmentProcessor,
    output: &OutputHandle,
    input: &Path,
    output_path: &Path,
    keep_raw: bool,
) -> Result<SegmentStats, PipelineError> {
    // Created up front so a segment with no retained documents still has a file
    let mut sink = output.open(output_path)?;
    let processed = processor.process(input, &mut sink);
    let closed = sink.close();
    let stats = processed?;
    closed?;

    if !keep_raw {
        match std::fs::remove_file(input) {
            Ok(()) => debug!(path = %input.display(), "Removed raw segment"),
            Err(e) => warn!(path = %input.display(), error = %e, "Failed to remove raw segment"),
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::JsonlFile;
    use std::io::Write;
    use tempfile::TempDir;

    fn response(uri: &str, headers: &str, body: &[u8]) -> Vec<u8> {
        let mut block = format!("HTTP/1.1 200 OK\r\n{}\r\n", headers).into_bytes();
        block.extend_from_slice(body);

        let mut out = format!(
            "WARC/1.0\r\n\
             WARC-Type: response\r\n\
             WARC-Record-ID: <urn:uuid:{:x}>\r\n\
             WARC-Date: 2024-02-21T10:00:00Z\r\n\
             WARC-Target-URI: {}\r\n\
             Content-Length: {}\r\n\r\n",
            md5::compute(uri),
            uri,
            block.len()
        )
        .into_bytes();
        out.extend_from_slice(&block);
        out.extend_from_slice(b"\r\n\r\n");
        out
    }

    fn page(text: &str) -> Vec<u8> {
        format!("<html><body><p>{}</p></body></html>", text).into_bytes()
    }

    fn processor(mode: FilterMode, max_records: usize) -> SegmentProcessor {
        let mut config = Config::default();
        config.filter.mode = mode;
        config.filter.min_text_chars = 10;
        config.pipeline.max_records_per_segment = max_records;
        SegmentProcessor::from_config(&config).unwrap()
    }

    fn segment_file(dir: &TempDir, records: &[Vec<u8>]) -> PathBuf {
        let path = dir.path().join("seg.warc");
        let mut file = std::fs::File::create(&path).unwrap();
        for record in records {
            file.write_all(record).unwrap();
        }
        path
    }

    #[test]
    fn test_processes_chunked_and_gzipped_bodies() {
        let dir = TempDir::new().unwrap();

        let body = page("Equal pay and gender balance in tech");
        let mut chunked = format!("{:x}\r\n", body.len()).into_bytes();
        chunked.extend_from_slice(&body);
        chunked.extend_from_slice(b"\r\n0\r\n\r\n");

        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        gz.write_all(&page("A survey of religion in public life")).unwrap();
        let gzipped = gz.finish().unwrap();

        let path = segment_file(
            &dir,
            &[
                response(
                    "https://a.example/",
                    "Content-Type: text/html\r\nTransfer-Encoding: chunked\r\n",
                    &chunked,
                ),
                response(
                    "https://b.example/",
                    "Content-Type: text/html\r\nContent-Encoding: gzip\r\n",
                    &gzipped,
                ),
                response(
                    "https://c.example/",
                    "Content-Type: text/html\r\nContent-Encoding: br\r\n",
                    b"\x0b\x02\x80",
                ),
            ],
        );

        let mut sink = JsonlFile::new(Vec::new(), "memory");
        let stats = processor(FilterMode::Bias, 100)
            .process(&path, &mut sink)
            .unwrap();

        assert_eq!(stats.records_seen, 3);
        assert_eq!(stats.html_records, 3);
        assert_eq!(stats.body_errors, 1);
        assert_eq!(stats.documents_saved, 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let urls: Vec<String> = output
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["url"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(urls, vec!["https://a.example/", "https://b.example/"]);
    }

    #[test]
    fn test_short_texts_dropped_in_every_mode() {
        let dir = TempDir::new().unwrap();
        let path = segment_file(
            &dir,
            &[
                response("https://a.example/", "Content-Type: text/html\r\n", &page("bias")),
                response("https://b.example/", "Content-Type: TEXT/HTML; charset=utf-8\r\n", &page("a longer page about cooking")),
            ],
        );

        let mut sink = JsonlFile::new(Vec::new(), "memory");
        let stats = processor(FilterMode::All, 100).process(&path, &mut sink).unwrap();
        assert_eq!(stats.filtered_out, 1);
        assert_eq!(stats.documents_saved, 1);
    }

    #[test]
    fn test_output_names_are_unique_within_a_run() {
        let mut taken = HashSet::new();
        assert_eq!(unique_output_name("seg.jsonl", &mut taken), "seg.jsonl");
        assert_eq!(unique_output_name("seg.jsonl", &mut taken), "seg-1.jsonl");
        assert_eq!(unique_output_name("seg.jsonl", &mut taken), "seg-2.jsonl");
        assert_eq!(unique_output_name("other.jsonl", &mut taken), "other.jsonl");

        // A real file already named like a suffixed duplicate is skipped over
        assert_eq!(unique_output_name("a-1.jsonl", &mut taken), "a-1.jsonl");
        assert_eq!(unique_output_name("a.jsonl", &mut taken), "a.jsonl");
        assert_eq!(unique_output_name("a.jsonl", &mut taken), "a-2.jsonl");

        assert_eq!(unique_output_name("noext", &mut taken), "noext");
        assert_eq!(unique_output_name("noext", &mut taken), "noext-1");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut sink = JsonlFile::new(Vec::new(), "memory");
        let result = processor(FilterMode::All, 10).process(&dir.path().join("none.warc"), &mut sink);
        assert!(matches!(result, Err(PipelineError::Container(_))));
    }
}
