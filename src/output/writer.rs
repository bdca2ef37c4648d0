//! Single-writer output actor
//!
//! Every output file is owned by one writer thread. Segment workers open a
//! stream, send complete lines over a bounded channel and close the stream
//! when the segment is done, so lines from different workers never
//! interleave within a line.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::emitter::{EmitError, JsonlFile, LineSink};

/// Queue depth between workers and the writer
const CHANNEL_CAPACITY: usize = 1024;

type StreamId = u64;

/// Messages handled by the writer
enum OutputItem {
    Open {
        stream: StreamId,
        path: PathBuf,
        respond_to: oneshot::Sender<Result<(), EmitError>>,
    },
    Line {
        stream: StreamId,
        line: String,
    },
    Close {
        stream: StreamId,
        respond_to: Option<oneshot::Sender<Result<StreamReport, EmitError>>>,
    },
}

/// Result of one closed output stream
#[derive(Debug, Clone)]
pub struct StreamReport {
    pub path: PathBuf,
    pub lines: usize,
    pub bytes: u64,
}

/// Totals over the writer's lifetime
#[derive(Debug, Clone, Default)]
pub struct WriterReport {
    pub files: usize,
    pub lines: usize,
    pub bytes: u64,
    pub failed_files: usize,
}

struct OpenStream {
    file: JsonlFile<BufWriter<File>>,
    error: Option<EmitError>,
}

impl OpenStream {
    fn finish(self) -> Result<StreamReport, EmitError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(StreamReport {
            path: self.file.path().to_path_buf(),
            lines: self.file.lines(),
            bytes: self.file.bytes(),
        })
    }
}

/// Owner of the writer thread
pub struct OutputWriter {
    handle: OutputHandle,
    thread: JoinHandle<WriterReport>,
}

impl OutputWriter {
    /// Spawn the writer thread
    pub fn start() -> Result<Self, EmitError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let thread = std::thread::Builder::new()
            .name("ccsample-writer".to_string())
            .spawn(move || run(rx))
            .map_err(|source| EmitError::Io {
                path: PathBuf::from("<writer thread>"),
                source,
            })?;

        Ok(Self {
            handle: OutputHandle {
                tx,
                next_stream: Arc::new(AtomicU64::new(0)),
            },
            thread,
        })
    }

    /// Cloneable handle for workers
    pub fn handle(&self) -> OutputHandle {
        self.handle.clone()
    }

    /// Stop accepting work and wait for every line to be written.
    ///
    /// Blocks until the writer thread exits; call from a blocking context.
    pub fn finish(self) -> WriterReport {
        drop(self.handle);
        match self.thread.join() {
            Ok(report) => report,
            Err(_) => {
                warn!("Output writer thread panicked");
                WriterReport::default()
            }
        }
    }
}

/// Sender side shared by segment workers
#[derive(Clone)]
pub struct OutputHandle {
    tx: mpsc::Sender<OutputItem>,
    next_stream: Arc<AtomicU64>,
}

impl OutputHandle {
    /// Create an output file and return a sink writing to it.
    ///
    /// Blocks until the file exists; call from a blocking context.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<ChannelSink, EmitError> {
        let stream = self.next_stream.fetch_add(1, Ordering::Relaxed);
        let (respond_to, response) = oneshot::channel();
        self.tx
            .blocking_send(OutputItem::Open {
                stream,
                path: path.as_ref().to_path_buf(),
                respond_to,
            })
            .map_err(|_| EmitError::Closed)?;
        response.blocking_recv().map_err(|_| EmitError::Closed)??;

        Ok(ChannelSink {
            stream,
            tx: self.tx.clone(),
            sent: 0,
            closed: false,
        })
    }
}

/// [`LineSink`] forwarding lines to the writer thread
pub struct ChannelSink {
    stream: StreamId,
    tx: mpsc::Sender<OutputItem>,
    sent: usize,
    closed: bool,
}

impl ChannelSink {
    /// Lines handed to the writer so far
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Flush and close the file, returning what was written
    pub fn close(mut self) -> Result<StreamReport, EmitError> {
        self.closed = true;
        let (respond_to, response) = oneshot::channel();
        self.tx
            .blocking_send(OutputItem::Close {
                stream: self.stream,
                respond_to: Some(respond_to),
            })
            .map_err(|_| EmitError::Closed)?;
        response.blocking_recv().map_err(|_| EmitError::Closed)?
    }
}

impl LineSink for ChannelSink {
    fn write_line(&mut self, line: &str) -> Result<(), EmitError> {
        self.tx
            .blocking_send(OutputItem::Line {
                stream: self.stream,
                line: line.to_string(),
            })
            .map_err(|_| EmitError::Closed)?;
        self.sent += 1;
        Ok(())
    }
}

impl Drop for ChannelSink {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.tx.try_send(OutputItem::Close {
                stream: self.stream,
                respond_to: None,
            });
        }
    }
}

fn run(mut rx: mpsc::Receiver<OutputItem>) -> WriterReport {
    debug!("Output writer started");
    let mut streams: HashMap<StreamId, OpenStream> = HashMap::new();
    let mut report = WriterReport::default();

    while let Some(item) = rx.blocking_recv() {
        match item {
            OutputItem::Open {
                stream,
                path,
                respond_to,
            } => {
                let result = JsonlFile::create(&path).map(|file| {
                    streams.insert(stream, OpenStream { file, error: None });
                });
                let _ = respond_to.send(result);
            }
            OutputItem::Line { stream, line } => {
                let Some(open) = streams.get_mut(&stream) else {
                    warn!(stream, "Line for unknown output stream dropped");
                    continue;
                };
                if open.error.is_some() {
                    continue;
                }
                if let Err(e) = open.file.write_line(&line) {
                    warn!(path = %open.file.path().display(), error = %e, "Output write failed");
                    open.error = Some(e);
                }
            }
            OutputItem::Close { stream, respond_to } => {
                if let Some(open) = streams.remove(&stream) {
                    let result = open.finish();
                    tally(&mut report, &result);
                    if let Some(respond_to) = respond_to {
                        let _ = respond_to.send(result);
                    }
                }
            }
        }
    }

    for (_, open) in streams.drain() {
        let result = open.finish();
        tally(&mut report, &result);
    }

    info!(
        files = report.files,
        lines = report.lines,
        failed = report.failed_files,
        "Output writer stopped"
    );
    report
}

fn tally(report: &mut WriterReport, result: &Result<StreamReport, EmitError>) {
    match result {
        Ok(stream) => {
            report.files += 1;
            report.lines += stream.lines;
            report.bytes += stream.bytes;
        }
        Err(_) => report.failed_files += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_streams_write_whole_lines() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::start().unwrap();

        let workers: Vec<_> = (0..4)
            .map(|w| {
                let handle = writer.handle();
                let path = dir.path().join(format!("w{}.jsonl", w));
                std::thread::spawn(move || {
                    let mut sink = handle.open(&path).unwrap();
                    for i in 0..50 {
                        sink.write_line(&format!("{{\"worker\":{},\"i\":{}}}", w, i)).unwrap();
                    }
                    sink.close().unwrap()
                })
            })
            .collect();

        let reports: Vec<StreamReport> = workers.into_iter().map(|t| t.join().unwrap()).collect();
        let total = writer.finish();

        assert_eq!(total.files, 4);
        assert_eq!(total.lines, 200);
        for report in reports {
            assert_eq!(report.lines, 50);
            let content = std::fs::read_to_string(&report.path).unwrap();
            for line in content.lines() {
                serde_json::from_str::<serde_json::Value>(line).unwrap();
            }
        }
    }

    #[test]
    fn test_empty_stream_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.jsonl");
        let writer = OutputWriter::start().unwrap();

        let sink = writer.handle().open(&path).unwrap();
        let report = sink.close().unwrap();
        assert_eq!(report.lines, 0);
        assert!(path.exists());
        assert_eq!(writer.finish().files, 1);
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let writer = OutputWriter::start().unwrap();
        let result = writer.handle().open(dir.path().join("missing/out.jsonl"));
        assert!(matches!(result, Err(EmitError::Io { .. })));
        writer.finish();
    }

    #[test]
    fn test_dropped_sink_is_flushed_at_finish() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dropped.jsonl");
        let writer = OutputWriter::start().unwrap();
        {
            let mut sink = writer.handle().open(&path).unwrap();
            sink.write_line("{\"a\":1}").unwrap();
        }
        let report = writer.finish();
        assert_eq!(report.lines, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":1}\n");
    }
}
