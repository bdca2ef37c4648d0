//! Document serialization to JSON lines

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::ExtractedDocument;

/// Output errors
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output writer has shut down")]
    Closed,
}

/// Destination for complete output lines.
///
/// Implementations must write each line in full or not at all, so that a
/// partial line never reaches the file.
pub trait LineSink {
    /// Append `line` (without trailing newline)
    fn write_line(&mut self, line: &str) -> Result<(), EmitError>;
}

/// JSONL file (or any writer) receiving one atomic write plus flush per line
pub struct JsonlFile<W: Write> {
    writer: W,
    path: PathBuf,
    lines: usize,
    bytes: u64,
}

impl JsonlFile<BufWriter<File>> {
    /// Create (or truncate) a file
    pub fn create(path: impl AsRef<Path>) -> Result<Self, EmitError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| EmitError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file), path))
    }
}

impl<W: Write> JsonlFile<W> {
    pub fn new(writer: W, path: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            path: path.into(),
            lines: 0,
            bytes: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written so far
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn io_err(&self, source: std::io::Error) -> EmitError {
        EmitError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl<W: Write> LineSink for JsonlFile<W> {
    fn write_line(&mut self, line: &str) -> Result<(), EmitError> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        self.writer
            .write_all(buf.as_bytes())
            .map_err(|e| self.io_err(e))?;
        self.writer.flush().map_err(|e| self.io_err(e))?;

        self.lines += 1;
        self.bytes += buf.len() as u64;
        Ok(())
    }
}

/// Builds [`ExtractedDocument`]s and writes them as single JSON lines
#[derive(Debug, Clone)]
pub struct RecordEmitter {
    max_text_chars: usize,
}

impl RecordEmitter {
    pub fn new(max_text_chars: usize) -> Self {
        Self { max_text_chars }
    }

    /// Hash the URL, cap the text and write one line to `sink`
    pub fn emit<S: LineSink + ?Sized>(
        &self,
        url: &str,
        domain: &str,
        text: &str,
        sink: &mut S,
    ) -> Result<ExtractedDocument, EmitError> {
        let document = ExtractedDocument::new(url, domain, text, self.max_text_chars);
        let line = serde_json::to_string(&document)?;
        sink.write_line(&line)?;
        Ok(document)
    }
}

impl Default for RecordEmitter {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemorySink {
        lines: Vec<String>,
    }

    impl LineSink for MemorySink {
        fn write_line(&mut self, line: &str) -> Result<(), EmitError> {
            self.lines.push(line.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_emit_schema_and_id() {
        let mut sink = MemorySink::default();
        let doc = RecordEmitter::default()
            .emit("https://example.com/a", "example.com", "some text", &mut sink)
            .unwrap();

        assert_eq!(sink.lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&sink.lines[0]).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(value["url"], "https://example.com/a");
        assert_eq!(value["domain"], "example.com");
        assert_eq!(value["id"], doc.id.as_str());
        assert_eq!(value["text"], "some text");
        assert!(!sink.lines[0].contains('\n'));
    }

    #[test]
    fn test_emit_twice_same_id() {
        let mut sink = MemorySink::default();
        let emitter = RecordEmitter::default();
        let a = emitter.emit("https://x.org/", "x.org", "one", &mut sink).unwrap();
        let b = emitter.emit("https://x.org/", "x.org", "two", &mut sink).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_emit_truncates_to_limit() {
        let mut sink = MemorySink::default();
        let text = "ß".repeat(15_000);
        let doc = RecordEmitter::default()
            .emit("https://x.org/", "x.org", &text, &mut sink)
            .unwrap();
        assert_eq!(doc.text.chars().count(), 10_000);

        let value: serde_json::Value = serde_json::from_str(&sink.lines[0]).unwrap();
        assert_eq!(value["text"].as_str().unwrap().chars().count(), 10_000);
    }

    #[test]
    fn test_text_with_newlines_stays_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jsonl");
        let mut file = JsonlFile::create(&path).unwrap();
        let emitter = RecordEmitter::new(100);
        emitter.emit("https://a/", "a", "line one\nline two", &mut file).unwrap();
        emitter.emit("https://b/", "b", "\"quoted\"", &mut file).unwrap();
        assert_eq!(file.lines(), 2);
        drop(file);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<ExtractedDocument>(line).unwrap();
        }
    }

    #[test]
    fn test_jsonl_file_flushes_each_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flush.jsonl");
        let mut file = JsonlFile::create(&path).unwrap();
        file.write_line("{}").unwrap();
        // Visible on disk before the writer is dropped
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
        assert_eq!(file.bytes(), 3);
    }
}
