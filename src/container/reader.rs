//! Record iteration over local segment files

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use warc::{BufferedBody, Record, WarcHeader, WarcReader};

use super::http::HttpResponse;
use super::ContainerError;

/// Read buffer for segment files
const READ_BUFFER: usize = 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

type RecordStream = Box<dyn Iterator<Item = Result<Record<BufferedBody>, warc::Error>>>;

/// One WARC record with its payload in memory
pub struct ContainerRecord {
    record: Record<BufferedBody>,
}

/// An in-scope record: an HTML HTTP response and the URI it was fetched from
#[derive(Debug)]
pub struct HtmlResponse<'a> {
    pub url: String,
    pub http: HttpResponse<'a>,
}

impl ContainerRecord {
    /// Value of the `WARC-Type` header
    pub fn record_type(&self) -> Option<String> {
        self.record.header(WarcHeader::WarcType).map(|t| t.trim().to_string())
    }

    pub fn is_response(&self) -> bool {
        self.record
            .header(WarcHeader::WarcType)
            .map(|t| t.trim().eq_ignore_ascii_case("response"))
            .unwrap_or(false)
    }

    /// Value of the `WARC-Target-URI` header
    pub fn target_uri(&self) -> Option<String> {
        self.record
            .header(WarcHeader::TargetURI)
            .map(|uri| uri.trim().to_string())
            .filter(|uri| !uri.is_empty())
    }

    /// Record block (for responses: the HTTP message)
    pub fn payload(&self) -> &[u8] {
        self.record.body()
    }

    /// The embedded HTML response, if this record is in scope.
    ///
    /// In scope means: a `response` record whose payload parses as an HTTP
    /// response declaring a `text/html` content type, with a target URI.
    pub fn html_response(&self) -> Option<HtmlResponse<'_>> {
        if !self.is_response() {
            return None;
        }
        let http = HttpResponse::parse(self.payload())?;
        if !http.is_html() {
            return None;
        }
        let url = self.target_uri()?;
        Some(HtmlResponse { url, http })
    }
}

/// Lazily iterates the records of one local segment file.
///
/// Plain and gzip-compressed (multi-member) files are both accepted. A
/// malformed or truncated record ends iteration; everything yielded before
/// it stays valid and the cause is kept in [`ContainerReader::stop_error`].
pub struct ContainerReader {
    path: PathBuf,
    records: RecordStream,
    records_read: usize,
    stop_error: Option<ContainerError>,
    finished: bool,
}

impl ContainerReader {
    /// Open a segment file, detecting gzip by its magic bytes
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| ContainerError::Open {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(open_err)?;
        let mut buffered = BufReader::with_capacity(READ_BUFFER, file);
        let is_gzip = buffered.fill_buf().map_err(open_err)?.starts_with(&GZIP_MAGIC);

        let input: Box<dyn BufRead> = if is_gzip {
            Box::new(BufReader::with_capacity(READ_BUFFER, MultiGzDecoder::new(buffered)))
        } else {
            Box::new(buffered)
        };

        debug!(path = %path.display(), gzip = is_gzip, "Opened segment file");

        Ok(Self {
            path,
            records: Box::new(WarcReader::new(input).iter_records()),
            records_read: 0,
            stop_error: None,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records yielded so far
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Why iteration stopped early, if it did
    pub fn stop_error(&self) -> Option<&ContainerError> {
        self.stop_error.as_ref()
    }
}

impl Iterator for ContainerReader {
    type Item = ContainerRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.records.next() {
            Some(Ok(record)) => {
                self.records_read += 1;
                Some(ContainerRecord { record })
            }
            Some(Err(err)) => {
                warn!(
                    path = %self.path.display(),
                    records = self.records_read,
                    error = %err,
                    "Stopping at malformed record"
                );
                self.stop_error = Some(ContainerError::Malformed {
                    records: self.records_read,
                    message: err.to_string(),
                });
                self.finished = true;
                None
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}
