//! Shared fixtures: WARC builders and an in-process archive server

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use ccsample::config::{Config, RetryConfig};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub const CRAWL_ID: &str = "CC-MAIN-2024-10";

/// One WARC record with a correct Content-Length
pub fn warc_record(warc_type: &str, uri: &str, block: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "WARC/1.0\r\n\
         WARC-Type: {}\r\n\
         WARC-Record-ID: <urn:uuid:{:x}>\r\n\
         WARC-Date: 2024-02-21T10:00:00Z\r\n\
         WARC-Target-URI: {}\r\n\
         Content-Type: application/http; msgtype={}\r\n\
         Content-Length: {}\r\n\r\n",
        warc_type,
        md5::compute(format!("{}{}", warc_type, uri)),
        uri,
        warc_type,
        block.len()
    )
    .into_bytes();
    out.extend_from_slice(block);
    out.extend_from_slice(b"\r\n\r\n");
    out
}

/// HTTP response block with the given content type and raw body
pub fn http_block(content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        content_type,
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// HTML page whose paragraph is long enough to pass the length filter
pub fn html_page(title: &str, paragraph: &str) -> String {
    format!(
        "<html><head><title>{}</title><script>var tracking = 1;</script></head>\
         <body><nav>Home | About</nav><p>{}</p><footer>Copyright</footer></body></html>",
        title,
        paragraph
    )
}

pub fn long_paragraph(topic: &str) -> String {
    format!(
        "This article looks at {} in some depth. It is written at length so that \
         the extracted text is comfortably longer than the minimum document size.",
        topic
    )
}

/// Gzip each record as its own member, the way segments are stored
pub fn gzip_members(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        out.extend(gzip(record));
    }
    out
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// A file the mock archive serves
pub struct Served {
    body: Vec<u8>,
    /// Send without Content-Length
    streamed: bool,
    /// Remaining requests answered with 503
    failures: AtomicU32,
}

impl Served {
    pub fn bytes(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            streamed: false,
            failures: AtomicU32::new(0),
        }
    }

    pub fn streamed(body: impl Into<Vec<u8>>) -> Self {
        Self {
            streamed: true,
            ..Self::bytes(body)
        }
    }

    pub fn failing_first(mut self, failures: u32) -> Self {
        self.failures = AtomicU32::new(failures);
        self
    }
}

/// Builder for the files of a mock archive
#[derive(Default)]
pub struct MockArchive {
    files: HashMap<String, Served>,
}

impl MockArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, served: Served) -> Self {
        self.files.insert(path.to_string(), served);
        self
    }

    /// Index page listing `ids`, newest first
    pub fn with_index(self, ids: &[&str]) -> Self {
        let links: String = ids
            .iter()
            .map(|id| format!("<li><a href=\"/{id}-index\">{id}</a></li>", id = id))
            .collect();
        let page = format!("<html><body><ul>{}</ul></body></html>", links);
        self.with("/index/", Served::bytes(page))
    }

    /// Gzip manifest for `crawl_id`
    pub fn with_manifest(self, crawl_id: &str, paths: &[&str]) -> Self {
        let manifest = format!("{}\n", paths.join("\n"));
        self.with(
            &format!("/crawl-data/{}/warc.paths.gz", crawl_id),
            Served::bytes(gzip(manifest.as_bytes())),
        )
    }

    /// Start serving on an ephemeral port and return the base URL
    pub async fn start(self) -> String {
        let app = Router::new()
            .fallback(serve)
            .with_state(Arc::new(self.files));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

async fn serve(State(files): State<Arc<HashMap<String, Served>>>, uri: Uri) -> Response {
    let Some(served) = files.get(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let failing = served
        .failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    if served.streamed {
        let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
            served.body.chunks(1024).map(|c| Ok(c.to_vec())).collect();
        Body::from_stream(futures::stream::iter(chunks)).into_response()
    } else {
        served.body.clone().into_response()
    }
}

/// Config pointing at a mock archive, writing under `output`
pub fn test_config(base_url: &str, output: &Path) -> Config {
    let mut config = Config::default();
    config.archive.index_url = format!("{}/index/", base_url);
    config.archive.data_base_url = format!("{}/", base_url);
    config.fetch.retry = RetryConfig {
        max_attempts: 3,
        initial_delay_ms: 10,
        max_delay_ms: 20,
    };
    config.fetch.request_timeout_secs = 10;
    config.pipeline.output_dir = output.to_path_buf();
    config.pipeline.quiet = true;
    config
}

/// Parse every line of a JSONL file
pub fn read_jsonl(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}
