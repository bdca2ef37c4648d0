//! HTTP response messages embedded in WARC `response` records

use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use std::borrow::Cow;
use std::io::Read;

use super::ContainerError;

/// Upper bound on an inflated body; larger bodies are cut here
const MAX_DECODED_BODY: u64 = 32 * 1024 * 1024;

/// A parsed HTTP response: status, headers and the raw (undecoded) body
#[derive(Debug, Clone)]
pub struct HttpResponse<'a> {
    pub status: u16,
    headers: Vec<(String, String)>,
    body: &'a [u8],
}

impl<'a> HttpResponse<'a> {
    /// Parse a response message. `None` if the payload does not start with
    /// an HTTP status line followed by a complete header block.
    pub fn parse(payload: &'a [u8]) -> Option<Self> {
        if !payload.starts_with(b"HTTP/") {
            return None;
        }
        let (head_len, sep_len) = find_header_end(payload)?;
        let head = String::from_utf8_lossy(&payload[..head_len]);
        let mut lines = head.lines();

        let status = lines
            .next()?
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse::<u16>().ok())?;

        let headers = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();

        Some(Self {
            status,
            headers,
            body: &payload[head_len + sep_len..],
        })
    }

    /// Case-insensitive header lookup (first occurrence)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Whether the declared content type begins with `text/html`
    pub fn is_html(&self) -> bool {
        self.content_type()
            .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"))
            .unwrap_or(false)
    }

    /// Body bytes as transmitted
    pub fn raw_body(&self) -> &'a [u8] {
        self.body
    }

    /// Body with transfer and content encodings removed
    pub fn decoded_body(&self) -> Result<Cow<'a, [u8]>, ContainerError> {
        let mut body: Cow<'a, [u8]> = Cow::Borrowed(self.body);

        if self
            .header("transfer-encoding")
            .map(|te| te.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
        {
            body = Cow::Owned(dechunk(&body)?);
        }

        match self
            .header("content-encoding")
            .map(|ce| ce.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("") | Some("identity") => Ok(body),
            Some("gzip") | Some("x-gzip") => inflate(MultiGzDecoder::new(&body[..]), "gzip").map(Cow::Owned),
            Some("deflate") => {
                // Servers send both zlib-wrapped and raw deflate under this name
                inflate(ZlibDecoder::new(&body[..]), "deflate")
                    .or_else(|_| inflate(DeflateDecoder::new(&body[..]), "deflate"))
                    .map(Cow::Owned)
            }
            Some(other) => Err(ContainerError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Offset of the blank line ending the header block and its length
fn find_header_end(payload: &[u8]) -> Option<(usize, usize)> {
    let crlf = payload.windows(4).position(|w| w == b"\r\n\r\n");
    let lf = payload.windows(2).position(|w| w == b"\n\n");
    match (crlf, lf) {
        (Some(c), Some(l)) if l < c => Some((l, 2)),
        (Some(c), _) => Some((c, 4)),
        (None, Some(l)) => Some((l, 2)),
        (None, None) => None,
    }
}

fn inflate<R: Read>(decoder: R, encoding: &'static str) -> Result<Vec<u8>, ContainerError> {
    let mut out = Vec::new();
    decoder
        .take(MAX_DECODED_BODY)
        .read_to_end(&mut out)
        .map_err(|source| ContainerError::Inflate { encoding, source })?;
    Ok(out)
}

/// Reassemble a `Transfer-Encoding: chunked` body
fn dechunk(mut input: &[u8]) -> Result<Vec<u8>, ContainerError> {
    let mut out = Vec::with_capacity(input.len());
    loop {
        let line_end = input
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or_else(|| ContainerError::Chunked("missing chunk size line".to_string()))?;
        let size_line = String::from_utf8_lossy(&input[..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| ContainerError::Chunked(format!("invalid chunk size '{}'", size_hex)))?;
        input = &input[line_end + 2..];

        if size == 0 {
            // Trailers, if any, are ignored
            return Ok(out);
        }
        if input.len() < size {
            return Err(ContainerError::Chunked(format!(
                "chunk of {} bytes truncated at {}",
                size,
                input.len()
            )));
        }
        out.extend_from_slice(&input[..size]);
        input = &input[size..];
        input = input.strip_prefix(b"\r\n").unwrap_or(input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    fn response(headers: &str, body: &[u8]) -> Vec<u8> {
        let mut payload = format!("HTTP/1.1 200 OK\r\n{}\r\n", headers).into_bytes();
        payload.extend_from_slice(body);
        payload
    }

    #[test]
    fn test_parse_status_and_headers() {
        let payload = response("Content-Type: text/html; charset=utf-8\r\nX-Test: a:b\r\n", b"<p>hi</p>");
        let http = HttpResponse::parse(&payload).unwrap();
        assert_eq!(http.status, 200);
        assert_eq!(http.header("CONTENT-TYPE"), Some("text/html; charset=utf-8"));
        assert_eq!(http.header("x-test"), Some("a:b"));
        assert_eq!(http.raw_body(), b"<p>hi</p>");
        assert!(http.is_html());
    }

    #[test]
    fn test_bare_lf_header_block() {
        let payload = b"HTTP/1.0 404 Not Found\nContent-Type: TEXT/HTML\n\nbody";
        let http = HttpResponse::parse(payload).unwrap();
        assert_eq!(http.status, 404);
        assert!(http.is_html());
        assert_eq!(http.raw_body(), b"body");
    }

    #[test]
    fn test_not_http() {
        assert!(HttpResponse::parse(b"GET / HTTP/1.1\r\n\r\n").is_none());
        assert!(HttpResponse::parse(b"HTTP/1.1 200 OK\r\nContent-Type: text/html").is_none());
        assert!(HttpResponse::parse(b"").is_none());
    }

    #[test]
    fn test_non_html_content_type() {
        let payload = response("Content-Type: application/json\r\n", b"{}");
        assert!(!HttpResponse::parse(&payload).unwrap().is_html());
        let payload = response("Server: x\r\n", b"{}");
        assert!(!HttpResponse::parse(&payload).unwrap().is_html());
    }

    #[test]
    fn test_dechunk() {
        let payload = response(
            "Transfer-Encoding: chunked\r\n",
            b"5\r\nhello\r\n7;ext=1\r\n, world\r\n0\r\n\r\n",
        );
        let http = HttpResponse::parse(&payload).unwrap();
        assert_eq!(&*http.decoded_body().unwrap(), b"hello, world");
    }

    #[test]
    fn test_truncated_chunk_is_an_error() {
        let payload = response("Transfer-Encoding: chunked\r\n", b"a\r\nshort");
        let http = HttpResponse::parse(&payload).unwrap();
        assert!(matches!(http.decoded_body(), Err(ContainerError::Chunked(_))));
    }

    #[test]
    fn test_gzip_content_encoding() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<p>compressed</p>").unwrap();
        let payload = response("Content-Encoding: gzip\r\n", &encoder.finish().unwrap());
        let http = HttpResponse::parse(&payload).unwrap();
        assert_eq!(&*http.decoded_body().unwrap(), b"<p>compressed</p>");
    }

    #[test]
    fn test_deflate_content_encoding() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"zlib body").unwrap();
        let payload = response("Content-Encoding: deflate\r\n", &encoder.finish().unwrap());
        let http = HttpResponse::parse(&payload).unwrap();
        assert_eq!(&*http.decoded_body().unwrap(), b"zlib body");
    }

    #[test]
    fn test_unsupported_encoding() {
        let payload = response("Content-Encoding: br\r\n", b"??");
        let http = HttpResponse::parse(&payload).unwrap();
        assert!(matches!(
            http.decoded_body(),
            Err(ContainerError::UnsupportedEncoding(enc)) if enc == "br"
        ));
    }

    #[test]
    fn test_identity_body_is_borrowed() {
        let payload = response("Content-Type: text/html\r\n", b"plain");
        let http = HttpResponse::parse(&payload).unwrap();
        assert!(matches!(http.decoded_body().unwrap(), Cow::Borrowed(b"plain")));
    }
}
