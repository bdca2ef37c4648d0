//! Core types shared across the sampling pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::truncate_chars;

// ============================================================================
// Segment References
// ============================================================================

/// Path of one remote archive segment, relative to the data base URL
/// (e.g. `crawl-data/CC-MAIN-2023-23/segments/.../warc/....warc.gz`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentRef(String);

impl SegmentRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into().trim().trim_start_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path component, used as the local file name
    pub fn file_name(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Name of the extracted-documents file produced for this segment
    pub fn output_file_name(&self) -> Option<String> {
        self.file_name().map(crate::util::jsonl_name)
    }
}

impl fmt::Display for SegmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

// ============================================================================
// Content Identity
// ============================================================================

/// Stable document identifier: MD5 of the URL string (32-character hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Compute the identifier for a URL
    pub fn for_url(url: &str) -> Self {
        ContentId(format!("{:x}", md5::compute(url.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Extracted Documents
// ============================================================================

/// One retained document, serialized as a single JSONL line
///
/// Field order is the wire order: `url`, `domain`, `id`, `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub url: String,
    pub domain: String,
    pub id: ContentId,
    pub text: String,
}

impl ExtractedDocument {
    /// Build a document, truncating `text` to at most `max_text_chars` characters
    pub fn new(url: impl Into<String>, domain: impl Into<String>, text: &str, max_text_chars: usize) -> Self {
        let url = url.into();
        Self {
            id: ContentId::for_url(&url),
            url,
            domain: domain.into(),
            text: truncate_chars(text, max_text_chars).to_string(),
        }
    }
}

/// Network location of a URL exactly as written (`[userinfo@]host[:port]`,
/// case and default ports kept), or an empty string when there is none
pub fn domain_of(url: &str) -> String {
    let rest = match url.split_once(':') {
        Some((scheme, rest)) if is_scheme(scheme) => rest,
        _ => url,
    };
    let Some(authority) = rest.strip_prefix("//") else {
        return String::new();
    };
    let end = authority.find(['/', '?', '#']).unwrap_or(authority.len());
    authority[..end].to_string()
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_is_md5_of_url() {
        let id = ContentId::for_url("https://example.com/");
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        // md5("") is a well-known constant
        assert_eq!(ContentId::for_url("").as_str(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_content_id_is_deterministic() {
        let a = ContentId::for_url("https://example.com/a");
        let b = ContentId::for_url("https://example.com/a");
        let c = ContentId::for_url("https://example.com/b");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_segment_ref_names() {
        let seg = SegmentRef::new(
            "crawl-data/CC-MAIN-2023-23/segments/1685224643388.28/warc/CC-MAIN-20230528083433-20230528113433-00000.warc.gz\n",
        );
        assert_eq!(
            seg.file_name(),
            Some("CC-MAIN-20230528083433-20230528113433-00000.warc.gz")
        );
        assert_eq!(
            seg.output_file_name().as_deref(),
            Some("CC-MAIN-20230528083433-20230528113433-00000.jsonl")
        );
        assert_eq!(SegmentRef::new("crawl-data/dir/").file_name(), None);
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.example.com/path?q=1"), "www.example.com");
        assert_eq!(domain_of("http://example.com:8080/"), "example.com:8080");
        assert_eq!(domain_of("not a url"), "");
    }

    #[test]
    fn test_domain_of_keeps_authority_as_written() {
        assert_eq!(domain_of("http://example.com:80/x"), "example.com:80");
        assert_eq!(domain_of("https://example.com:443"), "example.com:443");
        assert_eq!(domain_of("http://Example.COM/x"), "Example.COM");
        assert_eq!(domain_of("https://user:pw@example.com/"), "user:pw@example.com");
        assert_eq!(domain_of("//cdn.example/x"), "cdn.example");
        assert_eq!(domain_of("http://example.com?q=1"), "example.com");
        assert_eq!(domain_of("mailto:someone@example.com"), "");
    }

    #[test]
    fn test_document_serializes_in_wire_order() {
        let doc = ExtractedDocument::new("https://example.com/", "example.com", "hello", 10_000);
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.starts_with(r#"{"url":"https://example.com/","domain":"example.com","id":""#));
        assert!(json.ends_with(r#","text":"hello"}"#));
    }

    #[test]
    fn test_document_truncates_text() {
        let text = "é".repeat(15_000);
        let doc = ExtractedDocument::new("https://example.com/", "example.com", &text, 10_000);
        assert_eq!(doc.text.chars().count(), 10_000);
    }
}
