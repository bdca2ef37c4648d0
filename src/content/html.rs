//! HTML to plain text

use scraper::{Html, Node};
use std::collections::HashSet;

use super::encoding::{decode_with_priority, TextEncoding};
use crate::config::ExtractionConfig;

/// Recovers readable text from raw HTML payloads.
///
/// Decoding tries each configured encoding in order. Removed elements
/// (script, style, header, footer, nav by default) are dropped with all of
/// their descendants; every other text node is kept in document order.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    encodings: Vec<TextEncoding>,
    removed_elements: HashSet<String>,
}

impl TextExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            encodings: config.encodings.clone(),
            removed_elements: config
                .removed_elements
                .iter()
                .map(|name| name.trim().to_ascii_lowercase())
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    /// Extract text from an undecoded payload.
    ///
    /// Returns an empty string when no encoding accepts the bytes.
    pub fn extract(&self, payload: &[u8]) -> String {
        if payload.is_empty() {
            return String::new();
        }
        match decode_with_priority(payload, &self.encodings) {
            Some((html, encoding)) => {
                tracing::trace!(%encoding, bytes = payload.len(), "Decoded payload");
                self.html_to_text(&html)
            }
            None => {
                tracing::debug!(bytes = payload.len(), "No encoding accepted payload");
                String::new()
            }
        }
    }

    /// Extract text from already decoded HTML
    pub fn html_to_text(&self, html: &str) -> String {
        let document = Html::parse_document(html);

        let mut pieces: Vec<&str> = Vec::new();
        // Depth-first, children pushed in reverse so they pop in document order
        let mut stack = vec![document.tree.root()];
        while let Some(node) = stack.pop() {
            match node.value() {
                Node::Element(element) if self.is_removed(element.name()) => continue,
                Node::Text(text) => {
                    pieces.push(&**text);
                    continue;
                }
                Node::Comment(_) | Node::ProcessingInstruction(_) | Node::Doctype(_) => continue,
                _ => {}
            }
            stack.extend(node.children().rev());
        }

        normalize_lines(&pieces.join("\n"))
    }

    fn is_removed(&self, name: &str) -> bool {
        // html5ever lowercases element names
        self.removed_elements.contains(name)
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

/// Trim every line, split lines on double spaces, drop empty pieces.
fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .flat_map(|line| line.split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Test Page</title>
  <style>body { color: red; }</style>
  <script>var tracking = "secret-script";</script>
</head>
<body>
  <header>Site Header</header>
  <nav><a href="/">Home</a> <a href="/about">About</a></nav>
  <main>
    <h1>Main Heading</h1>
    <p>First paragraph with <b>bold</b> words.</p>
    <p>Second   paragraph  after spaces.</p>
    <!-- a comment -->
  </main>
  <footer>Copyright footer</footer>
</body>
</html>"#;

    #[test]
    fn test_removed_elements_are_absent() {
        let text = TextExtractor::default().html_to_text(PAGE);
        for hidden in ["secret-script", "color: red", "Site Header", "Home", "About", "Copyright"] {
            assert!(!text.contains(hidden), "{:?} leaked into {:?}", hidden, text);
        }
        assert!(!text.contains("a comment"));
    }

    #[test]
    fn test_visible_text_in_document_order() {
        let text = TextExtractor::default().html_to_text(PAGE);
        let title = text.find("Test Page").unwrap();
        let heading = text.find("Main Heading").unwrap();
        let first = text.find("First paragraph with").unwrap();
        let second = text.find("Second").unwrap();
        assert!(title < heading && heading < first && first < second);
        assert!(text.contains("bold"));
    }

    #[test]
    fn test_normalization() {
        let text = TextExtractor::default().html_to_text(PAGE);
        assert!(text.lines().all(|line| !line.is_empty()));
        assert!(text.lines().all(|line| line.trim() == line));
        // Double spaces become line breaks
        assert!(text.contains("Second\nparagraph\nafter spaces."));
    }

    #[test]
    fn test_normalize_lines_directly() {
        assert_eq!(normalize_lines("  a  \n\n b  c \n   "), "a\nb\nc");
        assert_eq!(normalize_lines(""), "");
    }

    #[test]
    fn test_malformed_markup_does_not_fail() {
        let extractor = TextExtractor::default();
        let text = extractor.html_to_text("<div><p>unclosed <b>tags <script>x</div></p>");
        assert!(text.contains("unclosed"));
        assert!(text.contains("tags"));
        assert!(extractor.html_to_text("<<<>>>&&&").contains("&&&"));
    }

    #[test]
    fn test_extract_decodes_latin1() {
        let mut payload = b"<html><body><p>caf".to_vec();
        payload.push(0xE9);
        payload.extend_from_slice(b"</p></body></html>");
        assert_eq!(TextExtractor::default().extract(&payload), "café");
    }

    #[test]
    fn test_extract_undecodable_is_empty() {
        let config = ExtractionConfig {
            encodings: vec![TextEncoding::Utf8],
            ..ExtractionConfig::default()
        };
        let extractor = TextExtractor::new(&config);
        assert_eq!(extractor.extract(&[0x3C, 0x70, 0x3E, 0xFF, 0xFE]), "");
        assert_eq!(extractor.extract(b""), "");
    }

    #[test]
    fn test_custom_removed_elements() {
        let config = ExtractionConfig {
            removed_elements: vec!["ASIDE".to_string()],
            ..ExtractionConfig::default()
        };
        let extractor = TextExtractor::new(&config);
        let text = extractor.html_to_text("<body><aside>side</aside><nav>menu</nav></body>");
        assert_eq!(text, "menu");
    }
}
