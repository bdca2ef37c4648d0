//! Text extraction and output shaping

use serde::{Deserialize, Serialize};

use crate::content::TextEncoding;

/// How payloads are decoded and reduced to text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Encodings tried in order; the first that decodes cleanly wins
    pub encodings: Vec<TextEncoding>,
    /// Elements removed together with their text before extraction
    pub removed_elements: Vec<String>,
    /// Hard cap on characters written per document
    pub max_text_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            encodings: TextEncoding::DEFAULT_PRIORITY.to_vec(),
            removed_elements: ["script", "style", "header", "footer", "nav"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_text_chars: 10_000,
        }
    }
}
