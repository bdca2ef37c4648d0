//! Content filter configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::filter::{FilterMode, KeywordPreset};

/// Which documents are retained
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// `bias` keeps keyword matches only, `all` keeps everything
    pub mode: FilterMode,
    /// Built-in keyword list used when no explicit list is given
    pub preset: KeywordPreset,
    /// Explicit keyword list (overrides the preset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    /// Newline-delimited keyword file (overrides the preset and `keywords`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_file: Option<PathBuf>,
    /// Extracted texts shorter than this (characters) are always dropped
    pub min_text_chars: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            mode: FilterMode::Bias,
            preset: KeywordPreset::Bias,
            keywords: None,
            keywords_file: None,
            min_text_chars: 100,
        }
    }
}
