//! Keyword-based document retention

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::config::FilterConfig;
use crate::util::has_min_chars;

/// Terms associated with protected characteristics and contested opinion
pub const BIAS_KEYWORDS: [&str; 22] = [
    "gender", "race", "ethnicity", "religion", "politics", "income",
    "class", "age", "disability", "sexuality", "controversial",
    "opinion", "belief", "stereotype", "discrimination", "prejudice",
    "bias", "unfair", "inequality", "privilege", "minority", "majority",
];

/// Fairness, harm, autonomy, deception and justice vocabulary
pub const ETHICS_KEYWORDS: &[&str] = &[
    // fairness
    "discrimination", "bias", "prejudice", "equality", "unfair", "unjust", "privilege",
    "favoritism", "equitable", "impartial",
    // harm
    "hurt", "damage", "injury", "pain", "suffering", "abuse", "mistreat", "exploit",
    "harm", "unsafe", "danger", "violent",
    // autonomy
    "freedom", "choice", "consent", "coercion", "manipulation", "force", "control",
    "privacy", "liberty", "self-determination", "agency",
    // deception
    "lie", "deceive", "mislead", "trick", "fraud", "false", "fake", "dishonest",
    "cheat", "scam", "misinformation", "disinformation",
    // justice
    "fair", "rights", "deserve", "punishment", "reward", "compensation", "retribution",
    "law", "legal", "illegal", "crime",
];

/// Filter errors
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Failed to read keyword file {path}: {source}")]
    KeywordFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Keyword set is empty")]
    EmptyKeywordSet,
}

/// Which documents are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Keep documents containing at least one keyword
    #[default]
    Bias,
    /// Keep every document of sufficient length
    All,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bias => "bias",
            Self::All => "all",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bias" => Ok(Self::Bias),
            "all" => Ok(Self::All),
            other => Err(format!("unknown filter mode '{}' (expected 'bias' or 'all')", other)),
        }
    }
}

/// Built-in keyword lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordPreset {
    #[default]
    Bias,
    Ethics,
}

impl KeywordPreset {
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Bias => &BIAS_KEYWORDS,
            Self::Ethics => ETHICS_KEYWORDS,
        }
    }
}

/// Lower-cased, de-duplicated keywords matched as plain substrings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Build from any list of terms. Blank entries and duplicates are dropped.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords: Vec<String> = Vec::new();
        for term in terms {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && !keywords.contains(&term) {
                keywords.push(term);
            }
        }
        Self { keywords }
    }

    pub fn preset(preset: KeywordPreset) -> Self {
        Self::new(preset.keywords())
    }

    /// Read one keyword per line; blank lines and `#` comments are ignored
    pub fn from_file(path: &Path) -> Result<Self, FilterError> {
        let content = std::fs::read_to_string(path).map_err(|source| FilterError::KeywordFile {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        );
        if set.is_empty() {
            return Err(FilterError::EmptyKeywordSet);
        }
        Ok(set)
    }

    /// First keyword occurring in `lowered` (which must already be lower case)
    pub fn first_match(&self, lowered: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| lowered.contains(keyword.as_str()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }
}

/// Decides whether an extracted text is kept
#[derive(Debug, Clone)]
pub struct ContentFilter {
    keywords: KeywordSet,
    min_text_chars: usize,
}

impl ContentFilter {
    pub fn new(keywords: KeywordSet, min_text_chars: usize) -> Self {
        Self {
            keywords,
            min_text_chars,
        }
    }

    /// Build from configuration.
    ///
    /// A keyword file takes precedence over an inline list, which takes
    /// precedence over the preset.
    pub fn from_config(config: &FilterConfig) -> Result<Self, FilterError> {
        let keywords = if let Some(path) = &config.keywords_file {
            KeywordSet::from_file(path)?
        } else if let Some(list) = &config.keywords {
            let set = KeywordSet::new(list);
            if set.is_empty() {
                return Err(FilterError::EmptyKeywordSet);
            }
            set
        } else {
            KeywordSet::preset(config.preset)
        };
        Ok(Self::new(keywords, config.min_text_chars))
    }

    /// Whether `text` should be emitted under `mode`.
    ///
    /// Texts shorter than the minimum are rejected in every mode.
    pub fn accept(&self, text: &str, mode: FilterMode) -> bool {
        if !has_min_chars(text, self.min_text_chars) {
            return false;
        }
        match mode {
            FilterMode::All => true,
            FilterMode::Bias => self.matched_keyword(text).is_some(),
        }
    }

    /// Case-insensitive substring search for any keyword
    pub fn matched_keyword(&self, text: &str) -> Option<&str> {
        self.keywords.first_match(&text.to_lowercase())
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn min_text_chars(&self) -> usize {
        self.min_text_chars
    }
}
