//! Configuration for ccsample

mod archive;
mod extraction;
mod fetch;
mod filter;
mod logging;
mod pipeline;

pub use archive::{ArchiveConfig, FALLBACK_CRAWL_ID, FALLBACK_SEGMENTS};
pub use extraction::ExtractionConfig;
pub use fetch::{FetchConfig, RetryConfig, MIB};
pub use filter::FilterConfig;
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use pipeline::{plan_download, PipelineConfig, SEGMENT_PLAN_MB};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default user agent for all HTTP requests (index, manifest, segments)
pub const DEFAULT_USER_AGENT: &str = "ccsample/0.1 (+https://commoncrawl.org/terms-of-use)";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote archive locations
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// HTTP client and download budget
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Payload decoding and text extraction
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Document retention
    #[serde(default)]
    pub filter: FilterConfig,
    /// Run layout and limits
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        Self::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Render as TOML (used by `ccsample init`)
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all configuration fields.
    ///
    /// Every problem is collected and reported in one error.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        // Archive
        for (name, value) in [
            ("archive.index_url", &self.archive.index_url),
            ("archive.data_base_url", &self.archive.data_base_url),
        ] {
            if url::Url::parse(value).is_err() {
                errors.push(format!("{} is not a valid URL: '{}'", name, value));
            }
        }
        if self.archive.fallback_crawl_id.trim().is_empty() {
            errors.push("archive.fallback_crawl_id must not be empty".to_string());
        }
        if self.archive.fallback_segments.is_empty() {
            errors.push("archive.fallback_segments must list at least one segment".to_string());
        }

        // Fetch
        if self.fetch.max_segment_mb == 0 {
            errors.push("fetch.max_segment_mb must be positive".to_string());
        }
        if self.fetch.request_timeout_secs == 0 {
            errors.push("fetch.request_timeout_secs must be positive".to_string());
        }
        if self.fetch.retry.max_attempts == 0 {
            errors.push("fetch.retry.max_attempts must be at least 1".to_string());
        }
        if self.fetch.retry.initial_delay_ms > self.fetch.retry.max_delay_ms {
            errors.push("fetch.retry.initial_delay_ms must be <= max_delay_ms".to_string());
        }

        // Extraction
        if self.extraction.encodings.is_empty() {
            errors.push("extraction.encodings must list at least one encoding".to_string());
        }
        if self.extraction.max_text_chars == 0 {
            errors.push("extraction.max_text_chars must be positive".to_string());
        }

        // Filter
        if let Some(keywords) = &self.filter.keywords {
            if keywords.iter().all(|k| k.trim().is_empty()) {
                errors.push("filter.keywords must contain at least one non-empty keyword".to_string());
            }
        }

        // Pipeline
        if self.pipeline.segment_count == 0 {
            errors.push("pipeline.segment_count must be positive".to_string());
        }
        if self.pipeline.max_records_per_segment == 0 {
            errors.push("pipeline.max_records_per_segment must be positive".to_string());
        }
        if self.pipeline.output_dir.as_os_str().is_empty() {
            errors.push("pipeline.output_dir must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
