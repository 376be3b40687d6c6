//! Process configuration.
//!
//! Loaded once at startup from an optional JSON file; the role flags in
//! `main.rs` override the addressing fields. Every field has a default so a
//! bare `--bind` is enough for local clusters.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Barrel identity. Operators pick small stable ids so a restarted
    /// barrel reuses its snapshot file.
    pub barrel_id: u32,
    pub bind_addr: String,
    /// Base url of the gateway, e.g. `http://127.0.0.1:7000`.
    pub gateway_addr: String,
    /// Directory holding one `barrel_<id>.json` snapshot per barrel.
    pub data_dir: String,
    /// Crawler discoveries admitted since the last client submission.
    pub max_crawl_depth: usize,
    /// Per-field size caps applied by the crawler, in bytes.
    pub max_text_len: usize,
    pub max_tokens_len: usize,
    pub max_links_len: usize,
    /// Retry policy for inter-process calls.
    pub retry_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub request_timeout_ms: u64,
    /// Page downloads get a longer budget than control-plane calls.
    pub fetch_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            barrel_id: 0,
            bind_addr: "127.0.0.1:7000".to_string(),
            gateway_addr: "http://127.0.0.1:7000".to_string(),
            data_dir: "data".to_string(),
            max_crawl_depth: 40,
            max_text_len: 64_000,
            max_tokens_len: 64_000,
            max_links_len: 32_000,
            retry_attempts: 3,
            retry_base_delay_ms: 150,
            request_timeout_ms: 500,
            fetch_timeout_ms: 10_000,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Snapshot file for one barrel id under `data_dir`.
    pub fn snapshot_path(&self, barrel_id: u32) -> PathBuf {
        PathBuf::from(&self.data_dir).join(format!("barrel_{}.json", barrel_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.retry_attempts, 3);
        assert!(config.max_crawl_depth > 0);
        assert!(config.snapshot_path(2).ends_with("barrel_2.json"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"barrel_id": 7, "max_crawl_depth": 5}}"#).unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.barrel_id, 7);
        assert_eq!(config.max_crawl_depth, 5);
        // Untouched fields keep their defaults
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load("/nonexistent/config.json").is_err());
    }
}
