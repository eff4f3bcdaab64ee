//! Optional JSON config file.

use std::path::Path;

use aer_report::GenerationConfig;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Seconds before an HTTP fetch is abandoned.
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchConfig {
    /// `None` uses 30 seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl FetchConfig {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS)
    }
}

/// Load `path`, or defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<CliConfig> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: CliConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = load(None).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.fetch.timeout_secs(), 30);
    }

    #[test]
    fn file_overrides_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aer.json");
        std::fs::write(
            &path,
            r#"{"generation":{"meta_verification":"clinic-signed"},"fetch":{"timeout_secs":5}}"#,
        )
        .unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.generation.meta_verification.as_deref(), Some("clinic-signed"));
        assert_eq!(config.fetch.timeout_secs(), 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aer.json");
        std::fs::write(&path, r#"{"generaton":{}}"#).unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
