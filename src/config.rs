//! Pipeline configuration loaded from an optional YAML file.
//!
//! Every field has a default, so a missing file, or a file that only sets a
//! few keys, is valid:
//!
//! ```yaml
//! sources: [google, bing]
//! retry:
//!   max_attempts: 5
//!   base_delay_ms: 5000
//! freshness:
//!   enabled: false
//! ```

use crate::scrapers::SourceKind;
use crate::writer::{MAX_ATTEMPTS, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sources to run, in order.
    pub sources: Vec<SourceKind>,
    pub render: RenderSettings,
    pub freshness: FreshnessSettings,
    pub retry: RetrySettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: SourceKind::ALL.to_vec(),
            render: RenderSettings::default(),
            freshness: FreshnessSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Pause a browser-backed renderer waits after load and between scrolls.
    pub settle_ms: u64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            settle_ms: 1_200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FreshnessSettings {
    pub enabled: bool,
    pub timeout_secs: u64,
    /// HEAD requests in flight at once.
    pub concurrency: usize,
}

impl Default for FreshnessSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 5,
            concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 5_000,
            max_delay_ms: 60_000,
            jitter_ms: 5_000,
        }
    }
}

impl RetrySettings {
    /// Retry policy with the default transient-error classification.
    /// `max_attempts` is held to `1..=5`.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.clamp(1, MAX_ATTEMPTS),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: Duration::from_millis(self.jitter_ms),
            ..RetryPolicy::default()
        }
    }
}

/// Load configuration from `path`, or defaults when no path is given.
#[instrument(level = "info")]
pub async fn load_config(path: Option<&str>) -> Result<PipelineConfig, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let raw = fs::read_to_string(path).await?;
    let config: PipelineConfig = serde_yaml::from_str(&raw)?;
    info!(sources = ?config.sources, "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
sources: [bing, google]
retry:
  max_attempts: 3
freshness:
  enabled: false
"#;
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sources, vec![SourceKind::Bing, SourceKind::Google]);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 5_000);
        assert!(!config.freshness.enabled);
        assert_eq!(config.freshness.concurrency, 8);
        assert_eq!(config.render, RenderSettings::default());
    }

    #[test]
    fn test_retry_settings_to_policy() {
        let policy = RetrySettings {
            max_attempts: 2,
            base_delay_ms: 10,
            max_delay_ms: 20,
            jitter_ms: 0,
        }
        .policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(policy.jitter, Duration::ZERO);
    }

    #[test]
    fn test_retry_attempts_are_clamped() {
        let yaml = "retry:\n  max_attempts: 12\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.retry.policy().max_attempts, 5);

        let none = RetrySettings {
            max_attempts: 0,
            ..RetrySettings::default()
        };
        assert_eq!(none.policy().max_attempts, 1);
    }

    #[tokio::test]
    async fn test_load_config_without_path_is_default() {
        assert_eq!(load_config(None).await.unwrap(), PipelineConfig::default());
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "sources: [yahoo]\n").unwrap();
        let config = load_config(path.to_str()).await.unwrap();
        assert_eq!(config.sources, vec![SourceKind::Yahoo]);
    }
}
