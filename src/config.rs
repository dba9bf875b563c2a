//! Pipeline configuration.
//!
//! Everything the core needs is carried in [`PipelineConfig`] and passed
//! explicitly into [`run_once`](crate::pipeline::run_once); nothing is read from
//! ambient globals. A config can be loaded from YAML and then overridden field
//! by field from the command line.
//!
//! # YAML example
//!
//! ```yaml
//! max_attempts: 4
//! timeout_ms: 8000
//! backoff:
//!   kind: exponential
//!   base_ms: 500
//!   max_ms: 30000
//!   jitter_ms: 250
//! daily_snapshot_path_template: data/daily/titles-{date}.jsonl
//! cumulative_store_path: data/titles.jsonl
//! concurrency: 8
//! run_timeout_ms: 120000
//! ```

use crate::error::ConfigError;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// Delay policy between fetch attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Retry immediately.
    None,
    /// Same delay before every retry.
    Fixed { delay_ms: u64 },
    /// `min(base * 2^(attempt-1), max)` plus uniform jitter in `0..=jitter_ms`.
    Exponential {
        base_ms: u64,
        max_ms: u64,
        jitter_ms: u64,
    },
}

impl BackoffStrategy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            BackoffStrategy::None => Duration::ZERO,
            BackoffStrategy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            BackoffStrategy::Exponential {
                base_ms,
                max_ms,
                jitter_ms,
            } => {
                let shift = attempt.saturating_sub(1).min(32);
                let delay = base_ms.saturating_mul(1u64 << shift).min(max_ms);
                let jitter = if jitter_ms == 0 {
                    0
                } else {
                    rng().random_range(0..=jitter_ms)
                };
                Duration::from_millis(delay + jitter)
            }
        }
    }
}

/// Configuration consumed by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Total attempts per URL, including the first. Must be at least 1.
    pub max_attempts: u32,
    /// Per-request timeout.
    pub timeout_ms: u64,
    pub backoff: BackoffStrategy,
    /// Path of the daily snapshot; must contain `{date}` or `{date:<strftime>}`.
    pub daily_snapshot_path_template: String,
    pub cumulative_store_path: PathBuf,
    /// Maximum number of URLs fetched at once.
    pub concurrency: usize,
    /// Hard limit for the whole run; pending URLs are dropped when it expires.
    pub run_timeout_ms: Option<u64>,
    pub user_agent: String,
    pub accept_language: String,
}

/// Documented fallbacks: 3 attempts, 10 s request timeout, exponential backoff
/// from 500 ms capped at 30 s with up to 250 ms jitter, 12 concurrent fetches,
/// no run-level timeout, and the `data/` layout.
impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            max_attempts: 3,
            timeout_ms: 10_000,
            backoff: BackoffStrategy::Exponential {
                base_ms: 500,
                max_ms: 30_000,
                jitter_ms: 250,
            },
            daily_snapshot_path_template: "data/daily/titles-{date}.jsonl".to_string(),
            cumulative_store_path: PathBuf::from("data/titles.jsonl"),
            concurrency: 12,
            run_timeout_ms: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "ja,en-US;q=0.9,en;q=0.8".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load a YAML config file. Missing fields take their default values.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config: PipelineConfig =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        info!("Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if !crate::outputs::snapshot::has_date_placeholder(&self.daily_snapshot_path_template) {
            return Err(ConfigError::Invalid(format!(
                "daily_snapshot_path_template has no {{date}} placeholder: {}",
                self.daily_snapshot_path_template
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut c = PipelineConfig::default();
        c.max_attempts = 0;
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));

        let mut c = PipelineConfig::default();
        c.concurrency = 0;
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));

        let mut c = PipelineConfig::default();
        c.daily_snapshot_path_template = "data/daily/titles.jsonl".into();
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_exponential_backoff_doubles_and_caps() {
        let b = BackoffStrategy::Exponential {
            base_ms: 100,
            max_ms: 1_000,
            jitter_ms: 0,
        };
        assert_eq!(b.delay(1), Duration::from_millis(100));
        assert_eq!(b.delay(2), Duration::from_millis(200));
        assert_eq!(b.delay(3), Duration::from_millis(400));
        assert_eq!(b.delay(5), Duration::from_millis(1_000));
        assert_eq!(b.delay(100), Duration::from_millis(1_000));
    }

    #[test]
    fn test_exponential_backoff_jitter_bounds() {
        let b = BackoffStrategy::Exponential {
            base_ms: 100,
            max_ms: 1_000,
            jitter_ms: 50,
        };
        for _ in 0..100 {
            let d = b.delay(1);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_fixed_and_none_backoff() {
        assert_eq!(BackoffStrategy::None.delay(3), Duration::ZERO);
        assert_eq!(
            BackoffStrategy::Fixed { delay_ms: 7 }.delay(9),
            Duration::from_millis(7)
        );
    }

    #[tokio::test]
    async fn test_load_yaml_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        tokio::fs::write(
            &path,
            "max_attempts: 5\nbackoff:\n  kind: fixed\n  delay_ms: 20\ncumulative_store_path: /tmp/x.jsonl\n",
        )
        .await
        .unwrap();

        let c = PipelineConfig::load(&path).await.unwrap();
        assert_eq!(c.max_attempts, 5);
        assert_eq!(c.backoff, BackoffStrategy::Fixed { delay_ms: 20 });
        assert_eq!(c.cumulative_store_path, PathBuf::from("/tmp/x.jsonl"));
        assert_eq!(c.timeout_ms, 10_000);
        assert_eq!(c.concurrency, 12);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        tokio::fs::write(&path, "max_attempts: [oops\n").await.unwrap();
        assert!(matches!(
            PipelineConfig::load(&path).await,
            Err(ConfigError::Parse { .. })
        ));

        tokio::fs::write(&path, "max_attempts: 0\n").await.unwrap();
        assert!(matches!(
            PipelineConfig::load(&path).await,
            Err(ConfigError::Invalid(_))
        ));
    }
}
