//! Configuration management for epoharvest using the prefer crate.
//!
//! A config file is optional. Values it sets replace the built-in defaults;
//! command-line flags are applied on top by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::crawl::{CrawlError, PublicationServer, DEFAULT_BASE_URL};
use crate::http_client::{HttpClient, RetryPolicy};

/// Default tracking store filename.
pub const DEFAULT_DATABASE: &str = "epo.db";

/// Default worker pool size for both coordinators.
pub const DEFAULT_WORKERS: usize = 12;

/// Default suffix filter: granted patents.
pub const DEFAULT_SUFFIX: &str = "B1";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format} config {}: {message}", path.display())]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Settings as written in a config file. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tracking store path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Publication server REST root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Attempts per fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_backoff: Option<f64>,
    /// Inclusive bounds of the random delay added after each failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_jitter_ms: Option<[u64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// File this config was read from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load `explicit` if given, otherwise discover an epoharvest config file
    /// in the standard locations. No file found means defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path).await;
        }

        match prefer::load("epoharvest").await {
            Ok(found) => match found.source_path() {
                Some(path) => Self::load_from_path(path).await,
                None => Ok(Self::default()),
            },
            Err(_) => {
                debug!("No epoharvest config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file. The format follows the
    /// extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error("TOML", e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error("YAML", e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_error("JSON", e.to_string()))?,
        };

        debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory relative paths in this config are resolved against.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Expand `~` and resolve a relative path against `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Overlay this config onto `settings`.
    pub fn apply_to_settings(
        &self,
        settings: &mut Settings,
        base_dir: &Path,
    ) -> Result<(), ConfigError> {
        if let Some(ref database) = self.database {
            settings.database = self.resolve_path(database, base_dir);
        }
        if let Some(ref base_url) = self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(timeout) = self.request_timeout {
            if timeout == 0 {
                return Err(invalid("request_timeout", "must be at least 1 second"));
            }
            settings.request_timeout = Duration::from_secs(timeout);
        }
        if let Some(attempts) = self.max_retries {
            if attempts == 0 {
                return Err(invalid("max_retries", "must be at least 1"));
            }
            settings.retry.max_attempts = attempts;
        }
        if let Some(delay) = self.retry_delay_ms {
            settings.retry.initial_delay = Duration::from_millis(delay);
        }
        if let Some(backoff) = self.retry_backoff {
            if !backoff.is_finite() || backoff < 1.0 {
                return Err(invalid("retry_backoff", "must be a number >= 1.0"));
            }
            settings.retry.backoff = backoff;
        }
        if let Some([low, high]) = self.retry_jitter_ms {
            if low > high {
                return Err(invalid("retry_jitter_ms", "lower bound exceeds upper bound"));
            }
            settings.retry.jitter = (Duration::from_millis(low), Duration::from_millis(high));
        }
        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(invalid("workers", "must be at least 1"));
            }
            settings.workers = workers;
        }
        if let Some(ref suffix) = self.suffix {
            settings.suffix = suffix.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        Ok(())
    }
}

fn invalid(key: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.to_string(),
    }
}

/// Effective settings after defaults and config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: PathBuf,
    pub base_url: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub workers: usize,
    pub suffix: String,
    /// None means the built-in epoharvest agent.
    pub user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            retry: RetryPolicy::default(),
            workers: DEFAULT_WORKERS,
            suffix: DEFAULT_SUFFIX.to_string(),
            user_agent: None,
        }
    }
}

impl Settings {
    /// Defaults overlaid with `config`. Relative paths resolve against the
    /// config file's directory, or `cwd` when there is no file.
    pub fn from_config(config: &Config, cwd: &Path) -> Result<Self, ConfigError> {
        let base_dir = config.base_dir().unwrap_or_else(|| cwd.to_path_buf());
        let mut settings = Self::default();
        config.apply_to_settings(&mut settings, &base_dir)?;
        Ok(settings)
    }

    /// Retrying HTTP client for these settings.
    pub fn http_client(&self) -> Result<HttpClient, reqwest::Error> {
        let mut builder = HttpClient::builder(self.request_timeout).retry(self.retry.clone());
        if let Some(ref ua) = self.user_agent {
            builder = builder.user_agent(ua);
        }
        builder.build()
    }

    pub fn publication_server(&self) -> Result<PublicationServer, CrawlError> {
        PublicationServer::new(&self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_toml_and_resolve_relative_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("epoharvest.toml");
        std::fs::write(
            &path,
            r#"
database = "data/epo.db"
workers = 4
retry_jitter_ms = [0, 250]
suffix = "A1"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).await.unwrap();
        let settings = Settings::from_config(&config, Path::new("/elsewhere")).unwrap();

        assert_eq!(settings.database, dir.path().join("data/epo.db"));
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.suffix, "A1");
        assert_eq!(
            settings.retry.jitter,
            (Duration::ZERO, Duration::from_millis(250))
        );
        assert_eq!(settings.retry.max_attempts, 10);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("epoharvest.yaml");
        std::fs::write(&yaml, "max_retries: 3\nrequest_timeout: 20\n").unwrap();
        let json = dir.path().join("epoharvest.json");
        std::fs::write(&json, r#"{"retry_backoff": 2.0, "user_agent": "bot/1"}"#).unwrap();

        let from_yaml = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(from_yaml.max_retries, Some(3));
        assert_eq!(from_yaml.request_timeout, Some(20));

        let settings = Settings::from_config(
            &Config::load_from_path(&json).await.unwrap(),
            dir.path(),
        )
        .unwrap();
        assert_eq!(settings.retry.backoff, 2.0);
        assert_eq!(settings.user_agent.as_deref(), Some("bot/1"));
    }

    #[tokio::test]
    async fn test_parse_error_names_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "workers = [").unwrap();
        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { format: "TOML", .. }));
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::from_config(&Config::default(), Path::new("/work")).unwrap();
        assert_eq!(settings.database, PathBuf::from(DEFAULT_DATABASE));
        assert_eq!(settings.workers, DEFAULT_WORKERS);
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.retry, RetryPolicy::default());
        assert!(settings.publication_server().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            Config {
                workers: Some(0),
                ..Default::default()
            },
            Config {
                max_retries: Some(0),
                ..Default::default()
            },
            Config {
                retry_jitter_ms: Some([500, 100]),
                ..Default::default()
            },
            Config {
                retry_backoff: Some(0.5),
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(Settings::from_config(&config, Path::new("/")).is_err());
        }
    }
}
