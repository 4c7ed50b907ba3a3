use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RetrieverError;
use crate::mapping::PollPolicy;
use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://rest.uniprot.org";
pub const DEFAULT_CONTACT_EMAIL: &str = "user@example.com";
pub const CONFIG_FILE_NAME: &str = "kira-uniprot.json";

pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub polling: Option<PollingConfig>,
    #[serde(default)]
    pub timeouts: Option<TimeoutConfig>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_attempts: Option<usize>,
    #[serde(default)]
    pub base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default)]
    pub interval_ms: Option<u64>,
    #[serde(default)]
    pub max_polls: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default)]
    pub single_secs: Option<u64>,
    #[serde(default)]
    pub search_secs: Option<u64>,
    #[serde(default)]
    pub submit_secs: Option<u64>,
    #[serde(default)]
    pub poll_secs: Option<u64>,
    #[serde(default)]
    pub results_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    pub single: Duration,
    pub search: Duration,
    pub submit: Duration,
    pub poll: Duration,
    pub results: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            single: Duration::from_secs(30),
            search: Duration::from_secs(60),
            submit: Duration::from_secs(30),
            poll: Duration::from_secs(30),
            results: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub schema_version: u32,
    pub base_url: String,
    pub contact_email: String,
    pub retry: RetryPolicy,
    pub polling: PollPolicy,
    pub timeouts: Timeouts,
    pub page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            base_url: DEFAULT_BASE_URL.to_string(),
            contact_email: DEFAULT_CONTACT_EMAIL.to_string(),
            retry: RetryPolicy::default(),
            polling: PollPolicy::default(),
            timeouts: Timeouts::default(),
            page_size: MAX_PAGE_SIZE,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<Settings, RetrieverError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };
        let Some(config_path) = config_path else {
            debug!("no config file found, using defaults");
            return Ok(Settings::default());
        };

        debug!("loading config from {}", config_path.display());
        let content = fs::read_to_string(&config_path)
            .map_err(|_| RetrieverError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| RetrieverError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<Settings, RetrieverError> {
        let defaults = Settings::default();

        let base_url = config
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        if base_url.is_empty() {
            return Err(RetrieverError::ConfigParse("base_url is empty".to_string()));
        }

        let retry = config.retry.unwrap_or_default();
        let retry = RetryPolicy {
            max_attempts: retry.max_attempts.unwrap_or(defaults.retry.max_attempts),
            base_delay: retry
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.base_delay),
        };
        if retry.max_attempts == 0 {
            return Err(RetrieverError::ConfigParse(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        let polling = config.polling.unwrap_or_default();
        let polling = PollPolicy {
            interval: polling
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.polling.interval),
            max_polls: polling.max_polls.unwrap_or(defaults.polling.max_polls),
        };
        if polling.max_polls == 0 {
            return Err(RetrieverError::ConfigParse(
                "polling.max_polls must be at least 1".to_string(),
            ));
        }

        let timeouts = config.timeouts.unwrap_or_default();
        let secs = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_secs).unwrap_or(fallback)
        };
        let timeouts = Timeouts {
            single: secs(timeouts.single_secs, defaults.timeouts.single),
            search: secs(timeouts.search_secs, defaults.timeouts.search),
            submit: secs(timeouts.submit_secs, defaults.timeouts.submit),
            poll: secs(timeouts.poll_secs, defaults.timeouts.poll),
            results: secs(timeouts.results_secs, defaults.timeouts.results),
        };

        let page_size = config
            .page_size
            .unwrap_or(defaults.page_size)
            .clamp(1, MAX_PAGE_SIZE);

        Ok(Settings {
            schema_version: config.schema_version.unwrap_or(1),
            base_url,
            contact_email: config.contact_email.unwrap_or(defaults.contact_email),
            retry,
            polling,
            timeouts,
            page_size,
        })
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("org", "kira", "kira-uniprot")
            .map(|dirs| dirs.config_dir().join("config.json"))
            .filter(|path| path.exists())
    }
}
