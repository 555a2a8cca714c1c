//! Hub configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::ErrorKind;

/// Environment variable prefix read by [`HubConfig::from_env`].
pub const ENV_PREFIX: &str = "WORK_HUB_";

const fn default_interval_ms() -> u64 {
    250
}

const fn default_concurrency() -> usize {
    10
}

const fn default_retry_times() -> u32 {
    3
}

const fn default_max_cache_count() -> usize {
    100
}

const fn default_cache_timeout_ms() -> u64 {
    5_000
}

/// Error kinds retried when no allowlist is configured.
pub const DEFAULT_TOLERABLE_ERRORS: [ErrorKind; 2] = [ErrorKind::Network, ErrorKind::Timeout];

/// Construction-time settings for the hub factory.
///
/// Every field is optional in serialized form. Capacity-style values are
/// permissive: zero disables the feature instead of failing validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HubConfig {
    /// Milliseconds between ticks.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Ceiling on simultaneously executing works.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Retry attempts per work. 0 disables retries.
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,
    /// Error kinds worth retrying. `None` means [`DEFAULT_TOLERABLE_ERRORS`];
    /// an empty list retries any error.
    #[serde(default)]
    pub tolerable_errors: Option<Vec<ErrorKind>>,
    /// Entries kept by each cacher. 0 disables caching.
    #[serde(default = "default_max_cache_count")]
    pub max_cache_count: usize,
    /// Time-to-live of cached results in milliseconds.
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            concurrency: default_concurrency(),
            retry_times: default_retry_times(),
            tolerable_errors: None,
            max_cache_count: default_max_cache_count(),
            cache_timeout_ms: default_cache_timeout_ms(),
        }
    }
}

impl HubConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick interval in milliseconds.
    #[must_use]
    pub const fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Set the concurrency ceiling.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_retry_times(mut self, retry_times: u32) -> Self {
        self.retry_times = retry_times;
        self
    }

    /// Set the retryable error kinds. An empty list retries any error.
    #[must_use]
    pub fn with_tolerable_errors(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.tolerable_errors = Some(kinds.into_iter().collect());
        self
    }

    /// Set the cacher capacity.
    #[must_use]
    pub const fn with_max_cache_count(mut self, max_cache_count: usize) -> Self {
        self.max_cache_count = max_cache_count;
        self
    }

    /// Set the result time-to-live in milliseconds.
    #[must_use]
    pub const fn with_cache_timeout_ms(mut self, cache_timeout_ms: u64) -> Self {
        self.cache_timeout_ms = cache_timeout_ms;
        self
    }

    /// Tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Result time-to-live.
    #[must_use]
    pub const fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    /// Retryable kinds, or `None` when any error is retryable.
    #[must_use]
    pub fn effective_tolerable_errors(&self) -> Option<Vec<ErrorKind>> {
        match &self.tolerable_errors {
            None => Some(DEFAULT_TOLERABLE_ERRORS.to_vec()),
            Some(kinds) if kinds.is_empty() => None,
            Some(kinds) => Some(kinds.clone()),
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message when `interval_ms` is zero.
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_ms == 0 {
            return Err("interval_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message on malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read `WORK_HUB_*` variables, loading a `.env` file first if present.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message when a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    ///
    /// `lookup` receives full variable names such as `WORK_HUB_CONCURRENCY`.
    ///
    /// # Errors
    ///
    /// Returns a message when a variable cannot be parsed or the result is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |suffix: &str| {
            lookup(&format!("{ENV_PREFIX}{suffix}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut cfg = Self::default();
        if let Some(v) = get("INTERVAL_MS") {
            cfg.interval_ms = parse_number("INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("CONCURRENCY") {
            cfg.concurrency = parse_number("CONCURRENCY", &v)?;
        }
        if let Some(v) = get("RETRY_TIMES") {
            cfg.retry_times = parse_number("RETRY_TIMES", &v)?;
        }
        if let Some(v) = lookup(&format!("{ENV_PREFIX}TOLERABLE_ERRORS")) {
            cfg.tolerable_errors = Some(parse_kinds(&v)?);
        }
        if let Some(v) = get("MAX_CACHE_COUNT") {
            cfg.max_cache_count = parse_number("MAX_CACHE_COUNT", &v)?;
        }
        if let Some(v) = get("CACHE_TIMEOUT_MS") {
            cfg.cache_timeout_ms = parse_number("CACHE_TIMEOUT_MS", &v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_number<N: std::str::FromStr>(suffix: &str, value: &str) -> Result<N, String>
where
    N::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{suffix}: cannot parse `{value}`: {e}"))
}

fn parse_kinds(value: &str) -> Result<Vec<ErrorKind>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            ErrorKind::parse(name)
                .ok_or_else(|| format!("{ENV_PREFIX}TOLERABLE_ERRORS: unknown error kind `{name}`"))
        })
        .collect()
}
