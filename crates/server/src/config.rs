use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
type Result<T> = anyhow::Result<T>;

pub const DEFAULT_CONFIG_PATH: &str = "probmark.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_problems_per_page")]
    pub problems_per_page: u64,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub auth: AuthSettings,
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("failed to deserialize server config")
    }

    /// Reads `PROBMARK_CONFIG` (or `probmark.toml`), falling back to defaults
    /// when the file does not exist, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("PROBMARK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(bind) = lookup("PROBMARK_BIND") {
            self.bind = bind;
        }
        if let Some(url) = lookup("ELASTICSEARCH_URL") {
            self.search.url = url;
        }
        if let Some(secret) = lookup("PROBMARK_SECRET") {
            self.auth.secret = Some(secret);
        }
        if let Some(token) = lookup("PROBMARK_ADMIN_TOKEN") {
            self.auth.admin_token = Some(token);
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database_url: default_database_url(),
            problems_per_page: default_problems_per_page(),
            search: SearchSettings::default(),
            auth: AuthSettings::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchSettings {
    #[serde(default = "default_backend")]
    pub backend: SearchBackendKind,
    #[serde(default = "default_search_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub reindex_on_startup: bool,
    #[serde(default = "default_reindex_batch_size")]
    pub reindex_batch_size: u64,
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_search_url(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            failure_policy: FailurePolicy::default(),
            reindex_on_startup: false,
            reindex_batch_size: default_reindex_batch_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackendKind {
    Elasticsearch,
    Memory,
    Disabled,
}

/// What index failures do to the request that triggered them.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Log and continue; search degrades to no results.
    #[default]
    FailOpen,
    /// Return the index error to the caller.
    FailClosed,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    /// HMAC key for signed tokens. A random key is generated when unset, so
    /// tokens do not survive a restart.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_reset_ttl_secs")]
    pub reset_ttl_secs: u64,
    /// Bearer token required by problem writes and maintenance routes.
    /// Those routes are open when unset.
    #[serde(default)]
    pub admin_token: Option<String>,
    /// Page that receives `?token=` in password-reset links.
    #[serde(default = "default_reset_url")]
    pub reset_url: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret: None,
            session_ttl_secs: default_session_ttl_secs(),
            reset_ttl_secs: default_reset_ttl_secs(),
            admin_token: None,
            reset_url: default_reset_url(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_url() -> String {
    "sqlite://probmark.db?mode=rwc".to_string()
}

fn default_problems_per_page() -> u64 {
    10
}

fn default_backend() -> SearchBackendKind {
    SearchBackendKind::Elasticsearch
}

fn default_search_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_timeout_ms() -> u64 {
    2_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_reindex_batch_size() -> u64 {
    500
}

fn default_session_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_reset_ttl_secs() -> u64 {
    600
}

fn default_reset_url() -> String {
    "http://localhost:8080/reset-password".to_string()
}
