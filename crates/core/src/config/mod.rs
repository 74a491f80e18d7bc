//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HEARTH_*)
//! 2. TOML config file (if HEARTH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HEARTH_*)
/// 2. TOML config file (if HEARTH_CONFIG_FILE set)
/// 3. Built-in defaults
///
/// List-valued fields take figment's array syntax in the environment,
/// e.g. `HEARTH_API_HOSTS='[auth.example.com, app.example.com]'`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite partition store.
    ///
    /// Set via HEARTH_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the shell is served from; relative URLs resolve against it.
    ///
    /// Set via HEARTH_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Application prefix shared by every partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version tag shared by every partition name. Bumping it invalidates all
    /// previously cached content at the next activation.
    ///
    /// Set via HEARTH_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// App shell entry points and view scripts, pre-cached into CORE.
    #[serde(default = "default_core_urls")]
    pub core_urls: Vec<String>,

    /// Icons and external stylesheets, pre-cached into ASSETS.
    #[serde(default = "default_asset_urls")]
    pub asset_urls: Vec<String>,

    /// Document served to failed navigations with no cached match.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Path fragment marking a request as an API call.
    #[serde(default = "default_api_path_marker")]
    pub api_path_marker: String,

    /// Backend service hosts whose responses are treated as API calls.
    #[serde(default = "default_api_hosts")]
    pub api_hosts: Vec<String>,

    /// Path extensions (without the dot) served cache-first from ASSETS.
    #[serde(default = "default_asset_extensions")]
    pub asset_extensions: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via HEARTH_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via HEARTH_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via HEARTH_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Oldest cached copy (in seconds) a network-first fallback may serve.
    /// Unset means any age.
    #[serde(default)]
    pub max_stale_secs: Option<u64>,

    /// Activate right after a successful install instead of waiting for a
    /// SKIP_WAITING message.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./hearth-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "hearth".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_core_urls() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/offline.html",
        "/manifest.json",
        "/css/app.css",
        "/js/app.js",
        "/js/router.js",
        "/js/auth.js",
        "/js/api.js",
        "/js/views/landing.js",
        "/js/views/login.js",
        "/js/views/dashboard.js",
        "/js/views/tasks.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_asset_urls() -> Vec<String> {
    [
        "/icons/icon-72.png",
        "/icons/icon-192.png",
        "/icons/icon-512.png",
        "https://fonts.googleapis.com/css2?family=Inter:wght@400;600&display=swap",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_url() -> String {
    "/offline.html".into()
}

fn default_api_path_marker() -> String {
    "/api/".into()
}

fn default_api_hosts() -> Vec<String> {
    vec!["auth.hearth.local".into(), "app.hearth.local".into()]
}

fn default_asset_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff", "woff2", "ttf", "eot", "css", "js"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_user_agent() -> String {
    "hearth/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            core_urls: default_core_urls(),
            asset_urls: default_asset_urls(),
            offline_url: default_offline_url(),
            api_path_marker: default_api_path_marker(),
            api_hosts: default_api_hosts(),
            asset_extensions: default_asset_extensions(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            max_stale_secs: None,
            skip_waiting_on_install: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Staleness bound for network-first fallbacks, if configured.
    pub fn max_stale(&self) -> Option<Duration> {
        self.max_stale_secs.map(Duration::from_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HEARTH_`
    /// 2. TOML file from `HEARTH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HEARTH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HEARTH_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
