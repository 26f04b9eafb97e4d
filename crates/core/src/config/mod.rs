//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (KANTHU_SW_*)
//! 2. TOML config file (if KANTHU_SW_CONFIG_FILE set)
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

/// Site resources cached when a worker generation installs.
const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/blog.html",
    "/offline.html",
    "/assets/css/style.css",
    "/assets/css/responsive.css",
    "/assets/css/animations.css",
    "/assets/css/blog.css",
    "/assets/js/main.js",
    "/assets/js/blog.js",
    "/assets/js/youtube-api.js",
    "/assets/js/performance.js",
    "/assets/images/logo.png",
    "/assets/images/kanthu-hero.jpg",
    "/assets/images/kanthu-about.jpg",
    "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700&family=Poppins:wght@300;400;500;600;700;800&display=swap",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css",
    "https://unpkg.com/aos@2.3.1/dist/aos.css",
    "https://unpkg.com/aos@2.3.1/dist/aos.js",
];

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (KANTHU_SW_*)
/// 2. TOML config file (if KANTHU_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Name of the current cache version.
    ///
    /// Changing it is the only way to invalidate previously cached entries;
    /// stale versions are deleted on the next activation.
    /// Set via KANTHU_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the controlled site. Relative manifest entries and endpoints
    /// resolve against it, and only responses from it count as `basic`.
    ///
    /// Set via KANTHU_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to the SQLite database holding caches and pending submissions.
    ///
    /// Set via KANTHU_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Resources fetched and cached at install time, all-or-nothing.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Page served for navigations that fail while offline.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Replay endpoint for the contact form queue.
    #[serde(default = "default_contact_endpoint")]
    pub contact_endpoint: String,

    /// Replay endpoint for the newsletter queue.
    #[serde(default = "default_newsletter_endpoint")]
    pub newsletter_endpoint: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via KANTHU_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via KANTHU_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Largest response body stored as a single cache entry.
    ///
    /// Set via KANTHU_SW_MAX_ENTRY_BYTES environment variable.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,

    /// Push notification presentation.
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Presentation defaults for push notifications.
///
/// Nested keys are set via e.g. KANTHU_SW_NOTIFICATION__TITLE.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,

    /// Body used when a push arrives without a payload.
    #[serde(default = "default_notification_body")]
    pub default_body: String,

    #[serde(default = "default_logo")]
    pub icon: String,

    #[serde(default = "default_logo")]
    pub badge: String,

    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,
}

fn default_cache_version() -> String {
    "kanthu-website-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./kanthu-sw.sqlite")
}

fn default_manifest() -> Vec<String> {
    DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_contact_endpoint() -> String {
    "/api/contact".into()
}

fn default_newsletter_endpoint() -> String {
    "/api/newsletter".into()
}

fn default_user_agent() -> String {
    "kanthu-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_entry_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_notification_title() -> String {
    "Best Tech in Telugu".into()
}

fn default_notification_body() -> String {
    "New content available!".into()
}

fn default_logo() -> String {
    "/assets/images/logo.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            default_body: default_notification_body(),
            icon: default_logo(),
            badge: default_logo(),
            vibrate: default_vibrate(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            origin: default_origin(),
            db_path: default_db_path(),
            manifest: default_manifest(),
            offline_page: default_offline_page(),
            contact_endpoint: default_contact_endpoint(),
            newsletter_endpoint: default_newsletter_endpoint(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_entry_bytes: default_max_entry_bytes(),
            notification: NotificationConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed site origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `KANTHU_SW_`
    /// 2. TOML file from `KANTHU_SW_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("KANTHU_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("KANTHU_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
