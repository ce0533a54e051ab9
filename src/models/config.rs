//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::CatalogSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Login credentials and timeouts
    #[serde(default)]
    pub auth: AuthConfig,

    /// "Load more" pagination behavior
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Scroll-assist delays and distances
    #[serde(default)]
    pub scroll: ScrollConfig,

    /// Platform URLs
    #[serde(default)]
    pub urls: UrlsConfig,

    /// Database and artifact paths
    #[serde(default)]
    pub storage: StorageConfig,

    /// Asset download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// Site selector strategy tables
    #[serde(default)]
    pub selectors: CatalogSelectors,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        if !path.as_ref().exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply environment variable overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment variable overrides from an arbitrary lookup.
    pub fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        let string = |target: &mut String, key: &str| {
            if let Some(value) = get(key) {
                *target = value;
            }
        };
        let number = |target: &mut u64, key: &str| {
            if let Some(value) = get(key).and_then(|v| v.parse().ok()) {
                *target = value;
            }
        };

        string(&mut self.auth.email, "IRIS_EMAIL");
        string(&mut self.auth.password, "IRIS_PASSWORD");
        string(&mut self.urls.base, "IRIS_BASE_URL");
        string(&mut self.urls.login, "IRIS_LOGIN_URL");
        string(&mut self.urls.catalog, "IRIS_CATALOG_URL");
        string(&mut self.storage.db_path, "IRIS_DB_PATH");

        if let Some(value) = get("IRIS_HEADLESS") {
            self.browser.headless = !matches!(value.as_str(), "0" | "false" | "False");
        }

        number(&mut self.pagination.max_iterations, "CATALOG_MAX_PAGES");
        number(&mut self.pagination.poll_interval_ms, "POLL_INTERVAL_MS");
        number(&mut self.pagination.poll_max_attempts, "POLL_MAX_ATTEMPTS");
        number(
            &mut self.pagination.load_timeout_ms,
            "PAGINATION_LOAD_TIMEOUT_MS",
        );
        number(
            &mut self.pagination.visibility_timeout_ms,
            "PAGINATION_VISIBILITY_TIMEOUT_MS",
        );
        number(&mut self.scroll.step_delay_ms, "SCROLL_STEP_DELAY_MS");
        number(&mut self.scroll.after_delay_ms, "SCROLL_AFTER_DELAY_MS");
        number(&mut self.scroll.retry_delay_ms, "SCROLL_RETRY_DELAY_MS");
        number(
            &mut self.scroll.networkidle_fallback_ms,
            "NETWORKIDLE_FALLBACK_MS",
        );
        number(&mut self.scroll.view_switch_delay_ms, "VIEW_SWITCH_DELAY_MS");
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.urls.catalog.contains("example.com") {
            return Err(AppError::validation(
                "urls.catalog is a placeholder; set IRIS_CATALOG_URL",
            ));
        }
        url::Url::parse(&self.urls.base)
            .map_err(|e| AppError::validation(format!("urls.base is not a valid URL: {e}")))?;
        if self.pagination.max_iterations == 0 {
            return Err(AppError::validation("pagination.max_iterations must be > 0"));
        }
        if self.pagination.poll_max_attempts == 0 {
            return Err(AppError::validation(
                "pagination.poll_max_attempts must be > 0",
            ));
        }
        if self.pagination.max_click_cycles == 0 {
            return Err(AppError::validation(
                "pagination.max_click_cycles must be > 0",
            ));
        }
        if self.download.concurrent == 0 {
            return Err(AppError::validation("download.concurrent must be > 0"));
        }
        if self.selectors.card_strategies.is_empty() {
            return Err(AppError::validation("selectors.card_strategies is empty"));
        }
        if self.selectors.load_more_strategies.is_empty() {
            return Err(AppError::validation(
                "selectors.load_more_strategies is empty",
            ));
        }
        Ok(())
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Run Chrome headless
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// General element/navigation timeout in milliseconds
    #[serde(default = "defaults::browser_timeout")]
    pub timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: defaults::headless(),
            timeout_ms: defaults::browser_timeout(),
        }
    }
}

/// Login credentials and authentication timeouts.
///
/// Login needs longer bounds than scraping: the post-login redirect can be
/// slow on the platform side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Account email (usually supplied via IRIS_EMAIL)
    #[serde(default)]
    pub email: String,

    /// Account password (usually supplied via IRIS_PASSWORD)
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Delay after pressing the login button, in milliseconds
    #[serde(default = "defaults::auth_click_delay")]
    pub button_click_delay_ms: u64,

    /// Bound for the post-login URL redirect, in milliseconds
    #[serde(default = "defaults::auth_redirect_timeout")]
    pub redirect_timeout_ms: u64,

    /// Bound for the post-login page settle, in milliseconds
    #[serde(default = "defaults::auth_redirect_timeout")]
    pub networkidle_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            button_click_delay_ms: defaults::auth_click_delay(),
            redirect_timeout_ms: defaults::auth_redirect_timeout(),
            networkidle_timeout_ms: defaults::auth_redirect_timeout(),
        }
    }
}

/// "Load more" pagination behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Bound for the projects API response after a click, in milliseconds
    #[serde(default = "defaults::pagination_load_timeout")]
    pub load_timeout_ms: u64,

    /// Bound for locating/scrolling to the button, in milliseconds
    #[serde(default = "defaults::pagination_visibility_timeout")]
    pub visibility_timeout_ms: u64,

    /// Wait between growth polls, in milliseconds
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum growth polls per click cycle
    #[serde(default = "defaults::poll_max_attempts")]
    pub poll_max_attempts: u64,

    /// Click/escalation cycles before giving up on the catalog
    #[serde(default = "defaults::max_click_cycles")]
    pub max_click_cycles: u64,

    /// Hard cap on crawl iterations
    #[serde(default = "defaults::max_iterations")]
    pub max_iterations: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: defaults::pagination_load_timeout(),
            visibility_timeout_ms: defaults::pagination_visibility_timeout(),
            poll_interval_ms: defaults::poll_interval(),
            poll_max_attempts: defaults::poll_max_attempts(),
            max_click_cycles: defaults::max_click_cycles(),
            max_iterations: defaults::max_iterations(),
        }
    }
}

/// Scroll-assist delays and distances.
///
/// Conservative values; the catalog renders lazily and reacts to scroll
/// position, so these prioritize reliability over speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Delay between wheel-scroll steps, in milliseconds
    #[serde(default = "defaults::scroll_step_delay")]
    pub step_delay_ms: u64,

    /// Delay after a scroll operation settles, in milliseconds
    #[serde(default = "defaults::scroll_after_delay")]
    pub after_delay_ms: u64,

    /// Delay before the aggressive re-scroll, in milliseconds
    #[serde(default = "defaults::scroll_retry_delay")]
    pub retry_delay_ms: u64,

    /// Fixed fallback wait when network-idle never fires, in milliseconds
    #[serde(default = "defaults::networkidle_fallback")]
    pub networkidle_fallback_ms: u64,

    /// Delay after switching catalog views, in milliseconds
    #[serde(default = "defaults::view_switch_delay")]
    pub view_switch_delay_ms: u64,

    /// Wheel-scroll steps per assist pass
    #[serde(default = "defaults::wheel_steps")]
    pub wheel_steps: u64,

    /// Wheel-scroll distance per step, in pixels
    #[serde(default = "defaults::wheel_distance")]
    pub wheel_distance_px: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: defaults::scroll_step_delay(),
            after_delay_ms: defaults::scroll_after_delay(),
            retry_delay_ms: defaults::scroll_retry_delay(),
            networkidle_fallback_ms: defaults::networkidle_fallback(),
            view_switch_delay_ms: defaults::view_switch_delay(),
            wheel_steps: defaults::wheel_steps(),
            wheel_distance_px: defaults::wheel_distance(),
        }
    }
}

/// Platform URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlsConfig {
    /// Platform origin used for URL absolutization
    #[serde(default = "defaults::base_url")]
    pub base: String,

    /// Login page URL
    #[serde(default = "defaults::login_url")]
    pub login: String,

    /// Catalog listing URL
    #[serde(default = "defaults::catalog_url")]
    pub catalog: String,
}

impl Default for UrlsConfig {
    fn default() -> Self {
        Self {
            base: defaults::base_url(),
            login: defaults::login_url(),
            catalog: defaults::catalog_url(),
        }
    }
}

/// Database and artifact paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(default = "defaults::db_path")]
    pub db_path: String,

    /// Directory for per-iteration screenshots and HTML snapshots
    #[serde(default = "defaults::artifacts_dir")]
    pub artifacts_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::db_path(),
            artifacts_dir: defaults::artifacts_dir(),
        }
    }
}

/// Asset download behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Maximum concurrent downloads
    #[serde(default = "defaults::concurrent_downloads")]
    pub concurrent: usize,

    /// Request timeout in seconds
    #[serde(default = "defaults::download_timeout")]
    pub timeout_secs: u64,

    /// Retry attempts per download
    #[serde(default = "defaults::retry_count")]
    pub retry_count: u64,

    /// Linear backoff step between retries, in milliseconds
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            concurrent: defaults::concurrent_downloads(),
            timeout_secs: defaults::download_timeout(),
            retry_count: defaults::retry_count(),
            retry_backoff_ms: defaults::retry_backoff(),
        }
    }
}

mod defaults {
    // Browser defaults
    pub fn headless() -> bool {
        true
    }
    pub fn browser_timeout() -> u64 {
        30_000
    }

    // Auth defaults
    pub fn auth_click_delay() -> u64 {
        2_000
    }
    pub fn auth_redirect_timeout() -> u64 {
        45_000
    }

    // Pagination defaults
    pub fn pagination_load_timeout() -> u64 {
        10_000
    }
    pub fn pagination_visibility_timeout() -> u64 {
        3_000
    }
    pub fn poll_interval() -> u64 {
        300
    }
    pub fn poll_max_attempts() -> u64 {
        20
    }
    pub fn max_click_cycles() -> u64 {
        3
    }
    pub fn max_iterations() -> u64 {
        200
    }

    // Scroll defaults
    pub fn scroll_step_delay() -> u64 {
        300
    }
    pub fn scroll_after_delay() -> u64 {
        500
    }
    pub fn scroll_retry_delay() -> u64 {
        800
    }
    pub fn networkidle_fallback() -> u64 {
        1_500
    }
    pub fn view_switch_delay() -> u64 {
        300
    }
    pub fn wheel_steps() -> u64 {
        3
    }
    pub fn wheel_distance() -> u64 {
        1_200
    }

    // URL defaults
    pub fn base_url() -> String {
        "https://iris.infocasas.com.uy".into()
    }
    pub fn login_url() -> String {
        format!("{}/iniciar-sesion", base_url())
    }
    pub fn catalog_url() -> String {
        format!("{}/proyectos?country=1&order=promos%2Cpopularity", base_url())
    }

    // Storage defaults
    pub fn db_path() -> String {
        "irisbot.db".into()
    }
    pub fn artifacts_dir() -> String {
        "catalog_artifacts".into()
    }

    // Download defaults
    pub fn user_agent() -> String {
        "irisbot/1.0".into()
    }
    pub fn concurrent_downloads() -> usize {
        5
    }
    pub fn download_timeout() -> u64 {
        60
    }
    pub fn retry_count() -> u64 {
        3
    }
    pub fn retry_backoff() -> u64 {
        1_500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_placeholder_catalog_url() {
        let mut config = Config::default();
        config.urls.catalog = "https://example.com/proyectos".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_iterations() {
        let mut config = Config::default();
        config.pagination.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config.apply_env_from(|key| match key {
            "IRIS_EMAIL" => Some("user@test".to_string()),
            "CATALOG_MAX_PAGES" => Some("7".to_string()),
            "IRIS_HEADLESS" => Some("0".to_string()),
            "POLL_INTERVAL_MS" => Some("not-a-number".to_string()),
            _ => None,
        });

        assert_eq!(config.auth.email, "user@test");
        assert_eq!(config.pagination.max_iterations, 7);
        assert!(!config.browser.headless);
        // Unparseable values leave the default in place
        assert_eq!(config.pagination.poll_interval_ms, 300);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.urls.catalog, config.urls.catalog);
        assert_eq!(parsed.pagination.max_iterations, 200);
    }
}
