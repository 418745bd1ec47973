use crate::ErrorKind;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Selector-Scout
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub output: OutputConfig,
}

impl CrawlConfig {
    /// Builds a configuration with default sections and the given output paths
    pub fn with_output(output: OutputConfig) -> Self {
        Self {
            browser: BrowserConfig::default(),
            retry: RetryConfig::default(),
            auth: AuthConfig::default(),
            output,
        }
    }
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Run the browser without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Extra launch arguments handed to the driver (sandbox flags etc.)
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,

    /// Timeout for a single page visit (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Timeout for a single auth step or driver action (milliseconds)
    #[serde(rename = "step-timeout-ms", default = "default_step_timeout")]
    pub step_timeout_ms: u64,

    /// Optional user agent override
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            args: default_browser_args(),
            navigation_timeout_ms: default_navigation_timeout(),
            step_timeout_ms: default_step_timeout(),
            user_agent: None,
        }
    }
}

/// Retry and backoff configuration for page visits
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before each retry; the last value repeats when the list is short
    #[serde(rename = "retry-delays-ms", default = "default_retry_delays")]
    pub retry_delays_ms: Vec<u64>,

    /// Error kinds worth retrying
    #[serde(default = "ErrorKind::default_retryable")]
    pub retryable: Vec<ErrorKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delays_ms: default_retry_delays(),
            retryable: ErrorKind::default_retryable(),
        }
    }
}

/// Authentication success detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// URL fragments that indicate the browser is still on a login page
    #[serde(rename = "login-path-tokens", default = "default_login_tokens")]
    pub login_path_tokens: Vec<String>,

    /// Selector that is only present once authenticated
    #[serde(rename = "authenticated-marker", default)]
    pub authenticated_marker: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_path_tokens: default_login_tokens(),
            authenticated_marker: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown report file
    #[serde(rename = "report-path")]
    pub report_path: String,

    /// Optional path for a JSON copy of the report
    #[serde(rename = "json-path", default)]
    pub json_path: Option<String>,
}

fn default_headless() -> bool {
    true
}

fn default_browser_args() -> Vec<String> {
    vec![
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
    ]
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_step_timeout() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delays() -> Vec<u64> {
    vec![3_000, 8_000]
}

fn default_login_tokens() -> Vec<String> {
    ["/login", "/signin", "/sign-in", "/auth"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
