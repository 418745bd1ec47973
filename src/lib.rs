//! Selector-Scout: durable selector discovery for browser tests
//!
//! This crate discovers interactive elements on web pages, optionally behind a
//! login wall, and scores the selectors it produces for durability. The
//! pipeline is: authenticate, crawl the supplied URLs, extract candidate
//! elements per page, score and deduplicate them, and emit a report.

pub mod auth;
pub mod config;
pub mod crawler;
pub mod driver;
pub mod output;
pub mod quality;
pub mod state;
pub mod storage;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for Selector-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("TLS error for {url}: {message}")]
    Ssl { url: String, message: String },

    #[error("Selector matched no elements: {selector}")]
    SelectorNotFound { selector: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::AuthState,
        to: state::AuthState,
    },
}

impl ScoutError {
    /// Classifies this error into the closed error taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Browser(_) | Self::Io(_) => ErrorKind::Browser,
            Self::Ssl { .. } => ErrorKind::Ssl,
            Self::SelectorNotFound { .. } => ErrorKind::SelectorNotFound,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Validation(_)
            | Self::Config(_)
            | Self::Serialization(_)
            | Self::InvalidTransition { .. } => ErrorKind::Validation,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Closed classification of every failure the core can report
///
/// The category strings returned by [`ErrorKind::category`] are a stable
/// contract consumed by presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[serde(rename = "network_error")]
    Network,
    #[serde(rename = "timeout_error")]
    Timeout,
    #[serde(rename = "browser_error")]
    Browser,
    #[serde(rename = "ssl_error")]
    Ssl,
    SelectorNotFound,
    #[serde(rename = "authentication_error")]
    Authentication,
    #[serde(rename = "validation_error")]
    Validation,
    #[serde(rename = "storage_error")]
    Storage,
}

impl ErrorKind {
    /// Returns the stable category string for this kind
    pub fn category(&self) -> &'static str {
        match self {
            Self::Network => "network_error",
            Self::Timeout => "timeout_error",
            Self::Browser => "browser_error",
            Self::Ssl => "ssl_error",
            Self::SelectorNotFound => "selector_not_found",
            Self::Authentication => "authentication_error",
            Self::Validation => "validation_error",
            Self::Storage => "storage_error",
        }
    }

    /// Parses a kind from its category string
    pub fn from_category(s: &str) -> Option<Self> {
        match s {
            "network_error" => Some(Self::Network),
            "timeout_error" => Some(Self::Timeout),
            "browser_error" => Some(Self::Browser),
            "ssl_error" => Some(Self::Ssl),
            "selector_not_found" => Some(Self::SelectorNotFound),
            "authentication_error" => Some(Self::Authentication),
            "validation_error" => Some(Self::Validation),
            "storage_error" => Some(Self::Storage),
            _ => None,
        }
    }

    /// Returns all kinds
    pub fn all() -> Vec<Self> {
        vec![
            Self::Network,
            Self::Timeout,
            Self::Browser,
            Self::Ssl,
            Self::SelectorNotFound,
            Self::Authentication,
            Self::Validation,
            Self::Storage,
        ]
    }

    /// Kinds that are retried when no explicit set is configured
    pub fn default_retryable() -> Vec<Self> {
        vec![Self::Network, Self::Timeout, Self::Browser, Self::Ssl]
    }

    /// Returns true if errors of this kind may ever be retried
    ///
    /// A structurally invalid selector or step cannot fix itself, so these
    /// kinds are terminal no matter what a retry configuration says.
    pub fn can_retry(&self) -> bool {
        !matches!(
            self,
            Self::SelectorNotFound | Self::Validation | Self::Authentication | Self::Storage
        )
    }

    /// Returns the fixed remediation suggestions for this kind
    pub fn suggestions(&self) -> Vec<String> {
        let items: &[&str] = match self {
            Self::Network => &[
                "Verify the target URL is reachable from the crawl host",
                "Check proxy, DNS and firewall configuration",
            ],
            Self::Timeout => &[
                "Increase navigation-timeout-ms or step-timeout-ms",
                "Investigate target availability and response times",
            ],
            Self::Browser => &[
                "Check that the browser driver is installed and can start",
                "Review browser launch arguments such as sandbox flags",
            ],
            Self::Ssl => &[
                "Verify the site's TLS certificate chain",
                "Use the correct scheme (http or https) for the target",
            ],
            Self::SelectorNotFound => &[
                "Regenerate the selector against the current page",
                "Check that the element renders without user interaction",
            ],
            Self::Authentication => &[
                "Check credentials",
                "Verify login URL accessibility",
                "Confirm step selectors match the login form",
            ],
            Self::Validation => &[
                "Fix the malformed selector or step definition",
                "Use {username} and {password} as credential placeholders",
            ],
            Self::Storage => &[
                "Check the database path and its permissions",
                "Ensure no other process holds a write lock on the database",
            ],
        };
        items.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category())
    }
}

/// Contract shape for every terminal failure returned from the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable category string (see [`ErrorKind::category`])
    pub category: String,

    /// Classified kind
    pub kind: ErrorKind,

    /// Human-readable message
    pub message: String,

    /// Short, actionable remediation list
    pub suggestions: Vec<String>,

    /// Number of attempts made before giving up
    pub attempts: u32,
}

impl ErrorDetail {
    /// Builds a detail record for a kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            category: kind.category().to_string(),
            kind,
            message: message.into(),
            suggestions: kind.suggestions(),
            attempts,
        }
    }

    /// Builds a detail record from an error
    pub fn from_error(error: &ScoutError, attempts: u32) -> Self {
        Self::new(error.kind(), error.to_string(), attempts)
    }
}

/// Result type alias for Selector-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use auth::{AuthFlow, AuthFlowExecutor, AuthResult, AuthStep};
pub use config::CrawlConfig;
pub use crawler::{CrawlJob, CrawlOrchestrator, CrawlReport, RetryPolicy};
pub use quality::{CrossPageValidator, ScoredElement, SelectorQualityScorer};
pub use state::{AuthState, DiscoveryState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for kind in ErrorKind::all() {
            assert_eq!(ErrorKind::from_category(kind.category()), Some(kind));
        }
        assert_eq!(ErrorKind::from_category("bogus"), None);
    }

    #[test]
    fn test_serde_uses_category_strings() {
        for kind in ErrorKind::all() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.category()));
        }
    }

    #[test]
    fn test_error_classification() {
        let err = ScoutError::Timeout {
            operation: "navigate".to_string(),
            timeout_ms: 100,
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let err = ScoutError::SelectorNotFound {
            selector: "#gone".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::SelectorNotFound);
        assert!(!err.kind().can_retry());

        let err = ScoutError::Config(ConfigError::Validation("bad".to_string()));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_every_kind_has_suggestions() {
        for kind in ErrorKind::all() {
            assert!(!kind.suggestions().is_empty(), "{} has none", kind);
        }
    }

    #[test]
    fn test_error_detail_from_error() {
        let err = ScoutError::Network {
            url: "https://example.com".to_string(),
            message: "connection refused".to_string(),
        };
        let detail = ErrorDetail::from_error(&err, 3);
        assert_eq!(detail.category, "network_error");
        assert_eq!(detail.attempts, 3);
        assert!(detail.message.contains("connection refused"));
    }
}
