//! Driver port: the narrow browser-automation surface the core calls through
//!
//! The core never talks to a browser directly. It opens sessions through a
//! [`Driver`] and drives each [`BrowserSession`] with a handful of fallible,
//! time-bounded operations. Sessions are always held through a
//! [`SessionGuard`] so they are closed on every exit path.
//!
//! [`HttpDriver`] is a static-HTML implementation backed by reqwest and
//! scraper. It cannot run scripts, but it navigates, submits forms, keeps
//! cookies and counts selector matches, which is enough for server-rendered
//! sites and for tests.

mod element;
mod extract;
mod guard;
mod http;

pub use element::{BoundingRect, CandidateElement};
pub use extract::extract_candidates_from_html;
pub use guard::SessionGuard;
pub use http::{build_http_client, HttpDriver, HttpSession};

use crate::config::BrowserConfig;
use crate::{Result, ScoutError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Options used when opening a browser session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    pub args: Vec<String>,
    pub user_agent: Option<String>,
}

impl From<&BrowserConfig> for SessionOptions {
    fn from(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            args: config.args.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// A single page interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverAction {
    /// Type a value into an input
    Fill { selector: String, value: String },
    /// Click an element
    Click { selector: String },
    /// Choose an option in a select element
    Select { selector: String, value: String },
    /// Tick a checkbox or radio button
    Check { selector: String },
    /// Wait until an element is present
    WaitForSelector { selector: String },
}

impl DriverAction {
    /// The selector this action targets
    pub fn selector(&self) -> &str {
        match self {
            Self::Fill { selector, .. }
            | Self::Click { selector }
            | Self::Select { selector, .. }
            | Self::Check { selector }
            | Self::WaitForSelector { selector } => selector,
        }
    }

    /// Short action name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fill { .. } => "fill",
            Self::Click { .. } => "click",
            Self::Select { .. } => "select",
            Self::Check { .. } => "check",
            Self::WaitForSelector { .. } => "wait_for",
        }
    }
}

/// Factory for browser sessions
#[async_trait]
pub trait Driver: Send + Sync {
    /// Driver name for logs
    fn name(&self) -> &str;

    /// Opens a new, isolated browser session
    async fn open_session(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>>;
}

/// One browser context; cookies persist across calls on the same session
#[async_trait]
pub trait BrowserSession: Send {
    /// Loads a URL
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Performs an interaction on the loaded page
    async fn perform_action(&mut self, action: &DriverAction, timeout: Duration) -> Result<()>;

    /// Counts elements matching a selector on the loaded page
    async fn evaluate_selector(&mut self, selector: &str) -> Result<usize>;

    /// Returns raw candidate elements from the loaded page
    async fn extract_candidates(&mut self) -> Result<Vec<CandidateElement>>;

    /// URL of the loaded page, if known
    fn current_url(&self) -> Option<String>;

    /// Captures the loaded page as an image
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Releases the session
    async fn close(&mut self) -> Result<()>;
}

/// Runs a driver call with a hard deadline
///
/// An elapsed deadline becomes [`ScoutError::Timeout`] naming `operation`.
pub async fn with_timeout<T, F>(operation: &str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ScoutError::Timeout {
            operation: operation.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_action_selector_and_name() {
        let action = DriverAction::Fill {
            selector: "#username".to_string(),
            value: "alice".to_string(),
        };
        assert_eq!(action.selector(), "#username");
        assert_eq!(action.name(), "fill");

        let action = DriverAction::WaitForSelector {
            selector: ".ready".to_string(),
        };
        assert_eq!(action.selector(), ".ready");
        assert_eq!(action.name(), "wait_for");
    }

    #[test]
    fn test_session_options_from_config() {
        let config = BrowserConfig::default();
        let options = SessionOptions::from(&config);
        assert!(options.headless);
        assert!(options.args.contains(&"--no-sandbox".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_maps_elapsed() {
        let result: Result<()> = with_timeout("slow op", Duration::from_millis(200), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("slow op"));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let result = with_timeout("fast op", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
