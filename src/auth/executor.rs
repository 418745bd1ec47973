//! Auth flow executor
//!
//! Replays an [`AuthFlow`] against a browser session:
//! 1. Navigate to the login URL
//! 2. Run each step in order, resolving credential placeholders
//! 3. Navigate to the target URL
//! 4. Apply success indicators (left the login path, or marker present)
//!
//! Optional steps that fail are skipped. Any other failure ends the run in
//! [`AuthState::Failed`] and aborts the remaining steps.

use crate::auth::template::resolve_placeholders;
use crate::auth::{AuthFlow, AuthStep, Credentials, StepAction};
use crate::config::{AuthConfig, BrowserConfig, CrawlConfig};
use crate::driver::{with_timeout, BrowserSession, DriverAction};
use crate::state::AuthState;
use crate::{ErrorDetail, ErrorKind, Result, ScoutError};
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Outcome of one auth flow run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResult {
    pub success: bool,

    /// URL the session ended on
    pub final_url: Option<String>,

    /// Why the flow failed; names the failed step when a step caused it
    pub error_message: Option<String>,

    #[serde(skip)]
    pub final_state: AuthState,

    /// Steps that ran successfully
    pub steps_completed: usize,

    /// Indexes of optional steps that failed and were skipped
    pub skipped_steps: Vec<usize>,
}

impl AuthResult {
    /// Error detail for progress events and reports
    pub fn error_detail(&self) -> Option<ErrorDetail> {
        self.error_message
            .as_ref()
            .map(|message| ErrorDetail::new(ErrorKind::Authentication, message.clone(), 1))
    }
}

/// Tracks the state machine of a single run
struct Machine {
    flow_id: String,
    state: AuthState,
}

impl Machine {
    fn new(flow_id: &str) -> Self {
        Self {
            flow_id: flow_id.to_string(),
            state: AuthState::Idle,
        }
    }

    fn advance(&mut self, next: AuthState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(ScoutError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Auth flow {}: {} -> {}", self.flow_id, self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Replays auth flows and verifies the resulting session
#[derive(Debug, Clone)]
pub struct AuthFlowExecutor {
    config: AuthConfig,
    step_timeout: Duration,
    navigation_timeout: Duration,
}

impl AuthFlowExecutor {
    pub fn new(auth: &AuthConfig, browser: &BrowserConfig) -> Self {
        Self {
            config: auth.clone(),
            step_timeout: browser.step_timeout(),
            navigation_timeout: browser.navigation_timeout(),
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(&config.auth, &config.browser)
    }

    /// Runs `flow` in `session`, then lands on `target_url`
    ///
    /// The session stays open and authenticated on success so the caller can
    /// reuse it for every following page visit.
    pub async fn execute(
        &self,
        session: &mut dyn BrowserSession,
        flow: &AuthFlow,
        target_url: &str,
    ) -> AuthResult {
        let mut machine = Machine::new(&flow.id);
        let mut steps_completed = 0;
        let mut skipped_steps = Vec::new();

        tracing::info!(
            "Authenticating with flow '{}' ({} steps)",
            flow.id,
            flow.steps.len()
        );

        let outcome = self
            .run(
                session,
                flow,
                target_url,
                &mut machine,
                &mut steps_completed,
                &mut skipped_steps,
            )
            .await;

        let error_message = match outcome {
            Ok(()) => None,
            Err(message) => {
                if !machine.state.is_terminal() {
                    machine.state = AuthState::Failed;
                }
                Some(message)
            }
        };

        let result = AuthResult {
            success: machine.state.is_success(),
            final_url: session.current_url(),
            error_message,
            final_state: machine.state,
            steps_completed,
            skipped_steps,
        };

        match &result.error_message {
            None => tracing::info!("Auth flow '{}' succeeded", flow.id),
            Some(message) => tracing::warn!("Auth flow '{}' failed: {}", flow.id, message),
        }
        result
    }

    async fn run(
        &self,
        session: &mut dyn BrowserSession,
        flow: &AuthFlow,
        target_url: &str,
        machine: &mut Machine,
        steps_completed: &mut usize,
        skipped_steps: &mut Vec<usize>,
    ) -> std::result::Result<(), String> {
        machine.advance(AuthState::Navigating).map_err(|e| e.to_string())?;
        with_timeout(
            "navigate to login page",
            self.navigation_timeout,
            session.navigate(&flow.login_url, self.navigation_timeout),
        )
        .await
        .map_err(|e| format!("Could not load login page {}: {}", flow.login_url, e))?;

        for (index, step) in flow.steps.iter().enumerate() {
            machine
                .advance(AuthState::ExecutingStep(index))
                .map_err(|e| e.to_string())?;
            match step.action.loggable_value() {
                Some(value) => tracing::debug!("Running {} with '{}'", step.describe(index), value),
                None => tracing::debug!("Running {}", step.describe(index)),
            }

            match self.run_step(session, step, &flow.credentials).await {
                Ok(()) => *steps_completed += 1,
                Err(e) if step.optional => {
                    tracing::warn!("Optional {} failed, continuing: {}", step.describe(index), e);
                    skipped_steps.push(index);
                }
                Err(e) => {
                    machine.advance(AuthState::Failed).map_err(|e| e.to_string())?;
                    return Err(format!("{} failed: {}", step.describe(index), e));
                }
            }
        }

        machine.advance(AuthState::Verifying).map_err(|e| e.to_string())?;
        let navigation_error = with_timeout(
            "post-auth navigation",
            self.navigation_timeout,
            session.navigate(target_url, self.navigation_timeout),
        )
        .await
        .err()
        .map(|e| {
            tracing::warn!("Post-auth navigation to {} failed: {}", target_url, e);
            format!("Post-auth navigation to {} failed: {}", target_url, e)
        });

        self.verify(session, flow, navigation_error).await?;
        machine
            .advance(AuthState::Authenticated)
            .map_err(|e| e.to_string())
    }

    async fn run_step(
        &self,
        session: &mut dyn BrowserSession,
        step: &AuthStep,
        credentials: &Credentials,
    ) -> Result<()> {
        let timeout = step
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.step_timeout);

        let action = match &step.action {
            StepAction::Type { selector, value } => DriverAction::Fill {
                selector: selector.clone(),
                value: resolve_placeholders(value, credentials),
            },
            StepAction::Select { selector, value } => DriverAction::Select {
                selector: selector.clone(),
                value: resolve_placeholders(value, credentials),
            },
            StepAction::Click { selector } => DriverAction::Click {
                selector: selector.clone(),
            },
            StepAction::Check { selector } => DriverAction::Check {
                selector: selector.clone(),
            },
            StepAction::WaitFor { selector } => DriverAction::WaitForSelector {
                selector: selector.clone(),
            },
            StepAction::Wait { duration_ms } => {
                tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
                return Ok(());
            }
            StepAction::Navigate { url } => {
                return with_timeout(
                    &format!("navigate {}", url),
                    timeout,
                    session.navigate(url, timeout),
                )
                .await;
            }
        };

        let operation = format!("{} {}", action.name(), action.selector());
        with_timeout(&operation, timeout, session.perform_action(&action, timeout)).await
    }

    /// Applies the success indicators to the page the session ended on
    ///
    /// Passing either indicator is enough, even if the post-auth navigation
    /// failed. When neither can be evaluated the session counts as
    /// authenticated only if that navigation raised no error.
    async fn verify(
        &self,
        session: &mut dyn BrowserSession,
        flow: &AuthFlow,
        navigation_error: Option<String>,
    ) -> std::result::Result<(), String> {
        let current = session.current_url();
        let left_login = current.as_deref().map(|url| !self.is_login_url(url));

        let marker = flow
            .authenticated_marker
            .as_deref()
            .or(self.config.authenticated_marker.as_deref());
        let marker_present = match marker {
            Some(selector) => match with_timeout(
                "evaluate authenticated marker",
                self.step_timeout,
                session.evaluate_selector(selector),
            )
            .await
            {
                Ok(count) => Some(count > 0),
                Err(e) => {
                    tracing::debug!("Could not evaluate marker {}: {}", selector, e);
                    None
                }
            },
            None => None,
        };

        match (left_login, marker_present) {
            (Some(true), _) | (_, Some(true)) => Ok(()),
            (None, None) => match navigation_error {
                Some(message) => Err(message),
                None => {
                    tracing::debug!("No success indicator could be evaluated; assuming authenticated");
                    Ok(())
                }
            },
            _ => Err(format!(
                "Still on a login page after submitting credentials ({})",
                current.unwrap_or_else(|| "unknown URL".to_string())
            )),
        }
    }

    /// Returns true if the URL still looks like a login page
    pub fn is_login_url(&self, url: &str) -> bool {
        let path = Url::parse(url)
            .map(|u| u.path().to_ascii_lowercase())
            .unwrap_or_else(|_| url.to_ascii_lowercase());
        self.config
            .login_path_tokens
            .iter()
            .any(|token| path.contains(&token.to_ascii_lowercase()))
    }
}
