use crate::auth::template::{check_placeholder_syntax, contains_placeholder};
use crate::{ConfigError, Result, ScoutError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use url::Url;

const MAX_WAIT_MS: u64 = 60_000;

/// An ordered, replayable sequence of browser actions that reaches an
/// authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthFlow {
    pub id: String,

    /// Page the flow starts on
    pub login_url: String,

    /// Selector only present once logged in; overrides the config marker
    #[serde(default)]
    pub authenticated_marker: Option<String>,

    pub credentials: Credentials,

    /// Steps in execution order
    pub steps: Vec<AuthStep>,
}

/// Login credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One step of an auth flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthStep {
    #[serde(flatten)]
    pub action: StepAction,

    /// Failure of an optional step is logged and skipped
    #[serde(default)]
    pub optional: bool,

    /// Per-step timeout; falls back to the configured step timeout
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Human-readable label used in logs and error messages
    #[serde(default)]
    pub description: Option<String>,
}

/// What a step does; each kind carries only the fields it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StepAction {
    /// Type a value (placeholders allowed) into an input
    Type { selector: String, value: String },
    /// Click an element
    Click { selector: String },
    /// Choose an option (placeholders allowed)
    Select { selector: String, value: String },
    /// Tick a checkbox
    Check { selector: String },
    /// Pause for a fixed duration
    Wait {
        #[serde(rename = "duration-ms")]
        duration_ms: u64,
    },
    /// Wait until an element is present
    WaitFor { selector: String },
    /// Load another URL in the same session
    Navigate { url: String },
}

impl StepAction {
    /// The step kind as written in flow files
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Type { .. } => "type",
            Self::Click { .. } => "click",
            Self::Select { .. } => "select",
            Self::Check { .. } => "check",
            Self::Wait { .. } => "wait",
            Self::WaitFor { .. } => "wait-for",
            Self::Navigate { .. } => "navigate",
        }
    }

    /// The selector this step targets, if any
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Type { selector, .. }
            | Self::Click { selector }
            | Self::Select { selector, .. }
            | Self::Check { selector }
            | Self::WaitFor { selector } => Some(selector),
            Self::Wait { .. } | Self::Navigate { .. } => None,
        }
    }

    /// The value a step enters, safe to log
    ///
    /// Values that carry credential placeholders are replaced wholesale.
    pub fn loggable_value(&self) -> Option<&str> {
        match self {
            Self::Type { value, .. } | Self::Select { value, .. } => {
                if contains_placeholder(value) {
                    Some("<redacted>")
                } else {
                    Some(value)
                }
            }
            _ => None,
        }
    }
}

impl AuthStep {
    /// Builds a mandatory step with no timeout override
    pub fn new(action: StepAction) -> Self {
        Self {
            action,
            optional: false,
            timeout_ms: None,
            description: None,
        }
    }

    /// Marks the step optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Describes the step for logs; never includes typed values
    pub fn describe(&self, index: usize) -> String {
        let target = match &self.action {
            StepAction::Wait { duration_ms } => format!("{}ms", duration_ms),
            StepAction::Navigate { url } => url.clone(),
            other => other.selector().unwrap_or_default().to_string(),
        };
        match &self.description {
            Some(label) => format!("Step {} '{}' ({} {})", index + 1, label, self.action.kind(), target),
            None => format!("Step {} ({} {})", index + 1, self.action.kind(), target),
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        if let Some(selector) = self.action.selector() {
            if selector.trim().is_empty() {
                return Err(ScoutError::Validation(format!(
                    "{} has an empty selector",
                    self.describe(index)
                )));
            }
        }

        match &self.action {
            StepAction::Type { value, .. } | StepAction::Select { value, .. } => {
                check_placeholder_syntax(value)?;
            }
            StepAction::Wait { duration_ms } if *duration_ms > MAX_WAIT_MS => {
                return Err(ScoutError::Validation(format!(
                    "{} waits longer than {}ms",
                    self.describe(index),
                    MAX_WAIT_MS
                )));
            }
            StepAction::Navigate { url } if url.trim().is_empty() => {
                return Err(ScoutError::Validation(format!(
                    "{} has an empty URL",
                    self.describe(index)
                )));
            }
            _ => {}
        }

        if self.timeout_ms == Some(0) {
            return Err(ScoutError::Validation(format!(
                "{} has a zero timeout",
                self.describe(index)
            )));
        }

        Ok(())
    }
}

impl AuthFlow {
    /// Checks that the flow is well-formed before it is executed
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ScoutError::Validation("auth flow id cannot be empty".to_string()));
        }

        let login = Url::parse(&self.login_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.login_url, e)))?;
        if !matches!(login.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: login-url must use http or https",
                self.login_url
            ))
            .into());
        }

        if self.steps.is_empty() {
            return Err(ScoutError::Validation(format!(
                "auth flow '{}' has no steps",
                self.id
            )));
        }

        if matches!(&self.authenticated_marker, Some(m) if m.trim().is_empty()) {
            return Err(ScoutError::Validation(
                "authenticated-marker cannot be empty".to_string(),
            ));
        }

        for (index, step) in self.steps.iter().enumerate() {
            step.validate(index)?;
        }

        Ok(())
    }
}

/// Parses and validates an auth flow from TOML text
pub fn parse_auth_flow(content: &str) -> Result<AuthFlow> {
    let flow: AuthFlow = toml::from_str(content).map_err(ConfigError::from)?;
    flow.validate()?;
    Ok(flow)
}

/// Loads and validates an auth flow file
///
/// # Example
///
/// ```no_run
/// use selector_scout::auth::load_auth_flow;
/// use std::path::Path;
///
/// let flow = load_auth_flow(Path::new("login.toml")).unwrap();
/// println!("{} steps", flow.steps.len());
/// ```
pub fn load_auth_flow(path: &Path) -> Result<AuthFlow> {
    let content = std::fs::read_to_string(path).map_err(ConfigError::from)?;
    parse_auth_flow(&content)
}
