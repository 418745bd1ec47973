/// Authentication state definitions
///
/// The executor walks `Idle -> Navigating -> ExecutingStep(0..n) -> Verifying`
/// and ends in either `Authenticated` or `Failed`.
use std::fmt;

/// Represents the current state of an authentication flow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    // ===== Active States =====
    /// Nothing has happened yet
    Idle,

    /// Loading the login page
    Navigating,

    /// Running the step at this index
    ExecutingStep(usize),

    /// Navigating to the target and applying success indicators
    Verifying,

    // ===== Terminal States =====
    /// The session is authenticated
    Authenticated,

    /// A mandatory step, the login navigation or verification failed
    Failed,
}

impl AuthState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Checks whether moving from this state to `next` is legal
    ///
    /// Steps only advance forward one index at a time, and any active state
    /// may fail.
    pub fn can_transition_to(&self, next: &AuthState) -> bool {
        use AuthState::*;
        match (self, next) {
            (Idle, Navigating) => true,
            (Navigating, ExecutingStep(0)) => true,
            (Navigating, Verifying) => true,
            (ExecutingStep(i), ExecutingStep(j)) => *j == i + 1,
            (ExecutingStep(_), Verifying) => true,
            (Verifying, Authenticated) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Short label for logs and progress messages
    pub fn label(&self) -> String {
        match self {
            Self::Idle => "idle".to_string(),
            Self::Navigating => "navigating".to_string(),
            Self::ExecutingStep(i) => format!("executing_step({})", i),
            Self::Verifying => "verifying".to_string(),
            Self::Authenticated => "authenticated".to_string(),
            Self::Failed => "failed".to_string(),
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
