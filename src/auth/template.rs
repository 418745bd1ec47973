//! Credential placeholders
//!
//! Step values reference credentials with exactly one syntax: `{username}` and
//! `{password}`. The shell-style `${username}` form is rejected when a flow is
//! validated so that a flow never silently types a literal `$`.

use crate::auth::Credentials;
use crate::{Result, ScoutError};

pub const USERNAME_PLACEHOLDER: &str = "{username}";
pub const PASSWORD_PLACEHOLDER: &str = "{password}";

/// Returns true if the value references a credential
pub fn contains_placeholder(value: &str) -> bool {
    value.contains(USERNAME_PLACEHOLDER) || value.contains(PASSWORD_PLACEHOLDER)
}

/// Substitutes credential placeholders with their real values
///
/// # Example
///
/// ```
/// use selector_scout::auth::{resolve_placeholders, Credentials};
///
/// let creds = Credentials::new("alice", "secret");
/// assert_eq!(resolve_placeholders("{username}@corp", &creds), "alice@corp");
/// ```
pub fn resolve_placeholders(value: &str, credentials: &Credentials) -> String {
    // Single left-to-right pass: substituted text is never scanned again
    let mut resolved = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('{') {
        resolved.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix(USERNAME_PLACEHOLDER) {
            resolved.push_str(&credentials.username);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(PASSWORD_PLACEHOLDER) {
            resolved.push_str(&credentials.password);
            rest = after;
        } else {
            resolved.push('{');
            rest = &tail[1..];
        }
    }
    resolved.push_str(rest);
    resolved
}

/// Rejects the unsupported `${...}` placeholder form
pub fn check_placeholder_syntax(value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(ScoutError::Validation(format!(
            "unsupported placeholder syntax in '{}'; use {} or {}",
            value, USERNAME_PLACEHOLDER, PASSWORD_PLACEHOLDER
        )));
    }
    Ok(())
}
