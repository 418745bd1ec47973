//! Authentication flows
//!
//! An [`AuthFlow`] is an ordered, replayable list of typed steps that takes a
//! browser session from a login page to an authenticated state. The
//! [`AuthFlowExecutor`] replays a flow against a [`BrowserSession`] and decides
//! whether the session ended up authenticated.
//!
//! [`BrowserSession`]: crate::driver::BrowserSession

mod executor;
mod flow;
mod template;

pub use executor::{AuthFlowExecutor, AuthResult};
pub use flow::{load_auth_flow, parse_auth_flow, AuthFlow, AuthStep, Credentials, StepAction};
pub use template::{
    check_placeholder_syntax, contains_placeholder, resolve_placeholders, PASSWORD_PLACEHOLDER,
    USERNAME_PLACEHOLDER,
};
