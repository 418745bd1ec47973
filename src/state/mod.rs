//! State module for tracking authentication progress and element context
//!
//! # Components
//!
//! - `AuthState`: The authentication state machine (idle, navigating, executing steps, verifying, done)
//! - `DiscoveryState`: The context in which an element was discovered

mod auth_state;
mod discovery_state;

// Re-export main types
pub use auth_state::AuthState;
pub use discovery_state::DiscoveryState;
