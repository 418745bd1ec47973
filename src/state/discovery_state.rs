use serde::{Deserialize, Serialize};
use std::fmt;

/// The context in which an element was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryState {
    /// Present on initial page load
    Static,

    /// Present once the session is authenticated
    AfterLogin,

    /// Revealed by an interaction (click, expand)
    AfterInteraction,

    /// Inside a modal dialog
    Modal,

    /// Revealed on hover
    Hover,
}

impl DiscoveryState {
    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::AfterLogin => "after_login",
            Self::AfterInteraction => "after_interaction",
            Self::Modal => "modal",
            Self::Hover => "hover",
        }
    }

    /// Parses a state from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "static" => Some(Self::Static),
            "after_login" => Some(Self::AfterLogin),
            "after_interaction" => Some(Self::AfterInteraction),
            "modal" => Some(Self::Modal),
            "hover" => Some(Self::Hover),
            _ => None,
        }
    }

    /// Returns all discovery states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Static,
            Self::AfterLogin,
            Self::AfterInteraction,
            Self::Modal,
            Self::Hover,
        ]
    }
}

impl fmt::Display for DiscoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
