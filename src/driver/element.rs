use crate::state::DiscoveryState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Element position and size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Raw element produced by an extractor for one page visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateElement {
    /// Selector generated for the element
    pub selector: String,

    /// Lowercase tag name
    pub tag_name: String,

    /// Normalized visible text
    pub text_content: String,

    /// All element attributes
    pub attributes: BTreeMap<String, String>,

    /// Layout box, when the driver renders pages
    #[serde(default)]
    pub bounding_rect: Option<BoundingRect>,

    /// Resolved CSS properties, when the driver renders pages
    #[serde(default)]
    pub resolved_css: BTreeMap<String, String>,

    /// Context reported by the extractor (modal, hover, ...)
    #[serde(default)]
    pub discovery_hint: Option<DiscoveryState>,
}

impl CandidateElement {
    /// Builds a candidate with only a selector and tag
    pub fn new(selector: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            tag_name: tag_name.into(),
            text_content: String::new(),
            attributes: BTreeMap::new(),
            bounding_rect: None,
            resolved_css: BTreeMap::new(),
            discovery_hint: None,
        }
    }

    /// Adds an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Sets the text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = text.into();
        self
    }

    /// Returns an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
