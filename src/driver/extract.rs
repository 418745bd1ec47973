//! Static candidate extraction for server-rendered HTML
//!
//! Picks interactive elements out of a parsed document and builds a selector
//! for each, preferring test ids, then ids, accessible labels, names, classes
//! and finally structural position.

use crate::driver::CandidateElement;
use crate::quality::TEST_ID_ATTRIBUTES;
use crate::state::DiscoveryState;
use scraper::{ElementRef, Html, Selector};

const INTERACTIVE: &str = "a[href], button, input, select, textarea, summary, \
    [role=button], [role=link], [role=checkbox], [role=tab], [role=menuitem], \
    [data-testid], [data-test-id], [data-test], [data-cy], [data-qa], [onclick]";

const MAX_TEXT_LEN: usize = 100;

/// Extracts candidate elements from an HTML document
///
/// # Example
///
/// ```
/// use selector_scout::driver::extract_candidates_from_html;
///
/// let html = r#"<html><body><button id="save">Save</button></body></html>"#;
/// let candidates = extract_candidates_from_html(html);
/// assert_eq!(candidates[0].selector, "#save");
/// ```
pub fn extract_candidates_from_html(html: &str) -> Vec<CandidateElement> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(INTERACTIVE) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|el| !is_hidden_input(el))
        .map(|el| to_candidate(&el))
        .collect()
}

fn to_candidate(el: &ElementRef) -> CandidateElement {
    let attributes = el
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    CandidateElement {
        selector: build_selector(el),
        tag_name: el.value().name().to_string(),
        text_content: normalize_text(el),
        attributes,
        bounding_rect: None,
        resolved_css: Default::default(),
        discovery_hint: if inside_dialog(el) {
            Some(DiscoveryState::Modal)
        } else {
            None
        },
    }
}

fn is_hidden_input(el: &ElementRef) -> bool {
    el.value().name() == "input"
        && el
            .value()
            .attr("type")
            .map(|t| t.eq_ignore_ascii_case("hidden"))
            .unwrap_or(false)
}

fn inside_dialog(el: &ElementRef) -> bool {
    el.ancestors().filter_map(ElementRef::wrap).any(|a| {
        a.value().name() == "dialog"
            || a.value().attr("role") == Some("dialog")
            || a.value().attr("aria-modal") == Some("true")
    })
}

fn normalize_text(el: &ElementRef) -> String {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_TEXT_LEN).collect()
}

/// Builds the most durable selector available for an element
pub(crate) fn build_selector(el: &ElementRef) -> String {
    let tag = el.value().name();

    for attr in TEST_ID_ATTRIBUTES {
        if let Some(value) = el.value().attr(attr) {
            return format!("[{}=\"{}\"]", attr, escape_value(value));
        }
    }

    if let Some(id) = el.value().id() {
        if is_css_identifier(id) {
            return format!("#{}", id);
        }
        return format!("[id=\"{}\"]", escape_value(id));
    }

    if let Some(label) = el.value().attr("aria-label") {
        return format!("{}[aria-label=\"{}\"]", tag, escape_value(label));
    }

    if let Some(name) = el.value().attr("name") {
        return format!("{}[name=\"{}\"]", tag, escape_value(name));
    }

    let first_class = el
        .value()
        .attr("class")
        .and_then(|c| c.split_whitespace().find(|c| is_css_identifier(c)));
    if let Some(class) = first_class {
        return format!("{}.{}", tag, class);
    }

    structural_selector(el)
}

fn structural_selector(el: &ElementRef) -> String {
    let tag = el.value().name();
    let position = el
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|s| s.value().name() == tag)
        .count()
        + 1;
    let own = format!("{}:nth-of-type({})", tag, position);

    match el.parent().and_then(ElementRef::wrap) {
        Some(parent) => match parent.value().id().filter(|id| is_css_identifier(id)) {
            Some(id) => format!("#{} > {}", id, own),
            None => format!("{} > {}", parent.value().name(), own),
        },
        None => own,
    }
}

fn is_css_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        // A leading dash must be followed by a letter or underscore
        Some('-') => match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        },
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
