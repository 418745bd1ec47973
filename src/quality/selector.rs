//! Static analysis of CSS selector text
//!
//! The scorer needs two facts about a selector without a browser: which
//! strategy its subject (rightmost compound) relies on, and how many
//! combinators chain its compounds together. Both are read off the raw
//! text, ignoring anything inside brackets, parentheses or quotes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attributes reserved for test automation
pub const TEST_ID_ATTRIBUTES: &[&str] = &["data-testid", "data-test-id", "data-test", "data-cy", "data-qa"];

const SEMANTIC_ATTRIBUTES: &[&str] = &[
    "role", "name", "title", "alt", "placeholder", "type", "for", "href", "label",
];

/// How a selector identifies its target, from most to least durable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorStrategy {
    TestId,
    Id,
    Semantic,
    ClassName,
    Structural,
}

impl SelectorStrategy {
    /// Durability score for the strategy
    pub fn stability_score(&self) -> f64 {
        match self {
            Self::TestId => 1.0,
            Self::Id => 0.85,
            Self::Semantic => 0.7,
            Self::ClassName => 0.5,
            Self::Structural => 0.2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TestId => "test-id",
            Self::Id => "id",
            Self::Semantic => "semantic",
            Self::ClassName => "class",
            Self::Structural => "structural",
        }
    }

    pub fn all() -> [Self; 5] {
        [
            Self::TestId,
            Self::Id,
            Self::Semantic,
            Self::ClassName,
            Self::Structural,
        ]
    }
}

impl fmt::Display for SelectorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Facts about a selector used for scoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorProfile {
    pub strategy: SelectorStrategy,

    /// Combinators in the longest comma-separated group
    pub combinators: usize,

    /// True for a lone type selector such as `button`
    pub bare_tag: bool,
}

/// Scanner state shared by the passes below
#[derive(Default)]
struct Nesting {
    brackets: usize,
    parens: usize,
    quote: Option<char>,
}

impl Nesting {
    /// Feeds one char; returns true when it sits at the top level
    fn step(&mut self, c: char) -> bool {
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return false;
        }
        match c {
            '"' | '\'' if self.brackets > 0 || self.parens > 0 => {
                self.quote = Some(c);
                false
            }
            '[' => {
                self.brackets += 1;
                false
            }
            ']' => {
                self.brackets = self.brackets.saturating_sub(1);
                false
            }
            '(' => {
                self.parens += 1;
                false
            }
            ')' => {
                self.parens = self.parens.saturating_sub(1);
                false
            }
            _ => self.brackets == 0 && self.parens == 0,
        }
    }
}

fn is_combinator(c: char) -> bool {
    matches!(c, '>' | '+' | '~')
}

/// Splits a selector into its compounds, per comma group
fn compound_groups(selector: &str) -> Vec<Vec<String>> {
    let mut groups = Vec::new();
    let mut compounds: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut nesting = Nesting::default();

    for c in selector.chars() {
        let top = nesting.step(c);
        if top && c == ',' {
            if !current.trim().is_empty() {
                compounds.push(current.trim().to_string());
            }
            groups.push(std::mem::take(&mut compounds));
            current.clear();
        } else if top && (c.is_whitespace() || is_combinator(c)) {
            if !current.trim().is_empty() {
                compounds.push(current.trim().to_string());
            }
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        compounds.push(current.trim().to_string());
    }
    groups.push(compounds);
    groups.retain(|g| !g.is_empty());
    groups
}

/// Counts combinators, treating whitespace between compounds as descendant
fn count_combinators(selector: &str) -> usize {
    let mut max = 0;
    let mut count = 0;
    let mut nesting = Nesting::default();
    let mut in_compound = false;
    let mut pending_space = false;

    for c in selector.chars() {
        let top = nesting.step(c);
        if top && c == ',' {
            max = max.max(count);
            count = 0;
            in_compound = false;
            pending_space = false;
        } else if top && c.is_whitespace() {
            if in_compound {
                pending_space = true;
            }
        } else if top && is_combinator(c) {
            count += 1;
            in_compound = false;
            pending_space = false;
        } else {
            if pending_space {
                count += 1;
                pending_space = false;
            }
            in_compound = true;
        }
    }
    max.max(count)
}

/// Attribute names referenced by a compound, lowercased
fn attribute_names(compound: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = compound;
    while let Some(start) = rest.find('[') {
        let after = &rest[start + 1..];
        let end = after
            .find(|c: char| matches!(c, '=' | '~' | '|' | '^' | '$' | '*' | ']'))
            .unwrap_or(after.len());
        names.push(after[..end].trim().to_ascii_lowercase());
        rest = &after[end..];
    }
    names
}

/// Characters of a compound outside brackets, parens and quotes
fn top_level_text(compound: &str) -> String {
    let mut nesting = Nesting::default();
    compound.chars().filter(|c| nesting.step(*c)).collect()
}

fn classify_compound(compound: &str) -> SelectorStrategy {
    let attrs = attribute_names(compound);
    let bare = top_level_text(compound);

    if attrs.iter().any(|a| TEST_ID_ATTRIBUTES.contains(&a.as_str())) {
        return SelectorStrategy::TestId;
    }
    if bare.contains(":nth-") || bare.contains(":first-") || bare.contains(":last-") {
        return SelectorStrategy::Structural;
    }
    if bare.contains('#') || attrs.iter().any(|a| a == "id") {
        return SelectorStrategy::Id;
    }
    if attrs
        .iter()
        .any(|a| a.starts_with("aria-") || SEMANTIC_ATTRIBUTES.contains(&a.as_str()))
    {
        return SelectorStrategy::Semantic;
    }
    if bare.contains('.') || attrs.iter().any(|a| a == "class") {
        return SelectorStrategy::ClassName;
    }
    SelectorStrategy::Structural
}

/// Profiles a selector for scoring
///
/// The strategy comes from the subject compound of the first group.
pub fn analyze_selector(selector: &str) -> SelectorProfile {
    let groups = compound_groups(selector);
    let first = groups.first();

    let strategy = first
        .and_then(|g| g.last())
        .map(|subject| classify_compound(subject))
        .unwrap_or(SelectorStrategy::Structural);

    let bare_tag = match first {
        Some(g) if groups.len() == 1 && g.len() == 1 => {
            let compound = &g[0];
            compound == "*" || compound.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        _ => false,
    };

    SelectorProfile {
        strategy,
        combinators: count_combinators(selector),
        bare_tag,
    }
}
