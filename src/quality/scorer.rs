//! Selector quality scoring
//!
//! # Metrics
//!
//! | Metric | Weight | Source |
//! |--------|--------|--------|
//! | Uniqueness | 0.40 | `1 / matches` on the page |
//! | Stability | 0.30 | Selector strategy tier |
//! | Specificity | 0.20 | Combinator count, peaking at 1-2 |
//! | Accessibility | 0.10 | ARIA, role, semantic tag, accessible name |

use crate::driver::CandidateElement;
use crate::quality::selector::{analyze_selector, SelectorProfile, SelectorStrategy};
use crate::state::DiscoveryState;
use crate::{Result, ScoutError};
use serde::{Serialize, Serializer};
use std::fmt;

const SEMANTIC_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "label", "nav", "summary", "option", "form",
];

const LABEL_ATTRIBUTES: &[&str] = &["aria-label", "aria-labelledby", "aria-describedby"];

const NAME_ATTRIBUTES: &[&str] = &["alt", "title", "placeholder", "value"];

/// Four normalized sub-scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub uniqueness: f64,
    pub stability: f64,
    pub specificity: f64,
    pub accessibility: f64,
}

impl QualityMetrics {
    pub const UNIQUENESS_WEIGHT: f64 = 0.4;
    pub const STABILITY_WEIGHT: f64 = 0.3;
    pub const SPECIFICITY_WEIGHT: f64 = 0.2;
    pub const ACCESSIBILITY_WEIGHT: f64 = 0.1;

    /// Weighted overall quality
    pub fn overall(&self) -> f64 {
        (self.uniqueness * Self::UNIQUENESS_WEIGHT
            + self.stability * Self::STABILITY_WEIGHT
            + self.specificity * Self::SPECIFICITY_WEIGHT
            + self.accessibility * Self::ACCESSIBILITY_WEIGHT)
            .clamp(0.0, 1.0)
    }

    pub fn band(&self) -> QualityBand {
        QualityBand::from_score(self.overall())
    }
}

/// Presentation band for an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::Excellent
        } else if score >= 0.6 {
            Self::Good
        } else if score >= 0.4 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }

    pub fn all() -> [Self; 4] {
        [Self::Excellent, Self::Good, Self::Fair, Self::Poor]
    }
}

impl fmt::Display for QualityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Page facts the scorer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageContext {
    /// How many elements the selector matched on the page it was found on
    pub match_count_on_page: usize,
}

/// Scores candidate selectors
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorQualityScorer;

impl SelectorQualityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Scores one candidate
    ///
    /// # Errors
    ///
    /// Returns `SelectorNotFound` when the selector matched nothing; such
    /// a candidate must be dropped, not scored.
    pub fn score(&self, candidate: &CandidateElement, page: &PageContext) -> Result<QualityMetrics> {
        if page.match_count_on_page == 0 {
            return Err(ScoutError::SelectorNotFound {
                selector: candidate.selector.clone(),
            });
        }

        let profile = analyze_selector(&candidate.selector);
        Ok(QualityMetrics {
            uniqueness: Self::uniqueness(page.match_count_on_page),
            stability: profile.strategy.stability_score(),
            specificity: Self::specificity(&profile),
            accessibility: Self::accessibility(candidate),
        })
    }

    /// `1 / n`, so a unique match scores 1.0
    pub fn uniqueness(match_count: usize) -> f64 {
        if match_count == 0 {
            0.0
        } else {
            1.0 / match_count as f64
        }
    }

    pub fn specificity(profile: &SelectorProfile) -> f64 {
        match profile.combinators {
            0 if profile.bare_tag => 0.1,
            0 => 0.8,
            1 | 2 => 1.0,
            3 => 0.7,
            4 => 0.5,
            n => (0.5 - 0.1 * (n - 4) as f64).max(0.1),
        }
    }

    pub fn accessibility(candidate: &CandidateElement) -> f64 {
        let mut score: f64 = 0.0;

        if LABEL_ATTRIBUTES
            .iter()
            .any(|a| candidate.attribute(a).is_some_and(|v| !v.trim().is_empty()))
        {
            score += 0.4;
        }
        if candidate.attribute("role").is_some() {
            score += 0.2;
        }
        if SEMANTIC_TAGS.contains(&candidate.tag_name.to_ascii_lowercase().as_str()) {
            score += 0.2;
        }

        let has_name = !candidate.text_content.trim().is_empty()
            || NAME_ATTRIBUTES
                .iter()
                .any(|a| candidate.attribute(a).is_some_and(|v| !v.trim().is_empty()));
        if has_name {
            score += 0.2;
        }

        score.min(1.0)
    }

    pub fn strategy(selector: &str) -> SelectorStrategy {
        analyze_selector(selector).strategy
    }
}

/// A candidate with its metrics and provenance
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredElement {
    pub element: CandidateElement,
    pub page_url: String,
    pub quality_metrics: QualityMetrics,
    pub discovery_state: DiscoveryState,
}

impl ScoredElement {
    pub fn new(
        element: CandidateElement,
        quality_metrics: QualityMetrics,
        discovery_state: DiscoveryState,
        page_url: impl Into<String>,
    ) -> Self {
        Self {
            element,
            page_url: page_url.into(),
            quality_metrics,
            discovery_state,
        }
    }

    pub fn selector(&self) -> &str {
        &self.element.selector
    }

    /// Derived from the metrics, never stored separately
    pub fn overall_quality(&self) -> f64 {
        self.quality_metrics.overall()
    }

    pub fn quality_band(&self) -> QualityBand {
        self.quality_metrics.band()
    }

    pub fn strategy(&self) -> SelectorStrategy {
        analyze_selector(&self.element.selector).strategy
    }

    /// Identity used for deduplication and storage
    pub fn dedupe_key(&self) -> (String, DiscoveryState) {
        (self.element.selector.clone(), self.discovery_state)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoredElementView<'a> {
    #[serde(flatten)]
    element: &'a CandidateElement,
    page_url: &'a str,
    quality_metrics: &'a QualityMetrics,
    overall_quality: f64,
    quality_band: QualityBand,
    strategy: SelectorStrategy,
    discovery_state: DiscoveryState,
}

impl Serialize for ScoredElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ScoredElementView {
            element: &self.element,
            page_url: &self.page_url,
            quality_metrics: &self.quality_metrics,
            overall_quality: self.overall_quality(),
            quality_band: self.quality_band(),
            strategy: self.strategy(),
            discovery_state: self.discovery_state,
        }
        .serialize(serializer)
    }
}
