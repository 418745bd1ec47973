//! Selector quality: scoring, deduplication and cross-page validation
//!
//! - `selector`: static analysis of selector text (strategy tier, combinators)
//! - `scorer`: the four weighted sub-scores and [`ScoredElement`]
//! - `dedupe`: first-occurrence-wins deduplication by (selector, state)
//! - `validator`: [`CrossPageValidator`] for checking one selector on many pages

mod dedupe;
mod scorer;
mod selector;
mod validator;

pub use dedupe::{dedupe_elements, Deduplicator};
pub use scorer::{PageContext, QualityBand, QualityMetrics, ScoredElement, SelectorQualityScorer};
pub use selector::{analyze_selector, SelectorProfile, SelectorStrategy, TEST_ID_ATTRIBUTES};
pub use validator::{CrossPageValidationResult, CrossPageValidator, PageMatchCount};
