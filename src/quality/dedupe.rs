//! Deduplication of scored elements by (selector, discovery state)

use crate::quality::ScoredElement;
use crate::state::DiscoveryState;
use std::collections::HashSet;

/// Remembers which (selector, state) pairs have been seen
///
/// The first occurrence wins; later duplicates are dropped in arrival order.
#[derive(Debug, Default, Clone)]
pub struct Deduplicator {
    seen: HashSet<(String, DiscoveryState)>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the element was not seen before
    pub fn insert(&mut self, element: &ScoredElement) -> bool {
        self.seen.insert(element.dedupe_key())
    }

    /// Keeps unseen elements, returning them and the number dropped
    pub fn filter(&mut self, elements: Vec<ScoredElement>) -> (Vec<ScoredElement>, usize) {
        let before = elements.len();
        let fresh: Vec<ScoredElement> = elements.into_iter().filter(|e| self.insert(e)).collect();
        let dropped = before - fresh.len();
        (fresh, dropped)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Deduplicates a finished list, keeping first occurrences in order
pub fn dedupe_elements(elements: Vec<ScoredElement>) -> Vec<ScoredElement> {
    Deduplicator::new().filter(elements).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::CandidateElement;
    use crate::quality::QualityMetrics;

    fn element(selector: &str, state: DiscoveryState, page: &str) -> ScoredElement {
        ScoredElement::new(
            CandidateElement::new(selector, "button"),
            QualityMetrics {
                uniqueness: 1.0,
                stability: 0.85,
                specificity: 0.8,
                accessibility: 0.2,
            },
            state,
            page,
        )
    }

    #[test]
    fn test_first_occurrence_wins() {
        let elements = vec![
            element("#save", DiscoveryState::Static, "https://a.test/1"),
            element("#save", DiscoveryState::Static, "https://a.test/2"),
            element("#cancel", DiscoveryState::Static, "https://a.test/1"),
        ];
        let result = dedupe_elements(elements);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].page_url, "https://a.test/1");
        assert_eq!(result[1].selector(), "#cancel");
    }

    #[test]
    fn test_state_is_part_of_identity() {
        let mut dedupe = Deduplicator::new();
        let (fresh, dropped) = dedupe.filter(vec![
            element("#save", DiscoveryState::Static, "p"),
            element("#save", DiscoveryState::Modal, "p"),
        ]);
        assert_eq!(fresh.len(), 2);
        assert_eq!(dropped, 0);

        let (fresh, dropped) = dedupe.filter(vec![element("#save", DiscoveryState::Modal, "q")]);
        assert!(fresh.is_empty());
        assert_eq!(dropped, 1);
        assert_eq!(dedupe.len(), 2);
    }
}
