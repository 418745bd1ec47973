//! Quality statistics over discovered elements
//!
//! Works on an in-memory report or on the element store.

use crate::output::traits::OutputResult;
use crate::quality::{QualityBand, ScoredElement, SelectorStrategy};
use crate::state::DiscoveryState;
use crate::storage::SqliteElementStore;
use std::collections::BTreeMap;

/// Element quality summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityStatistics {
    pub total_elements: u64,

    /// Keyed by band label
    pub by_band: BTreeMap<String, u64>,

    /// Keyed by strategy label
    pub by_strategy: BTreeMap<String, u64>,

    /// Keyed by discovery state, empty when loaded from storage
    pub by_discovery_state: BTreeMap<String, u64>,

    /// Mean overall quality, when computed from elements
    pub average_quality: Option<f64>,
}

impl QualityStatistics {
    /// Share of elements in the excellent or good bands, in percent
    pub fn durable_rate(&self) -> f64 {
        if self.total_elements == 0 {
            return 0.0;
        }
        let durable: u64 = [QualityBand::Excellent, QualityBand::Good]
            .iter()
            .map(|b| self.by_band.get(b.label()).copied().unwrap_or(0))
            .sum();
        durable as f64 / self.total_elements as f64 * 100.0
    }
}

/// Computes statistics for a list of scored elements
pub fn compute_statistics(elements: &[ScoredElement]) -> QualityStatistics {
    let mut stats = QualityStatistics {
        total_elements: elements.len() as u64,
        ..Default::default()
    };

    for element in elements {
        *stats
            .by_band
            .entry(element.quality_band().label().to_string())
            .or_insert(0) += 1;
        *stats
            .by_strategy
            .entry(element.strategy().label().to_string())
            .or_insert(0) += 1;
        *stats
            .by_discovery_state
            .entry(element.discovery_state.to_db_string().to_string())
            .or_insert(0) += 1;
    }

    if !elements.is_empty() {
        let sum: f64 = elements.iter().map(|e| e.overall_quality()).sum();
        stats.average_quality = Some(sum / elements.len() as f64);
    }

    stats
}

/// Loads statistics from the element store
///
/// # Arguments
///
/// * `store` - The element store to query
/// * `project_id` - Restrict to one project, or all when `None`
pub fn load_statistics(
    store: &SqliteElementStore,
    project_id: Option<&str>,
) -> OutputResult<QualityStatistics> {
    Ok(QualityStatistics {
        total_elements: store.count_elements(project_id)?,
        by_band: store.band_counts(project_id)?,
        by_strategy: store.strategy_counts(project_id)?,
        by_discovery_state: BTreeMap::new(),
        average_quality: None,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &QualityStatistics) {
    println!("=== Selector Quality Statistics ===\n");

    println!("Overview:");
    println!("  Total elements: {}", stats.total_elements);
    if let Some(avg) = stats.average_quality {
        println!("  Average quality: {:.2}", avg);
    }
    println!("  Durable (good or better): {:.1}%", stats.durable_rate());
    println!();

    println!("By Quality Band:");
    for band in QualityBand::all() {
        let count = stats.by_band.get(band.label()).copied().unwrap_or(0);
        println!("  {:<10} {}", band.label(), count);
    }
    println!();

    println!("By Strategy:");
    for strategy in SelectorStrategy::all() {
        let count = stats.by_strategy.get(strategy.label()).copied().unwrap_or(0);
        println!("  {:<10} {}", strategy.label(), count);
    }

    if !stats.by_discovery_state.is_empty() {
        println!();
        println!("By Discovery State:");
        for state in DiscoveryState::all_states() {
            if let Some(count) = stats.by_discovery_state.get(state.to_db_string()) {
                println!("  {:<18} {}", state.to_db_string(), count);
            }
        }
    }
}
