pub mod scoring;
pub mod tally;

use crate::models::Item;
use serde::Serialize;
use std::sync::Arc;

pub use scoring::ScoringAlgorithm;
pub use tally::calculate_results;

// One item's aggregate across every counted ballot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyEntry {
    pub item: Arc<Item>,
    pub total_score: f64,   // Unrounded; ordering uses this
    pub display_score: f64, // total_score rounded to two decimals
    pub vote_count: u32,
    pub positions: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyStats {
    pub total_ballots: usize,
    pub unique_items: usize,
    pub total_votes: usize, // Sum of entry counts over counted ballots
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TallyResults {
    pub algorithm: ScoringAlgorithm,
    pub entries: Vec<TallyEntry>,
    pub stats: TallyStats,
}
