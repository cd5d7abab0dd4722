use crate::ballot::BallotEntryList;
use crate::models::{Ballot, BallotStatus, Item};
use crate::voting::{ScoringAlgorithm, TallyEntry, TallyResults, TallyStats};
use log::debug;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

struct Accumulator {
    item: Arc<Item>,
    score: f64,
    votes: u32,
    positions: Vec<u32>,
}

/// Combines every submitted ballot into one ranking under `algorithm`.
///
/// Each ballot is scored against its own length after its stored entries are
/// renumbered to `1..=len` with duplicates dropped. Ballots are visited in
/// owner order so float sums and position lists do not depend on the order
/// the store returned them in. Ties on score fall back to item id.
pub fn calculate_results(ballots: &[Ballot], algorithm: ScoringAlgorithm) -> TallyResults {
    let mut counted: Vec<&Ballot> = ballots
        .iter()
        .filter(|ballot| {
            let submitted = ballot.status == BallotStatus::Submitted;
            if !submitted {
                debug!("Skipping {} ballot from {}", ballot.status, ballot.owner);
            }
            submitted
        })
        .collect();
    counted.sort_by(|a, b| a.owner.cmp(&b.owner));

    let mut totals: HashMap<String, Accumulator> = HashMap::new();
    let mut total_votes = 0;

    for ballot in &counted {
        let list = BallotEntryList::from_entries(ballot.entries.clone(), ballot.entries.len());
        let list_length = list.len() as u32;
        total_votes += list.len();
        debug!("Counting {} entries from {}", list_length, ballot.owner);

        for entry in list.entries() {
            let points = algorithm.score(entry.rank, list_length);
            let acc = totals
                .entry(entry.item_id.clone())
                .or_insert_with(|| Accumulator {
                    item: Arc::clone(&entry.item),
                    score: 0.0,
                    votes: 0,
                    positions: Vec::new(),
                });
            acc.score += points;
            acc.votes += 1;
            acc.positions.push(entry.rank);
        }
    }

    let unique_items = totals.len();
    let mut ranked: Vec<Accumulator> = totals.into_values().collect();

    // Sort on the unrounded totals; rounding happens afterwards
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item.id.cmp(&b.item.id))
    });

    let entries = ranked
        .into_iter()
        .map(|mut acc| {
            acc.positions.sort_unstable();
            TallyEntry {
                display_score: round_to_cents(acc.score),
                total_score: acc.score,
                item: acc.item,
                vote_count: acc.votes,
                positions: acc.positions,
            }
        })
        .collect();

    TallyResults {
        algorithm,
        entries,
        stats: TallyStats {
            total_ballots: counted.len(),
            unique_items,
            total_votes,
        },
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl TallyResults {
    /// Plain-text report of the top `limit` items followed by the totals.
    pub fn summary(&self, limit: usize) -> String {
        let mut summary = format!("**{}**\n{}\n\n", self.algorithm.name(), self.algorithm.description());

        if self.entries.is_empty() {
            summary.push_str("No votes submitted yet.\n");
        }

        for (i, entry) in self.entries.iter().take(limit).enumerate() {
            let positions: Vec<String> = entry.positions.iter().map(|p| p.to_string()).collect();
            summary.push_str(&format!(
                "{:>3}. {} - {}: {:.2} pts ({} vote{}; positions {})\n",
                i + 1,
                entry.item.name,
                entry.item.artist_line(),
                entry.display_score,
                entry.vote_count,
                if entry.vote_count == 1 { "" } else { "s" },
                positions.join(", "),
            ));
        }

        if self.entries.len() > limit {
            summary.push_str(&format!("...and {} more\n", self.entries.len() - limit));
        }

        summary.push_str(&format!(
            "\n{} voters, {} unique tracks, {} votes cast.",
            self.stats.total_ballots, self.stats.unique_items, self.stats.total_votes
        ));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BallotEntry;
    use chrono::Utc;

    fn item(id: &str) -> Arc<Item> {
        Arc::new(Item {
            id: id.to_string(),
            name: format!("Song {}", id),
            artists: vec!["Artist".to_string()],
            album: "Album".to_string(),
            release_date: "2020-01-01".to_string(),
            images: Vec::new(),
        })
    }

    fn ballot(owner: &str, ids: &[&str]) -> Ballot {
        Ballot {
            owner: owner.to_string(),
            entries: ids
                .iter()
                .enumerate()
                .map(|(i, id)| BallotEntry {
                    rank: i as u32 + 1,
                    item_id: id.to_string(),
                    item: item(id),
                })
                .collect(),
            status: BallotStatus::Submitted,
            submitted_at: Some(Utc::now()),
            rescinded_at: None,
        }
    }

    fn ids(results: &TallyResults) -> Vec<&str> {
        results.entries.iter().map(|e| e.item.id.as_str()).collect()
    }

    #[test]
    fn two_identical_ballots_under_linear_and_harmonic() {
        let ballots = vec![ballot("a", &["X", "Y"]), ballot("b", &["X", "Y"])];

        let linear = calculate_results(&ballots, ScoringAlgorithm::Linear);
        assert_eq!(ids(&linear), vec!["X", "Y"]);
        assert_eq!(linear.entries[0].total_score, 4.0);
        assert_eq!(linear.entries[1].total_score, 2.0);
        assert_eq!(linear.entries[0].vote_count, 2);
        assert_eq!(linear.entries[0].positions, vec![1, 1]);

        let harmonic = calculate_results(&ballots, ScoringAlgorithm::Harmonic);
        assert_eq!(harmonic.entries[0].total_score, 2.0);
        assert_eq!(harmonic.entries[1].total_score, 1.0);
    }

    #[test]
    fn empty_input_gives_empty_results() {
        let results = calculate_results(&[], ScoringAlgorithm::Linear);
        assert!(results.entries.is_empty());
        assert_eq!(results.stats, TallyStats::default());
        assert!(results.summary(10).contains("No votes submitted yet."));
    }

    #[test]
    fn ties_break_on_item_id_regardless_of_input_order() {
        let forward = vec![ballot("a", &["M", "B"]), ballot("b", &["B", "M"])];
        let backward = vec![ballot("b", &["B", "M"]), ballot("a", &["M", "B"])];

        let first = calculate_results(&forward, ScoringAlgorithm::Linear);
        let second = calculate_results(&backward, ScoringAlgorithm::Linear);
        assert_eq!(ids(&first), vec!["B", "M"]);
        assert_eq!(first, second);
        assert_eq!(first.entries[0].total_score, first.entries[1].total_score);
    }

    #[test]
    fn repeated_aggregation_is_identical() {
        let ballots = vec![
            ballot("c", &["P", "Q", "R"]),
            ballot("a", &["Q", "P"]),
            ballot("b", &["R", "S", "P", "Q"]),
        ];
        for algorithm in ScoringAlgorithm::ALL {
            let first = calculate_results(&ballots, algorithm);
            let second = calculate_results(&ballots, algorithm);
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }
    }

    #[test]
    fn each_ballot_scores_against_its_own_length() {
        let ballots = vec![ballot("a", &["X"]), ballot("b", &["Y", "X", "Z"])];
        let results = calculate_results(&ballots, ScoringAlgorithm::Linear);

        // X: 1 (rank 1 of 1) + 2 (rank 2 of 3); Y: 3; Z: 1
        assert_eq!(ids(&results), vec!["X", "Y", "Z"]);
        assert_eq!(results.entries[0].total_score, 3.0);
        assert_eq!(results.entries[0].positions, vec![1, 2]);
        assert_eq!(results.entries[1].total_score, 3.0);
        assert_eq!(
            results.stats,
            TallyStats {
                total_ballots: 2,
                unique_items: 3,
                total_votes: 4,
            }
        );
    }

    #[test]
    fn rounding_only_touches_the_display_value() {
        let ballots = vec![ballot("a", &["X", "Y", "Z"])];
        let results = calculate_results(&ballots, ScoringAlgorithm::Harmonic);
        let third = &results.entries[2];
        assert_eq!(third.item.id, "Z");
        assert_eq!(third.total_score, 1.0 / 3.0);
        assert_eq!(third.display_score, 0.33);
    }

    #[test]
    fn rescinded_ballots_are_not_counted() {
        let mut withdrawn = ballot("b", &["Y"]);
        withdrawn.status = BallotStatus::Rescinded;
        let ballots = vec![ballot("a", &["X"]), withdrawn];

        let results = calculate_results(&ballots, ScoringAlgorithm::Linear);
        assert_eq!(ids(&results), vec!["X"]);
        assert_eq!(results.stats.total_ballots, 1);
        assert_eq!(results.stats.total_votes, 1);
    }

    #[test]
    fn stored_ranks_are_renumbered_before_scoring() {
        let mut gapped = ballot("a", &["X", "Y"]);
        gapped.entries[1].rank = 5;
        let results = calculate_results(&[gapped], ScoringAlgorithm::Logarithmic);
        assert_eq!(ids(&results), vec!["X", "Y"]);
        assert_eq!(results.entries[1].positions, vec![2]);
        assert_eq!(results.entries[1].total_score, 1.0);
        assert!(results.entries.iter().all(|e| e.total_score.is_finite()));

        let mut doubled = ballot("b", &["X", "X", "Z"]);
        doubled.entries[2].rank = 7;
        let results = calculate_results(&[doubled], ScoringAlgorithm::Linear);
        let x = &results.entries[0];
        assert_eq!(x.item.id, "X");
        assert_eq!(x.vote_count, 1);
        assert_eq!(x.positions, vec![1]);
        assert_eq!(x.total_score, 2.0);
        assert_eq!(results.entries[1].positions, vec![2]);
        assert_eq!(results.stats.total_votes, 2);
    }

    #[test]
    fn summary_lists_items_and_totals() {
        let ballots = vec![ballot("a", &["X", "Y"]), ballot("b", &["X"])];
        let summary = calculate_results(&ballots, ScoringAlgorithm::Linear).summary(1);
        assert!(summary.contains("1. Song X - Artist: 3.00 pts (2 votes; positions 1, 1)"));
        assert!(summary.contains("...and 1 more"));
        assert!(summary.ends_with("2 voters, 2 unique tracks, 3 votes cast."));
    }
}
