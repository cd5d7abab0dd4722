use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Formula used to turn a rank on one ballot into points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringAlgorithm {
    Linear,
    Harmonic,
    Logarithmic,
    Exponential,
    Normalized,
}

impl ScoringAlgorithm {
    pub const ALL: [ScoringAlgorithm; 5] = [
        ScoringAlgorithm::Linear,
        ScoringAlgorithm::Harmonic,
        ScoringAlgorithm::Logarithmic,
        ScoringAlgorithm::Exponential,
        ScoringAlgorithm::Normalized,
    ];

    /// Points for `rank` on a ballot holding `list_length` entries.
    ///
    /// `rank` must lie in `1..=list_length`; entry lists keep that true.
    pub fn score(self, rank: u32, list_length: u32) -> f64 {
        debug_assert!(
            rank >= 1 && rank <= list_length,
            "rank {} outside 1..={}",
            rank,
            list_length
        );
        let r = f64::from(rank);
        let n = f64::from(list_length);
        match self {
            ScoringAlgorithm::Linear => linear(r, n),
            ScoringAlgorithm::Harmonic => harmonic(r),
            ScoringAlgorithm::Logarithmic => logarithmic(r, n),
            ScoringAlgorithm::Exponential => exponential(r, n),
            ScoringAlgorithm::Normalized => normalized(r, n),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScoringAlgorithm::Linear => "Borda Count",
            ScoringAlgorithm::Harmonic => "Harmonic",
            ScoringAlgorithm::Logarithmic => "Logarithmic",
            ScoringAlgorithm::Exponential => "Exponential",
            ScoringAlgorithm::Normalized => "Normalized",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ScoringAlgorithm::Linear => {
                "Linear scoring: last place earns 1 point, each place above earns one more."
            }
            ScoringAlgorithm::Harmonic => {
                "Strong top bias: 1st = 1pt, 2nd = 0.5pt, 10th = 0.1pt."
            }
            ScoringAlgorithm::Logarithmic => {
                "Moderate top bias on a log2 scale; lower ranks still count."
            }
            ScoringAlgorithm::Exponential => {
                "Extreme top bias: each place is worth double the one below it."
            }
            ScoringAlgorithm::Normalized => "Borda count rescaled to 0-1 (1st = 1.0).",
        }
    }
}

fn linear(r: f64, n: f64) -> f64 {
    n - r + 1.0
}

fn harmonic(r: f64) -> f64 {
    1.0 / r
}

fn logarithmic(r: f64, n: f64) -> f64 {
    (n + 2.0 - r).log2()
}

fn exponential(r: f64, n: f64) -> f64 {
    (n - r).exp2()
}

fn normalized(r: f64, n: f64) -> f64 {
    (n - r + 1.0) / n
}

impl fmt::Display for ScoringAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScoringAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" | "borda" => Ok(ScoringAlgorithm::Linear),
            "harmonic" => Ok(ScoringAlgorithm::Harmonic),
            "logarithmic" | "log" => Ok(ScoringAlgorithm::Logarithmic),
            "exponential" | "exp" => Ok(ScoringAlgorithm::Exponential),
            "normalized" | "bayesian" => Ok(ScoringAlgorithm::Normalized),
            other => Err(format!("Unknown scoring algorithm: {}", other)),
        }
    }
}
