use crate::ballot::SubmissionPolicy;
use crate::error::{BallotError, Result};
use crate::models::VotePeriod;
use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MAX_ENTRIES: usize = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_entries: usize,
    pub submission_policy: SubmissionPolicy,
    pub draft_cache_path: PathBuf,
    pub roster_path: PathBuf,
    pub catalog_url: String,
    pub vote_period: VotePeriod,
    pub vote_period_label: String,
}

impl Config {
    /// Reads settings from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let max_entries = match lookup("MAX_ENTRIES") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(BallotError::Config(format!(
                        "MAX_ENTRIES must be a positive integer, got {:?}",
                        raw
                    )));
                }
            },
            None => DEFAULT_MAX_ENTRIES,
        };

        let policy_raw = get("SUBMISSION_POLICY", "exact");
        let submission_policy = SubmissionPolicy::parse(&policy_raw).ok_or_else(|| {
            BallotError::Config(format!(
                "SUBMISSION_POLICY must be 'exact' or 'non-empty', got {:?}",
                policy_raw
            ))
        })?;

        let start = parse_date("VOTE_START_DATE", &get("VOTE_START_DATE", "2015-01-01"))?;
        let end = parse_date("VOTE_END_DATE", &get("VOTE_END_DATE", "2025-12-31"))?;
        if start > end {
            return Err(BallotError::Config(format!(
                "VOTE_START_DATE {} is after VOTE_END_DATE {}",
                start, end
            )));
        }
        let vote_period = VotePeriod { start, end };

        Ok(Self {
            database_url: get("DATABASE_URL", "sqlite:music_ballot.db"),
            max_entries,
            submission_policy,
            draft_cache_path: PathBuf::from(get("DRAFT_CACHE_PATH", "music_ballot_draft.json")),
            roster_path: PathBuf::from(get("ROSTER_PATH", "roster.json")),
            catalog_url: get("CATALOG_URL", "http://localhost:3001"),
            vote_period_label: lookup("VOTE_PERIOD_LABEL").unwrap_or_else(|| vote_period.label()),
            vote_period,
        })
    }
}

fn parse_date(key: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        BallotError::Config(format!("{} must be a YYYY-MM-DD date, got {:?}", key, raw))
    })
}
