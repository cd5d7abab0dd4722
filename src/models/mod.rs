use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A catalog track. Fetched once from the catalog and shared by reference
/// between search results, ballot entries and tally output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub release_date: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl Item {
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }

    /// Release day, reading `YYYY` and `YYYY-MM` precision as the first day.
    pub fn released_on(&self) -> Option<NaiveDate> {
        let date = self.release_date.trim();
        let full = match date.len() {
            4 => format!("{}-01-01", date),
            7 => format!("{}-01", date),
            _ => date.to_string(),
        };
        NaiveDate::parse_from_str(&full, "%Y-%m-%d").ok()
    }

    /// Tracks with an unreadable release date count as outside the period.
    pub fn in_period(&self, period: &VotePeriod) -> bool {
        self.released_on().is_some_and(|day| period.contains(day))
    }
}

/// Inclusive range of release days eligible for this vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl VotePeriod {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn label(&self) -> String {
        if self.start.year() == self.end.year() {
            self.start.year().to_string()
        } else {
            format!("{}-{}", self.start.year(), self.end.year())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotEntry {
    pub rank: u32,
    pub item_id: String,
    pub item: Arc<Item>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BallotStatus {
    Draft,
    Submitted,
    Rescinded,
}

impl BallotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BallotStatus::Draft => "draft",
            BallotStatus::Submitted => "submitted",
            BallotStatus::Rescinded => "rescinded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(BallotStatus::Draft),
            "submitted" => Some(BallotStatus::Submitted),
            "rescinded" => Some(BallotStatus::Rescinded),
            _ => None,
        }
    }
}

impl fmt::Display for BallotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One owner's ranked list as the store sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub owner: String,
    pub entries: Vec<BallotEntry>,
    pub status: BallotStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub rescinded_at: Option<DateTime<Utc>>,
}

/// Who is logged in for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub display_name: String,
}
