use crate::ballot::BallotEntryList;
use crate::error::{BallotError, Result};
use crate::models::{Ballot, BallotEntry, BallotStatus, Item};
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;

/// How many entries a ballot needs before it may be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPolicy {
    NonEmpty,
    ExactlyMax,
}

impl SubmissionPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "non-empty" | "nonempty" | "non_empty" => Some(SubmissionPolicy::NonEmpty),
            "exact" | "exactly-max" | "full" => Some(SubmissionPolicy::ExactlyMax),
            _ => None,
        }
    }

    fn check(self, list: &BallotEntryList) -> Result<()> {
        match self {
            SubmissionPolicy::NonEmpty if list.is_empty() => Err(BallotError::SubmissionRejected(
                "add at least one song".to_string(),
            )),
            SubmissionPolicy::ExactlyMax if list.len() != list.max_entries() => {
                Err(BallotError::SubmissionRejected(format!(
                    "select exactly {} songs ({} chosen)",
                    list.max_entries(),
                    list.len()
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Proof that the user agreed to withdraw a submitted ballot. Rescinding
/// cannot be called without one.
#[derive(Debug, Clone, Copy)]
pub struct RescindConfirmation {
    _acknowledged: (),
}

impl RescindConfirmation {
    pub fn acknowledge() -> Self {
        Self { _acknowledged: () }
    }
}

/// State machine for one owner's ballot:
/// Draft -> Submitted -> Rescinded -> Draft -> ...
///
/// Transitions that touch the store are split in two. `submission` and
/// `rescission` validate and build the ballot to persist; the matching
/// `confirm_*` call moves the state only once the store accepted it.
#[derive(Debug, Clone, PartialEq)]
pub struct BallotLifecycle {
    owner: String,
    entries: BallotEntryList,
    status: BallotStatus,
    submitted_at: Option<DateTime<Utc>>,
    rescinded_at: Option<DateTime<Utc>>,
}

impl BallotLifecycle {
    pub fn new_draft(owner: impl Into<String>, max_entries: usize) -> Self {
        Self::with_entries(owner, BallotEntryList::new(max_entries))
    }

    pub fn with_entries(owner: impl Into<String>, entries: BallotEntryList) -> Self {
        Self {
            owner: owner.into(),
            entries,
            status: BallotStatus::Draft,
            submitted_at: None,
            rescinded_at: None,
        }
    }

    pub fn from_ballot(ballot: Ballot, max_entries: usize) -> Self {
        Self {
            entries: BallotEntryList::from_entries(ballot.entries, max_entries),
            owner: ballot.owner,
            status: ballot.status,
            submitted_at: ballot.submitted_at,
            rescinded_at: ballot.rescinded_at,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn status(&self) -> BallotStatus {
        self.status
    }

    pub fn entries(&self) -> &BallotEntryList {
        &self.entries
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn rescinded_at(&self) -> Option<DateTime<Utc>> {
        self.rescinded_at
    }

    pub fn append(&mut self, item: Arc<Item>) -> Result<u32> {
        self.begin_edit()?;
        self.entries.append(item)
    }

    pub fn remove(&mut self, item_id: &str) -> Result<BallotEntry> {
        self.begin_edit()?;
        self.entries.remove(item_id)
    }

    pub fn move_entry(&mut self, item_id: &str, to_rank: u32) -> Result<u32> {
        self.begin_edit()?;
        self.entries.move_entry(item_id, to_rank)
    }

    /// Rescinded -> Draft, keeping the withdrawn entries as the starting list.
    pub fn reopen(&mut self) -> Result<()> {
        if self.status != BallotStatus::Rescinded {
            return Err(BallotError::InvalidTransition {
                from: self.status,
                action: "reopen",
            });
        }
        info!("Reopening rescinded ballot for {}", self.owner);
        self.status = BallotStatus::Draft;
        Ok(())
    }

    /// Validates a Draft for submission and returns the ballot to store.
    pub fn submission(&self, policy: SubmissionPolicy, now: DateTime<Utc>) -> Result<Ballot> {
        if self.status != BallotStatus::Draft {
            return Err(BallotError::InvalidTransition {
                from: self.status,
                action: "submit",
            });
        }
        policy.check(&self.entries)?;

        Ok(Ballot {
            owner: self.owner.clone(),
            entries: self.entries.to_vec(),
            status: BallotStatus::Submitted,
            submitted_at: Some(now),
            rescinded_at: None,
        })
    }

    pub fn confirm_submitted(&mut self, ballot: &Ballot) {
        info!(
            "Ballot for {} submitted with {} entries",
            self.owner,
            self.entries.len()
        );
        self.status = BallotStatus::Submitted;
        self.submitted_at = ballot.submitted_at;
        self.rescinded_at = None;
    }

    /// Builds the rescinded form of a Submitted ballot. The entries are kept
    /// so the owner can edit and resubmit.
    pub fn rescission(&self, _confirmation: RescindConfirmation, now: DateTime<Utc>) -> Result<Ballot> {
        if self.status != BallotStatus::Submitted {
            return Err(BallotError::InvalidTransition {
                from: self.status,
                action: "rescind",
            });
        }

        Ok(Ballot {
            owner: self.owner.clone(),
            entries: self.entries.to_vec(),
            status: BallotStatus::Rescinded,
            submitted_at: self.submitted_at,
            rescinded_at: Some(now),
        })
    }

    pub fn confirm_rescinded(&mut self, ballot: &Ballot) {
        info!("Ballot for {} rescinded", self.owner);
        self.status = BallotStatus::Rescinded;
        self.rescinded_at = ballot.rescinded_at;
    }

    fn begin_edit(&mut self) -> Result<()> {
        match self.status {
            BallotStatus::Draft => Ok(()),
            BallotStatus::Rescinded => self.reopen(),
            BallotStatus::Submitted => Err(BallotError::InvalidTransition {
                from: BallotStatus::Submitted,
                action: "edit",
            }),
        }
    }
}
