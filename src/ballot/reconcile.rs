use crate::ballot::{BallotEntryList, BallotLifecycle};
use crate::cache::StoredDraft;
use crate::models::{Ballot, BallotStatus};
use crate::session::SessionContext;
use chrono::{DateTime, Utc};
use log::info;

/// Where the starting ballot for a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    /// The store holds a submitted ballot
    Submitted,
    /// Entries of a rescinded ballot, reopened for editing
    Rescinded,
    /// This device's cached draft
    LocalCache,
    Empty,
}

/// Shown once per session when a cached draft is picked up.
#[derive(Debug, Clone, PartialEq)]
pub struct RestorationNotice {
    pub saved_at: DateTime<Utc>,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub lifecycle: BallotLifecycle,
    pub source: DraftSource,
    pub notice: Option<RestorationNotice>,
}

/// Picks the ballot a user starts editing from at session start.
///
/// 1. A submitted ballot in the store wins; the cache is ignored.
/// 2. A rescinded ballot is reopened as a draft with its entries, unless the
///    cache holds edits saved after the rescind.
/// 3. With nothing submitted, a cached draft is adopted.
/// 4. Otherwise the draft starts empty.
pub struct DraftReconciler {
    max_entries: usize,
}

impl DraftReconciler {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    pub fn reconcile(
        &self,
        owner: &str,
        server: Option<Ballot>,
        cached: Option<StoredDraft>,
        session: &mut SessionContext,
    ) -> Reconciliation {
        let cached = cached.filter(|draft| draft.owner == owner && !draft.entries.is_empty());

        match server {
            Some(ballot) if ballot.status == BallotStatus::Submitted => Reconciliation {
                lifecycle: BallotLifecycle::from_ballot(ballot, self.max_entries),
                source: DraftSource::Submitted,
                notice: None,
            },
            Some(ballot) if ballot.status == BallotStatus::Rescinded => {
                let newer_cache = cached.filter(|draft| {
                    ballot
                        .rescinded_at
                        .is_none_or(|rescinded_at| draft.saved_at > rescinded_at)
                });
                match newer_cache {
                    Some(draft) => self.adopt_cache(owner, draft, session),
                    None => Reconciliation {
                        lifecycle: BallotLifecycle::with_entries(
                            owner,
                            BallotEntryList::from_entries(ballot.entries, self.max_entries),
                        ),
                        source: DraftSource::Rescinded,
                        notice: None,
                    },
                }
            }
            _ => match cached {
                Some(draft) => self.adopt_cache(owner, draft, session),
                None => Reconciliation {
                    lifecycle: BallotLifecycle::new_draft(owner, self.max_entries),
                    source: DraftSource::Empty,
                    notice: None,
                },
            },
        }
    }

    fn adopt_cache(
        &self,
        owner: &str,
        draft: StoredDraft,
        session: &mut SessionContext,
    ) -> Reconciliation {
        let entries = BallotEntryList::from_entries(draft.entries, self.max_entries);
        let notice = session.mark_draft_restored().then(|| {
            info!(
                "Restored {} cached entries for {} saved at {}",
                entries.len(),
                owner,
                draft.saved_at.to_rfc3339()
            );
            RestorationNotice {
                saved_at: draft.saved_at,
                entry_count: entries.len(),
            }
        });

        Reconciliation {
            lifecycle: BallotLifecycle::with_entries(owner, entries),
            source: DraftSource::LocalCache,
            notice,
        }
    }
}
