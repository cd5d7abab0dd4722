use crate::error::{BallotError, Result};
use crate::models::{BallotEntry, Item};
use log::warn;
use std::sync::Arc;

/// One person's ranked picks. Ranks are always exactly `1..=len()` and every
/// item appears at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct BallotEntryList {
    entries: Vec<BallotEntry>,
    max_entries: usize,
}

impl BallotEntryList {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Rebuilds a list from stored entries. Stored data is ordered by its
    /// recorded rank, duplicates and anything past the maximum are dropped,
    /// and the survivors are renumbered.
    pub fn from_entries(mut stored: Vec<BallotEntry>, max_entries: usize) -> Self {
        stored.sort_by_key(|entry| entry.rank);

        let mut list = Self::new(max_entries);
        for entry in stored {
            if list.contains(&entry.item_id) {
                warn!("Dropping duplicate stored entry for {}", entry.item_id);
                continue;
            }
            if list.is_full() {
                warn!("Dropping stored entry {} beyond maximum of {}", entry.item_id, max_entries);
                continue;
            }
            list.entries.push(entry);
        }
        list.renumber();
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_entries
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn entries(&self) -> &[BallotEntry] {
        &self.entries
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.position(item_id).is_some()
    }

    pub fn to_vec(&self) -> Vec<BallotEntry> {
        self.entries.clone()
    }

    /// Adds `item` at the bottom of the list and returns its rank.
    pub fn append(&mut self, item: Arc<Item>) -> Result<u32> {
        if self.contains(&item.id) {
            return Err(BallotError::DuplicateItem(item.id.clone()));
        }
        if self.is_full() {
            return Err(BallotError::CapacityExceeded {
                max: self.max_entries,
            });
        }
        let rank = self.entries.len() as u32 + 1;
        self.entries.push(BallotEntry {
            rank,
            item_id: item.id.clone(),
            item,
        });
        Ok(rank)
    }

    /// Removes an entry; everything below it moves up one place.
    pub fn remove(&mut self, item_id: &str) -> Result<BallotEntry> {
        let index = self
            .position(item_id)
            .ok_or_else(|| BallotError::NotFound(item_id.to_string()))?;
        let removed = self.entries.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Moves an entry to `to_rank`, clamped into `1..=len()`, and returns the
    /// rank it landed on.
    pub fn move_entry(&mut self, item_id: &str, to_rank: u32) -> Result<u32> {
        let from = self
            .position(item_id)
            .ok_or_else(|| BallotError::NotFound(item_id.to_string()))?;
        let to = (to_rank.max(1) as usize).min(self.entries.len()) - 1;

        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        self.renumber();
        Ok(to as u32 + 1)
    }

    fn position(&self, item_id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.item_id == item_id)
    }

    fn renumber(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = i as u32 + 1;
        }
    }
}
