use crate::error::Result;
use crate::models::BallotEntry;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

/// An unsubmitted ballot saved on this device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDraft {
    pub owner: String,
    pub entries: Vec<BallotEntry>,
    pub saved_at: DateTime<Utc>,
}

/// Device-local draft storage. Holds a single draft; the last save wins.
pub trait DraftCache: Send + Sync {
    fn save_draft(&self, owner: &str, entries: &[BallotEntry], saved_at: DateTime<Utc>) -> Result<()>;

    /// The cached draft, if there is one and it belongs to `owner`.
    fn load_draft(&self, owner: &str) -> Result<Option<StoredDraft>>;

    fn clear_draft(&self) -> Result<()>;
}

/// Keeps the draft as a JSON document on disk.
pub struct FileDraftCache {
    path: PathBuf,
}

impl FileDraftCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DraftCache for FileDraftCache {
    fn save_draft(&self, owner: &str, entries: &[BallotEntry], saved_at: DateTime<Utc>) -> Result<()> {
        let draft = StoredDraft {
            owner: owner.to_string(),
            entries: entries.to_vec(),
            saved_at,
        };
        let body = serde_json::to_vec_pretty(&draft)?;
        fs::write(&self.path, body)?;
        Ok(())
    }

    fn load_draft(&self, owner: &str) -> Result<Option<StoredDraft>> {
        let body = match fs::read(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<StoredDraft>(&body) {
            Ok(draft) if draft.owner == owner => Ok(Some(draft)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!("Ignoring unreadable draft cache {}: {}", self.path.display(), e);
                Ok(None)
            }
        }
    }

    fn clear_draft(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryDraftCache {
    slot: Mutex<Option<StoredDraft>>,
}

impl MemoryDraftCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftCache for MemoryDraftCache {
    fn save_draft(&self, owner: &str, entries: &[BallotEntry], saved_at: DateTime<Utc>) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(StoredDraft {
            owner: owner.to_string(),
            entries: entries.to_vec(),
            saved_at,
        });
        Ok(())
    }

    fn load_draft(&self, owner: &str) -> Result<Option<StoredDraft>> {
        let slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(slot.as_ref().filter(|draft| draft.owner == owner).cloned())
    }

    fn clear_draft(&self) -> Result<()> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;
    use std::sync::Arc;

    fn entries(ids: &[&str]) -> Vec<BallotEntry> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| BallotEntry {
                rank: i as u32 + 1,
                item_id: id.to_string(),
                item: Arc::new(Item {
                    id: id.to_string(),
                    name: id.to_string(),
                    artists: vec!["Band".to_string()],
                    album: "LP".to_string(),
                    release_date: "2018".to_string(),
                    images: Vec::new(),
                }),
            })
            .collect()
    }

    fn exercise(cache: &dyn DraftCache) {
        assert_eq!(cache.load_draft("hen").unwrap(), None);

        let saved_at = Utc::now();
        cache.save_draft("hen", &entries(&["a", "b"]), saved_at).unwrap();
        let draft = cache.load_draft("hen").unwrap().unwrap();
        assert_eq!(draft.entries, entries(&["a", "b"]));
        assert_eq!(draft.saved_at, saved_at);

        // Scoped to whoever saved last
        assert_eq!(cache.load_draft("josh").unwrap(), None);
        cache.save_draft("josh", &entries(&["c"]), Utc::now()).unwrap();
        assert_eq!(cache.load_draft("hen").unwrap(), None);

        cache.clear_draft().unwrap();
        assert_eq!(cache.load_draft("josh").unwrap(), None);
        cache.clear_draft().unwrap();
    }

    #[test]
    fn memory_cache_round_trip() {
        exercise(&MemoryDraftCache::new());
    }

    #[test]
    fn file_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileDraftCache::new(dir.path().join("draft.json")));
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.json");
        fs::write(&path, b"{not json").unwrap();
        let cache = FileDraftCache::new(&path);
        assert_eq!(cache.load_draft("hen").unwrap(), None);
    }
}
