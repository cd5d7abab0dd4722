use crate::db::BallotStore;
use crate::error::Result;
use crate::models::Ballot;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Ballots held in process memory, keyed by owner.
#[derive(Default)]
pub struct MemoryBallotStore {
    ballots: Mutex<BTreeMap<String, Ballot>>,
}

impl MemoryBallotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_ballots<T>(&self, f: impl FnOnce(&mut BTreeMap<String, Ballot>) -> T) -> T {
        let mut ballots = self.ballots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut ballots)
    }
}

#[async_trait]
impl BallotStore for MemoryBallotStore {
    async fn get_ballot(&self, owner: &str) -> Result<Option<Ballot>> {
        Ok(self.with_ballots(|ballots| ballots.get(owner).cloned()))
    }

    async fn put_ballot(&self, ballot: &Ballot) -> Result<()> {
        self.with_ballots(|ballots| ballots.insert(ballot.owner.clone(), ballot.clone()));
        Ok(())
    }

    async fn delete_ballot(&self, owner: &str) -> Result<()> {
        self.with_ballots(|ballots| ballots.remove(owner));
        Ok(())
    }

    async fn list_ballots(&self) -> Result<Vec<Ballot>> {
        Ok(self.with_ballots(|ballots| ballots.values().cloned().collect()))
    }
}
