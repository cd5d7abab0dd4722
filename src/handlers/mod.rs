mod console;

pub use console::{Console, Reply};

use crate::ballot::{
    BallotLifecycle, DraftReconciler, Reconciliation, RescindConfirmation, SubmissionPolicy,
};
use crate::cache::DraftCache;
use crate::catalog::Catalog;
use crate::db::BallotStore;
use crate::error::{BallotError, Result};
use crate::identity::IdentityCheck;
use crate::models::{AuthenticatedUser, BallotEntry, BallotStatus, Item};
use crate::session::SessionContext;
use crate::voting::{ScoringAlgorithm, TallyResults, calculate_results};
use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;

/// Entry point for everything a logged-in voter can do. Holds the
/// collaborators; per-user state lives in the `SessionContext` and
/// `BallotLifecycle` the caller passes in.
pub struct BallotService {
    store: Arc<dyn BallotStore>,
    cache: Arc<dyn DraftCache>,
    catalog: Arc<dyn Catalog>,
    identity: Arc<dyn IdentityCheck>,
    max_entries: usize,
    policy: SubmissionPolicy,
}

impl BallotService {
    pub fn new(
        store: Arc<dyn BallotStore>,
        cache: Arc<dyn DraftCache>,
        catalog: Arc<dyn Catalog>,
        identity: Arc<dyn IdentityCheck>,
        max_entries: usize,
        policy: SubmissionPolicy,
    ) -> Self {
        Self {
            store,
            cache,
            catalog,
            identity,
            max_entries,
            policy,
        }
    }

    pub async fn login(
        &self,
        session: &mut SessionContext,
        username: &str,
        pin: &str,
    ) -> Result<AuthenticatedUser> {
        let user = self
            .identity
            .authenticate(username, pin)
            .await
            .into_user()
            .ok_or_else(|| {
                warn!("Failed login attempt for {:?}", username.trim());
                BallotError::AuthenticationFailed
            })?;
        session.sign_in(user.clone());
        Ok(user)
    }

    pub fn logout(&self, session: &mut SessionContext) {
        session.sign_out();
    }

    /// Loads the stored ballot and the local draft and decides which one the
    /// user edits. Safe to call again on reload; the restore notice is only
    /// returned the first time in a session.
    pub async fn open_ballot(&self, session: &mut SessionContext) -> Result<Reconciliation> {
        let owner = session.require_user()?.username.clone();

        let server = self.store.get_ballot(&owner).await.map_err(|e| {
            error!("Failed to load ballot for {}: {}", owner, e);
            e
        })?;
        let cached = self.cache.load_draft(&owner).unwrap_or_else(|e| {
            warn!("Draft cache unreadable for {}: {}", owner, e);
            None
        });

        let reconciliation =
            DraftReconciler::new(self.max_entries).reconcile(&owner, server, cached, session);
        info!(
            "Opened {} ballot for {} from {:?}",
            reconciliation.lifecycle.status(),
            owner,
            reconciliation.source
        );
        Ok(reconciliation)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Arc<Item>>> {
        self.catalog.search(query).await
    }

    pub fn add_item(&self, lifecycle: &mut BallotLifecycle, item: Arc<Item>) -> Result<u32> {
        let rank = lifecycle.append(item)?;
        self.write_through(lifecycle);
        Ok(rank)
    }

    pub fn remove_item(&self, lifecycle: &mut BallotLifecycle, item_id: &str) -> Result<BallotEntry> {
        let removed = lifecycle.remove(item_id)?;
        self.write_through(lifecycle);
        Ok(removed)
    }

    pub fn move_item(&self, lifecycle: &mut BallotLifecycle, item_id: &str, to_rank: u32) -> Result<u32> {
        let rank = lifecycle.move_entry(item_id, to_rank)?;
        self.write_through(lifecycle);
        Ok(rank)
    }

    /// Nothing is cached until the reopened list is actually edited, so a
    /// reload still comes back from the rescinded ballot.
    pub fn reopen(&self, lifecycle: &mut BallotLifecycle) -> Result<()> {
        lifecycle.reopen()
    }

    pub async fn submit(&self, lifecycle: &mut BallotLifecycle) -> Result<()> {
        let ballot = lifecycle.submission(self.policy, Utc::now())?;
        self.store.put_ballot(&ballot).await.map_err(|e| {
            error!("Failed to save ballot for {}: {}", ballot.owner, e);
            e
        })?;
        lifecycle.confirm_submitted(&ballot);

        if let Err(e) = self.cache.clear_draft() {
            warn!("Could not clear draft cache after submit: {}", e);
        }
        Ok(())
    }

    pub async fn rescind(
        &self,
        lifecycle: &mut BallotLifecycle,
        confirmation: RescindConfirmation,
    ) -> Result<()> {
        let ballot = lifecycle.rescission(confirmation, Utc::now())?;
        self.store.put_ballot(&ballot).await.map_err(|e| {
            error!("Failed to rescind ballot for {}: {}", ballot.owner, e);
            e
        })?;
        lifecycle.confirm_rescinded(&ballot);
        Ok(())
    }

    /// Ranks every submitted ballot in the store.
    pub async fn tally(&self, algorithm: ScoringAlgorithm) -> Result<TallyResults> {
        let ballots = self.store.list_ballots().await.map_err(|e| {
            error!("Failed to list ballots: {}", e);
            e
        })?;
        Ok(calculate_results(&ballots, algorithm))
    }

    // Edits are saved locally right away so a reload does not lose them
    fn write_through(&self, lifecycle: &BallotLifecycle) {
        if lifecycle.status() != BallotStatus::Draft {
            return;
        }
        if let Err(e) = self
            .cache
            .save_draft(lifecycle.owner(), lifecycle.entries().entries(), Utc::now())
        {
            warn!("Could not cache draft for {}: {}", lifecycle.owner(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::DraftSource;
    use crate::cache::MemoryDraftCache;
    use crate::catalog::StaticCatalog;
    use crate::db::MemoryBallotStore;
    use crate::identity::{Roster, RosterMember};
    use async_trait::async_trait;
    use crate::models::Ballot;

    struct FailingStore;

    #[async_trait]
    impl BallotStore for FailingStore {
        async fn get_ballot(&self, _owner: &str) -> Result<Option<Ballot>> {
            Ok(None)
        }
        async fn put_ballot(&self, _ballot: &Ballot) -> Result<()> {
            Err(BallotError::PersistenceUnavailable("disk on fire".to_string()))
        }
        async fn delete_ballot(&self, _owner: &str) -> Result<()> {
            Ok(())
        }
        async fn list_ballots(&self) -> Result<Vec<Ballot>> {
            Err(BallotError::PersistenceUnavailable("disk on fire".to_string()))
        }
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(
            ["alpha", "bravo", "charlie"]
                .iter()
                .map(|id| Item {
                    id: id.to_string(),
                    name: id.to_string(),
                    artists: vec!["Band".to_string()],
                    album: "LP".to_string(),
                    release_date: "2022".to_string(),
                    images: Vec::new(),
                })
                .collect(),
        )
    }

    fn service_with(store: Arc<dyn BallotStore>, cache: Arc<MemoryDraftCache>) -> BallotService {
        let roster = Roster::new(vec![RosterMember {
            username: "hen".to_string(),
            display_name: "Hen".to_string(),
            pin: "zeppelin".to_string(),
        }]);
        BallotService::new(
            store,
            cache,
            Arc::new(catalog()),
            Arc::new(roster),
            3,
            SubmissionPolicy::NonEmpty,
        )
    }

    async fn logged_in(service: &BallotService) -> SessionContext {
        let mut session = SessionContext::new();
        service.login(&mut session, "Hen", "ZEPPELIN").await.unwrap();
        session
    }

    #[tokio::test]
    async fn open_requires_login() {
        let service = service_with(Arc::new(MemoryBallotStore::new()), Arc::new(MemoryDraftCache::new()));
        let mut session = SessionContext::new();
        assert_eq!(
            service.open_ballot(&mut session).await.unwrap_err(),
            BallotError::NotAuthenticated
        );
        assert_eq!(
            service.login(&mut session, "hen", "wrong").await.unwrap_err(),
            BallotError::AuthenticationFailed
        );
    }

    #[tokio::test]
    async fn logging_in_as_someone_else_gets_a_fresh_notice() {
        let cache = Arc::new(MemoryDraftCache::new());
        let roster = Roster::new(vec![
            RosterMember {
                username: "hen".to_string(),
                display_name: "Hen".to_string(),
                pin: "zeppelin".to_string(),
            },
            RosterMember {
                username: "josh".to_string(),
                display_name: "Josh".to_string(),
                pin: "toto".to_string(),
            },
        ]);
        let service = BallotService::new(
            Arc::new(MemoryBallotStore::new()),
            cache.clone(),
            Arc::new(catalog()),
            Arc::new(roster),
            3,
            SubmissionPolicy::NonEmpty,
        );

        let mut session = SessionContext::new();
        service.login(&mut session, "hen", "zeppelin").await.unwrap();
        let mut lifecycle = service.open_ballot(&mut session).await.unwrap().lifecycle;
        let found = service.search("alpha").await.unwrap();
        service.add_item(&mut lifecycle, Arc::clone(&found[0])).unwrap();
        assert!(service.open_ballot(&mut session).await.unwrap().notice.is_some());

        service.login(&mut session, "josh", "toto").await.unwrap();
        let mut lifecycle = service.open_ballot(&mut session).await.unwrap().lifecycle;
        let found = service.search("bravo").await.unwrap();
        service.add_item(&mut lifecycle, Arc::clone(&found[0])).unwrap();

        let reopened = service.open_ballot(&mut session).await.unwrap();
        assert_eq!(reopened.source, DraftSource::LocalCache);
        assert_eq!(reopened.notice.map(|n| n.entry_count), Some(1));
    }

    #[tokio::test]
    async fn edits_are_written_through_and_cleared_on_submit() {
        let cache = Arc::new(MemoryDraftCache::new());
        let service = service_with(Arc::new(MemoryBallotStore::new()), Arc::clone(&cache));
        let mut session = logged_in(&service).await;
        let mut lifecycle = service.open_ballot(&mut session).await.unwrap().lifecycle;

        let found = service.search("alpha").await.unwrap();
        service.add_item(&mut lifecycle, Arc::clone(&found[0])).unwrap();
        assert_eq!(cache.load_draft("hen").unwrap().unwrap().entries.len(), 1);

        service.submit(&mut lifecycle).await.unwrap();
        assert_eq!(lifecycle.status(), BallotStatus::Submitted);
        assert!(cache.load_draft("hen").unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_save_leaves_the_draft_alone() {
        let cache = Arc::new(MemoryDraftCache::new());
        let service = service_with(Arc::new(FailingStore), Arc::clone(&cache));
        let mut session = logged_in(&service).await;
        let mut lifecycle = service.open_ballot(&mut session).await.unwrap().lifecycle;

        let found = service.search("bravo").await.unwrap();
        service.add_item(&mut lifecycle, Arc::clone(&found[0])).unwrap();

        assert!(matches!(
            service.submit(&mut lifecycle).await,
            Err(BallotError::PersistenceUnavailable(_))
        ));
        assert_eq!(lifecycle.status(), BallotStatus::Draft);
        assert!(cache.load_draft("hen").unwrap().is_some());
        assert!(matches!(
            service.tally(ScoringAlgorithm::Linear).await,
            Err(BallotError::PersistenceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn rescind_then_reopen_keeps_entries() {
        let store = Arc::new(MemoryBallotStore::new());
        let service = service_with(store.clone(), Arc::new(MemoryDraftCache::new()));
        let mut session = logged_in(&service).await;
        let mut lifecycle = service.open_ballot(&mut session).await.unwrap().lifecycle;

        for query in ["alpha", "bravo"] {
            let found = service.search(query).await.unwrap();
            service.add_item(&mut lifecycle, Arc::clone(&found[0])).unwrap();
        }
        service.submit(&mut lifecycle).await.unwrap();
        service
            .rescind(&mut lifecycle, RescindConfirmation::acknowledge())
            .await
            .unwrap();

        let stored = store.get_ballot("hen").await.unwrap().unwrap();
        assert_eq!(stored.status, BallotStatus::Rescinded);
        assert_eq!(stored.entries.len(), 2);
        assert!(service.tally(ScoringAlgorithm::Linear).await.unwrap().entries.is_empty());

        service.reopen(&mut lifecycle).unwrap();
        let reloaded = service.open_ballot(&mut session).await.unwrap();
        assert_eq!(reloaded.source, DraftSource::Rescinded);
        assert!(reloaded.notice.is_none());

        service.move_item(&mut lifecycle, "bravo", 1).unwrap();
        service.remove_item(&mut lifecycle, "alpha").unwrap();
        service.submit(&mut lifecycle).await.unwrap();

        let results = service.tally(ScoringAlgorithm::Linear).await.unwrap();
        assert_eq!(results.entries.len(), 1);
        assert_eq!(results.entries[0].item.id, "bravo");

        let reopened = service.open_ballot(&mut session).await.unwrap();
        assert_eq!(reopened.source, DraftSource::Submitted);
    }
}
