mod memory;

pub use memory::MemoryBallotStore;

use crate::error::{BallotError, Result};
use crate::models::{Ballot, BallotEntry, BallotStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, migrate::MigrateDatabase};

/// Durable ballot storage, one ballot per owner. Writes are last-write-wins.
#[async_trait]
pub trait BallotStore: Send + Sync {
    async fn get_ballot(&self, owner: &str) -> Result<Option<Ballot>>;

    async fn put_ballot(&self, ballot: &Ballot) -> Result<()>;

    async fn delete_ballot(&self, owner: &str) -> Result<()>;

    /// Every stored ballot, whatever its status.
    async fn list_ballots(&self) -> Result<Vec<Ballot>>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(db_url: &str) -> Result<Self> {
        let in_memory = db_url.contains(":memory:");

        // Create database file if it doesn't exist
        if !in_memory && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating ballot database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        // An in-memory database lives and dies with its connection
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(db_url).await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ballots (
                owner TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                entries TEXT NOT NULL,
                submitted_at TEXT,
                rescinded_at TEXT
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    fn ballot_from_row(row: &SqliteRow) -> Result<Ballot> {
        let owner = row.get::<String, _>("owner");
        let status_str = row.get::<String, _>("status");
        let entries_json = row.get::<String, _>("entries");
        let submitted_at: Option<String> = row.get("submitted_at");
        let rescinded_at: Option<String> = row.get("rescinded_at");

        let status = BallotStatus::parse(&status_str).ok_or_else(|| {
            BallotError::PersistenceUnavailable(format!("Unknown ballot status: {}", status_str))
        })?;
        let entries: Vec<BallotEntry> = serde_json::from_str(&entries_json)?;

        Ok(Ballot {
            owner,
            entries,
            status,
            submitted_at: parse_timestamp(submitted_at, "submitted_at")?,
            rescinded_at: parse_timestamp(rescinded_at, "rescinded_at")?,
        })
    }
}

fn parse_timestamp(value: Option<String>, column: &str) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    BallotError::PersistenceUnavailable(format!("Failed to parse {}: {}", column, e))
                })
        })
        .transpose()
}

#[async_trait]
impl BallotStore for Database {
    async fn get_ballot(&self, owner: &str) -> Result<Option<Ballot>> {
        let row = sqlx::query(
            r#"
            SELECT owner, status, entries, submitted_at, rescinded_at
            FROM ballots
            WHERE owner = ?
            "#,
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::ballot_from_row).transpose()
    }

    async fn put_ballot(&self, ballot: &Ballot) -> Result<()> {
        let entries_json = serde_json::to_string(&ballot.entries)?;

        sqlx::query(
            r#"
            INSERT INTO ballots (owner, status, entries, submitted_at, rescinded_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(owner)
            DO UPDATE SET status = excluded.status,
                          entries = excluded.entries,
                          submitted_at = excluded.submitted_at,
                          rescinded_at = excluded.rescinded_at
            "#,
        )
        .bind(&ballot.owner)
        .bind(ballot.status.as_str())
        .bind(entries_json)
        .bind(ballot.submitted_at.map(|dt| dt.to_rfc3339()))
        .bind(ballot.rescinded_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_ballot(&self, owner: &str) -> Result<()> {
        sqlx::query("DELETE FROM ballots WHERE owner = ?")
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_ballots(&self) -> Result<Vec<Ballot>> {
        sqlx::query(
            r#"
            SELECT owner, status, entries, submitted_at, rescinded_at
            FROM ballots
            ORDER BY owner
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(Self::ballot_from_row)
        .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Item;
    use std::sync::Arc;

    pub(crate) fn ballot(owner: &str, ids: &[&str], status: BallotStatus) -> Ballot {
        Ballot {
            owner: owner.to_string(),
            entries: ids
                .iter()
                .enumerate()
                .map(|(i, id)| BallotEntry {
                    rank: i as u32 + 1,
                    item_id: id.to_string(),
                    item: Arc::new(Item {
                        id: id.to_string(),
                        name: format!("Track {}", id),
                        artists: vec!["One".to_string(), "Two".to_string()],
                        album: "Collection".to_string(),
                        release_date: "2016-03-04".to_string(),
                        images: Vec::new(),
                    }),
                })
                .collect(),
            status,
            submitted_at: Some(Utc::now()),
            rescinded_at: (status == BallotStatus::Rescinded).then(Utc::now),
        }
    }

    pub(crate) async fn exercise_store(store: &dyn BallotStore) {
        assert_eq!(store.get_ballot("hen").await.unwrap(), None);
        assert!(store.list_ballots().await.unwrap().is_empty());

        let first = ballot("hen", &["a", "b"], BallotStatus::Submitted);
        store.put_ballot(&first).await.unwrap();
        assert_eq!(store.get_ballot("hen").await.unwrap(), Some(first));

        // Last write wins
        let replaced = ballot("hen", &["b", "c", "d"], BallotStatus::Rescinded);
        store.put_ballot(&replaced).await.unwrap();
        assert_eq!(store.get_ballot("hen").await.unwrap(), Some(replaced.clone()));

        let other = ballot("aidan", &["a"], BallotStatus::Submitted);
        store.put_ballot(&other).await.unwrap();
        let all = store.list_ballots().await.unwrap();
        assert_eq!(all, vec![other, replaced]);

        store.delete_ballot("hen").await.unwrap();
        assert_eq!(store.get_ballot("hen").await.unwrap(), None);
        store.delete_ballot("hen").await.unwrap();
        assert_eq!(store.list_ballots().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sqlite_store_round_trip() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        exercise_store(&db).await;
    }

    #[tokio::test]
    async fn sqlite_store_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("ballots.db").display());
        {
            let db = Database::connect(&url).await.unwrap();
            db.put_ballot(&ballot("hen", &["a"], BallotStatus::Submitted))
                .await
                .unwrap();
            db.pool().close().await;
        }
        let reopened = Database::connect(&url).await.unwrap();
        let stored = reopened.get_ballot("hen").await.unwrap().unwrap();
        assert_eq!(stored.entries[0].item.artists, vec!["One", "Two"]);
    }
}
