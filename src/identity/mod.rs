use crate::error::{BallotError, Result};
use crate::models::AuthenticatedUser;
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub authorized: bool,
    pub username: String,
    pub display_name: String,
}

impl AuthOutcome {
    fn denied() -> Self {
        Self {
            authorized: false,
            username: String::new(),
            display_name: String::new(),
        }
    }

    pub fn into_user(self) -> Option<AuthenticatedUser> {
        self.authorized.then(|| AuthenticatedUser {
            username: self.username,
            display_name: self.display_name,
        })
    }
}

#[async_trait]
pub trait IdentityCheck: Send + Sync {
    async fn authenticate(&self, claimed_id: &str, secret: &str) -> AuthOutcome;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    pub username: String,
    pub display_name: String,
    pub pin: String,
}

/// The fixed list of people allowed to vote.
#[derive(Debug, Clone)]
pub struct Roster {
    members: Vec<RosterMember>,
}

impl Roster {
    pub fn new(members: Vec<RosterMember>) -> Self {
        Self { members }
    }

    /// Reads a JSON array of `{username, displayName, pin}`.
    pub fn load(path: &Path) -> Result<Self> {
        let body = fs::read_to_string(path).map_err(|e| {
            BallotError::Config(format!("cannot read roster {}: {}", path.display(), e))
        })?;
        let members: Vec<RosterMember> = serde_json::from_str(&body).map_err(|e| {
            BallotError::Config(format!("invalid roster {}: {}", path.display(), e))
        })?;
        let roster = Self::new(members);
        if roster.is_empty() {
            return Err(BallotError::Config(format!("roster {} is empty", path.display())));
        }
        Ok(roster)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl IdentityCheck for Roster {
    async fn authenticate(&self, claimed_id: &str, secret: &str) -> AuthOutcome {
        let username = claimed_id.trim().to_lowercase();
        let pin = secret.trim().to_lowercase();

        self.members
            .iter()
            .find(|m| m.username.to_lowercase() == username)
            .filter(|m| m.pin.to_lowercase() == pin)
            .map(|m| AuthOutcome {
                authorized: true,
                username: m.username.to_lowercase(),
                display_name: m.display_name.clone(),
            })
            .unwrap_or_else(AuthOutcome::denied)
    }
}
