use crate::error::{BallotError, Result};
use crate::models::AuthenticatedUser;
use log::info;
use uuid::Uuid;

/// Per-session state: who is logged in and whether the local draft notice
/// has already been shown. Starts unauthenticated; `sign_out` resets it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    id: Uuid,
    user: Option<AuthenticatedUser>,
    restored_this_session: bool,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            user: None,
            restored_this_session: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }

    pub fn require_user(&self) -> Result<&AuthenticatedUser> {
        self.user.as_ref().ok_or(BallotError::NotAuthenticated)
    }

    /// Signing in as someone else first signs the current user out.
    pub fn sign_in(&mut self, user: AuthenticatedUser) {
        if self
            .user
            .as_ref()
            .is_some_and(|current| current.username != user.username)
        {
            self.sign_out();
        }
        info!("Session {} signed in as {}", self.id, user.username);
        self.user = Some(user);
    }

    pub fn sign_out(&mut self) {
        if let Some(user) = self.user.take() {
            info!("Session {} signed out {}", self.id, user.username);
        }
        self.restored_this_session = false;
    }

    pub fn has_restored_draft(&self) -> bool {
        self.restored_this_session
    }

    /// Records that the restore notice was shown. Returns false if it had
    /// already been shown this session.
    pub fn mark_draft_restored(&mut self) -> bool {
        !std::mem::replace(&mut self.restored_this_session, true)
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
