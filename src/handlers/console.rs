use crate::ballot::{BallotLifecycle, DraftSource, RescindConfirmation};
use crate::commands::{Command, EntryRef, HELP};
use crate::error::{BallotError, Result};
use crate::handlers::BallotService;
use crate::models::{Item, VotePeriod};
use crate::session::SessionContext;
use crate::voting::ScoringAlgorithm;
use log::info;
use std::sync::Arc;

/// What to print after a command, and whether to stop reading input.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub quit: bool,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quit: false,
        }
    }
}

/// Routes parsed commands for one interactive session.
pub struct Console {
    service: BallotService,
    period: VotePeriod,
    session: SessionContext,
    lifecycle: Option<BallotLifecycle>,
    last_results: Vec<Arc<Item>>,
}

impl Console {
    pub fn new(service: BallotService, period: VotePeriod) -> Self {
        Self {
            service,
            period,
            session: SessionContext::new(),
            lifecycle: None,
            last_results: Vec::new(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn lifecycle(&self) -> Option<&BallotLifecycle> {
        self.lifecycle.as_ref()
    }

    pub async fn handle(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Help => Ok(Reply::text(HELP)),
            Command::Quit => Ok(Reply {
                text: "Bye.".to_string(),
                quit: true,
            }),
            Command::Login { username, pin } => self.login(&username, &pin).await,
            Command::Logout => {
                self.service.logout(&mut self.session);
                self.lifecycle = None;
                self.last_results.clear();
                Ok(Reply::text("Logged out."))
            }
            Command::Search(query) => self.search(&query).await,
            Command::Add(index) => {
                let item = self
                    .last_results
                    .get(index.wrapping_sub(1))
                    .cloned()
                    .ok_or_else(|| BallotError::NotFound(format!("search result {}", index)))?;
                let lifecycle = editable(&self.session, &mut self.lifecycle)?;
                let rank = self.service.add_item(lifecycle, Arc::clone(&item))?;
                Ok(Reply::text(format!("Added {} at #{}.", item.name, rank)))
            }
            Command::Remove(entry) => {
                let item_id = self.resolve(&entry)?;
                let lifecycle = editable(&self.session, &mut self.lifecycle)?;
                let removed = self.service.remove_item(lifecycle, &item_id)?;
                Ok(Reply::text(format!("Removed {}.", removed.item.name)))
            }
            Command::Move { entry, to_rank } => {
                let item_id = self.resolve(&entry)?;
                let lifecycle = editable(&self.session, &mut self.lifecycle)?;
                let rank = self.service.move_item(lifecycle, &item_id, to_rank)?;
                Ok(Reply::text(format!("Moved to #{}.", rank)))
            }
            Command::Show { algorithm } => Ok(Reply::text(render_ballot(
                self.lifecycle_ref()?,
                &self.period,
                algorithm,
            ))),
            Command::Submit => {
                let lifecycle = editable(&self.session, &mut self.lifecycle)?;
                self.service.submit(lifecycle).await?;
                Ok(Reply::text("Ballot submitted. Thanks for voting!"))
            }
            Command::Rescind { confirmed: false } => Ok(Reply::text(
                "Rescinding withdraws your submitted vote. Type 'rescind confirm' to go ahead.",
            )),
            Command::Rescind { confirmed: true } => {
                let lifecycle = editable(&self.session, &mut self.lifecycle)?;
                self.service
                    .rescind(lifecycle, RescindConfirmation::acknowledge())
                    .await?;
                Ok(Reply::text(
                    "Vote rescinded. Your picks are kept; 'edit' to change and resubmit.",
                ))
            }
            Command::Edit => {
                let lifecycle = editable(&self.session, &mut self.lifecycle)?;
                self.service.reopen(lifecycle)?;
                Ok(Reply::text(render_ballot(lifecycle, &self.period, None)))
            }
            Command::Results { algorithm, limit } => {
                self.session.require_user()?;
                let results = self.service.tally(algorithm).await?;
                Ok(Reply::text(results.summary(limit)))
            }
        }
    }

    async fn login(&mut self, username: &str, pin: &str) -> Result<Reply> {
        let user = self.service.login(&mut self.session, username, pin).await?;
        let opened = self.service.open_ballot(&mut self.session).await?;
        info!("Session {} ready for {}", self.session.id(), user.username);

        let mut text = format!("Welcome, {}!\n", user.display_name);
        if let Some(notice) = &opened.notice {
            text.push_str(&format!(
                "Draft restored from this device ({} tracks, saved {}).\n",
                notice.entry_count,
                notice.saved_at.format("%Y-%m-%d %H:%M")
            ));
        }
        if opened.source == DraftSource::Submitted {
            text.push_str("Ballot already submitted. 'rescind confirm' to make changes.\n");
        }
        text.push_str(&render_ballot(&opened.lifecycle, &self.period, None));
        self.lifecycle = Some(opened.lifecycle);
        Ok(Reply::text(text))
    }

    async fn search(&mut self, query: &str) -> Result<Reply> {
        self.session.require_user()?;
        let results = self.service.search(query).await?;
        let taken = |item: &Item| {
            self.lifecycle
                .as_ref()
                .is_some_and(|lc| lc.entries().contains(&item.id))
        };
        let outside = format!(" [outside {}]", self.period.label());

        let mut text = String::new();
        if results.is_empty() {
            text.push_str("No tracks found.");
        }
        for (i, item) in results.iter().enumerate() {
            text.push_str(&format!(
                "{:>3}. {} - {} ({}, {}){}{}\n",
                i + 1,
                item.name,
                item.artist_line(),
                item.album,
                item.release_date,
                if item.in_period(&self.period) { "" } else { outside.as_str() },
                if taken(item) { " [on ballot]" } else { "" }
            ));
        }
        self.last_results = results;
        Ok(Reply::text(text.trim_end()))
    }

    fn lifecycle_ref(&self) -> Result<&BallotLifecycle> {
        self.session.require_user()?;
        self.lifecycle.as_ref().ok_or(BallotError::NotAuthenticated)
    }

    fn resolve(&self, entry: &EntryRef) -> Result<String> {
        match entry {
            EntryRef::ItemId(id) => Ok(id.clone()),
            EntryRef::Rank(rank) => self
                .lifecycle_ref()?
                .entries()
                .entries()
                .iter()
                .find(|e| e.rank == *rank)
                .map(|e| e.item_id.clone())
                .ok_or_else(|| BallotError::NotFound(format!("#{}", rank))),
        }
    }
}

// Split borrow; `service` stays free while the ballot is held
fn editable<'a>(
    session: &SessionContext,
    lifecycle: &'a mut Option<BallotLifecycle>,
) -> Result<&'a mut BallotLifecycle> {
    session.require_user()?;
    lifecycle.as_mut().ok_or(BallotError::NotAuthenticated)
}

fn render_ballot(
    lifecycle: &BallotLifecycle,
    period: &VotePeriod,
    algorithm: Option<ScoringAlgorithm>,
) -> String {
    let entries = lifecycle.entries();
    let list_length = entries.len() as u32;
    let mut text = format!(
        "Your ballot ({}, {}/{} tracks):\n",
        lifecycle.status(),
        entries.len(),
        entries.max_entries()
    );
    if entries.is_empty() {
        text.push_str("  (empty - 'search' for tracks to add)");
    }
    if let Some(algorithm) = algorithm {
        text.push_str(&format!("  points: {}\n", algorithm.name()));
    }
    for entry in entries.entries() {
        let points = algorithm
            .map(|a| format!(" {:.2} pts", a.score(entry.rank, list_length)))
            .unwrap_or_default();
        let outside = if entry.item.in_period(period) {
            String::new()
        } else {
            format!(" (outside {})", period.label())
        };
        text.push_str(&format!(
            "{:>3}. {} - {} [{}]{}{}\n",
            entry.rank,
            entry.item.name,
            entry.item.artist_line(),
            entry.item_id,
            points,
            outside
        ));
    }
    text.trim_end().to_string()
}
