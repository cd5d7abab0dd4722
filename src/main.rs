use log::{error, info};
use music_ballot::cache::FileDraftCache;
use music_ballot::catalog::HttpCatalog;
use music_ballot::commands::parse_command;
use music_ballot::config::Config;
use music_ballot::db::Database;
use music_ballot::handlers::{BallotService, Console};
use music_ballot::identity::Roster;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    let database = match Database::connect(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };

    let roster = match Roster::load(&config.roster_path) {
        Ok(roster) => roster,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    let catalog = match HttpCatalog::new(&config.catalog_url) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to build catalog client: {}", e);
            return;
        }
    };

    info!(
        "Voting for {} open: {} voters, up to {} tracks, {:?} submission",
        config.vote_period_label,
        roster.len(),
        config.max_entries,
        config.submission_policy
    );

    let service = BallotService::new(
        database,
        Arc::new(FileDraftCache::new(&config.draft_cache_path)),
        Arc::new(catalog),
        Arc::new(roster),
        config.max_entries,
        config.submission_policy,
    );
    let mut console = Console::new(service, config.vote_period);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let banner = format!(
        "Top songs of {} - type 'help' for commands.\n> ",
        config.vote_period_label
    );
    if stdout.write_all(banner.as_bytes()).await.is_err() {
        return;
    }
    let _ = stdout.flush().await;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };

        let (output, quit) = match parse_command(&line) {
            Ok(None) => (String::new(), false),
            Ok(Some(command)) => match console.handle(command).await {
                Ok(reply) => (reply.text, reply.quit),
                Err(e) => (format!("! {}", e), false),
            },
            Err(message) => (format!("! {}", message), false),
        };

        let mut out = output;
        if !out.is_empty() {
            out.push('\n');
        }
        if !quit {
            out.push_str("> ");
        }
        if stdout.write_all(out.as_bytes()).await.is_err() {
            break;
        }
        let _ = stdout.flush().await;
        if quit {
            break;
        }
    }
}
