use crate::voting::ScoringAlgorithm;
use lazy_static::lazy_static;
use regex::Regex;

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: String, pin: String },
    Logout,
    Search(String),
    /// 1-based index into the last search results
    Add(usize),
    Remove(EntryRef),
    Move { entry: EntryRef, to_rank: u32 },
    /// Optionally with the points each rank is worth under `algorithm`
    Show { algorithm: Option<ScoringAlgorithm> },
    Submit,
    Rescind { confirmed: bool },
    Edit,
    Results { algorithm: ScoringAlgorithm, limit: usize },
    Help,
    Quit,
}

/// An entry named either by its current rank or by its item id.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryRef {
    Rank(u32),
    ItemId(String),
}

pub const DEFAULT_RESULTS_LIMIT: usize = 100;

lazy_static! {
    static ref LOGIN: Regex = Regex::new(r"(?i)^login\s+(\S+)\s+(\S+)$").unwrap();
    static ref SEARCH: Regex = Regex::new(r"(?i)^search\s+(.+)$").unwrap();
    static ref ADD: Regex = Regex::new(r"(?i)^add\s+(\d+)$").unwrap();
    static ref REMOVE: Regex = Regex::new(r"(?i)^remove\s+(\S+)$").unwrap();
    static ref MOVE: Regex = Regex::new(r"(?i)^move\s+(\S+)\s+(?:to\s+)?(\d+)$").unwrap();
    static ref SHOW: Regex = Regex::new(r"(?i)^(?:show|ballot)(?:\s+([A-Za-z]+))?$").unwrap();
    static ref RESCIND: Regex = Regex::new(r"(?i)^rescind(?:\s+(confirm))?$").unwrap();
    static ref RESULTS: Regex = Regex::new(r"(?i)^results(?:\s+([A-Za-z]+))?(?:\s+(\d+))?$").unwrap();
}

fn entry_ref(token: &str) -> EntryRef {
    // Catalog ids are never plain numbers
    match token.strip_prefix('#').unwrap_or(token).parse::<u32>() {
        Ok(rank) => EntryRef::Rank(rank),
        Err(_) => EntryRef::ItemId(token.to_string()),
    }
}

/// Parses a prompt line. `Ok(None)` means the line was blank.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let command = match line.to_lowercase().as_str() {
        "logout" => Command::Logout,
        "submit" => Command::Submit,
        "edit" => Command::Edit,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => parse_with_arguments(line)?,
    };
    Ok(Some(command))
}

fn parse_with_arguments(line: &str) -> Result<Command, String> {
    if let Some(caps) = LOGIN.captures(line) {
        return Ok(Command::Login {
            username: caps[1].to_string(),
            pin: caps[2].to_string(),
        });
    }
    if let Some(caps) = SEARCH.captures(line) {
        return Ok(Command::Search(caps[1].trim().to_string()));
    }
    if let Some(caps) = ADD.captures(line) {
        let index = caps[1]
            .parse::<usize>()
            .map_err(|_| format!("Not a result number: {}", &caps[1]))?;
        return Ok(Command::Add(index));
    }
    if let Some(caps) = REMOVE.captures(line) {
        return Ok(Command::Remove(entry_ref(&caps[1])));
    }
    if let Some(caps) = MOVE.captures(line) {
        let to_rank = caps[2]
            .parse::<u32>()
            .map_err(|_| format!("Not a rank: {}", &caps[2]))?;
        return Ok(Command::Move {
            entry: entry_ref(&caps[1]),
            to_rank,
        });
    }
    if let Some(caps) = SHOW.captures(line) {
        let algorithm = match caps.get(1) {
            Some(name) => Some(name.as_str().parse::<ScoringAlgorithm>()?),
            None => None,
        };
        return Ok(Command::Show { algorithm });
    }
    if let Some(caps) = RESCIND.captures(line) {
        return Ok(Command::Rescind {
            confirmed: caps.get(1).is_some(),
        });
    }
    if let Some(caps) = RESULTS.captures(line) {
        let algorithm = match caps.get(1) {
            Some(name) => name.as_str().parse::<ScoringAlgorithm>()?,
            None => ScoringAlgorithm::Linear,
        };
        let limit = match caps.get(2) {
            Some(n) => n
                .as_str()
                .parse::<usize>()
                .map_err(|_| format!("Not a count: {}", n.as_str()))?,
            None => DEFAULT_RESULTS_LIMIT,
        };
        return Ok(Command::Results { algorithm, limit });
    }

    Err(format!("Unknown command: {} (type 'help')", line))
}

pub const HELP: &str = "\
Commands:
  login <username> <pin>      sign in
  logout                      sign out and end the session
  search <text>               find tracks
  add <n>                     add result n from the last search
  remove <rank|track id>      take a track off your ballot
  move <rank|track id> <to>   move a track to a new position
  show [algorithm]            show your ballot, with points per rank
  submit                      submit your ballot
  rescind confirm             withdraw a submitted ballot
  edit                        reopen a rescinded ballot for changes
  results [algorithm] [n]     rank all submitted ballots
                              (borda, harmonic, logarithmic, exponential, normalized)
  quit                        leave";
