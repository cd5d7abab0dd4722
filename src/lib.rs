//! Ranked song ballots for a fixed group of voters: editing, submitting and
//! rescinding one ballot per person, and tallying everyone's lists under a
//! choice of scoring formulas.

pub mod ballot;
pub mod cache;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod session;
pub mod voting;

pub use error::{BallotError, Result};
