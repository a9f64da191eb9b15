//! pollbot library
//!
//! Lightweight channel polls for chat platforms: a command parser, an
//! in-memory poll store, the poll engine that enforces vote limits and
//! tallies results, and a sweeper that closes expired polls. Platforms plug
//! in through the [`gateway::Gateway`] trait.

pub mod bot;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod polls;

pub use bot::PollBot;
pub use config::PollBotConfig;
