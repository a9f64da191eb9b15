//! Polling Module
//!
//! Channel polls driven by chat commands: `!poll`, `!vote` and `!endpoll`,
//! plus a sweeper that closes polls when their time runs out.

pub mod command;
pub mod engine;
pub mod error;
pub mod poll;
pub mod store;
pub mod sweeper;

pub use command::{parse_command, Command, CreatePollRequest};
pub use engine::{create_engine, CloseReason, Notice, PollEngine, PollEngineStats, PollSettings};
pub use error::{PollAction, PollError, PollResult};
pub use poll::{OptionCount, Poll, PollResults, PollVote, VoteScope, VoterKey, VoterRecord};
pub use store::PollStore;
pub use sweeper::{sweep_once, SweeperHandle, MAX_SWEEP_INTERVAL};
