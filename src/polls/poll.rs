//! Poll data model
//!
//! Polls, vote records, voter tracking and tally results.

use super::command::CreatePollRequest;
use super::error::{PollError, PollResult};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Minimum number of options a poll must offer
pub const MIN_OPTIONS: usize = 2;

/// A single recorded vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollVote {
    /// User who cast the vote
    pub voter_id: String,
    /// Label of the chosen option
    pub option: String,
}

/// A poll running in one channel
#[derive(Debug, Clone)]
pub struct Poll {
    /// Unique ID, regenerated for every poll even in the same channel
    pub id: Uuid,
    /// Channel the poll lives in
    pub channel: String,
    /// The question being asked
    pub question: String,
    /// Option labels; users vote with their 1-based position
    pub options: Vec<String>,
    /// Votes in the order they were cast
    pub votes: Vec<PollVote>,
    /// True until the poll is closed
    pub active: bool,
    /// User who created the poll
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Fixed at creation, never recalculated
    pub end_time: DateTime<Utc>,
    /// Duration as requested, used in the announcement
    pub duration_seconds: u64,
}

impl Poll {
    /// Build a poll from a parsed creation request.
    pub fn new(
        channel: impl Into<String>,
        created_by: impl Into<String>,
        request: CreatePollRequest,
        now: DateTime<Utc>,
    ) -> PollResult<Self> {
        if request.question.is_empty() {
            return Err(PollError::MalformedCommand("the question is empty".to_string()));
        }
        if request.options.len() < MIN_OPTIONS {
            return Err(PollError::MalformedCommand(format!(
                "a poll needs at least {} options",
                MIN_OPTIONS
            )));
        }
        if let Some(position) = request.options.iter().position(|o| o.is_empty()) {
            return Err(PollError::MalformedCommand(format!(
                "option {} is empty",
                position + 1
            )));
        }

        let end_time = i64::try_from(request.duration_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or_else(|| PollError::MalformedCommand("the duration is too long".to_string()))?;

        Ok(Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            question: request.question,
            options: request.options,
            votes: Vec::new(),
            active: true,
            created_by: created_by.into(),
            created_at: now,
            end_time,
            duration_seconds: request.duration_seconds,
        })
    }

    /// Label for a 1-based option index
    pub fn option_label(&self, index: u64) -> Option<&str> {
        let index = usize::try_from(index).ok()?.checked_sub(1)?;
        self.options.get(index).map(String::as_str)
    }

    /// Whether the poll's end time has been reached
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }

    /// Mark the poll as closed
    pub fn close(&mut self) {
        self.active = false;
    }

    /// Text posted to the channel when the poll opens
    pub fn announcement(&self) -> String {
        let mut message = format!("📊 Poll: {}\n", self.question);
        for (idx, option) in self.options.iter().enumerate() {
            message.push_str(&format!("{}. {}\n", idx + 1, option));
        }
        message.push_str(&format!("Poll ends in {} seconds.", self.duration_seconds));
        message
    }

    /// Count votes per option label.
    ///
    /// Options are reported in declaration order; options nobody voted for
    /// are left out.
    pub fn results(&self) -> PollResults {
        let mut tally: HashMap<&str, u32> = HashMap::new();
        for vote in &self.votes {
            *tally.entry(vote.option.as_str()).or_insert(0) += 1;
        }

        let mut counts = Vec::new();
        for option in &self.options {
            if let Some(votes) = tally.remove(option.as_str()) {
                counts.push(OptionCount {
                    option: option.clone(),
                    votes,
                });
            }
        }

        PollResults {
            poll_id: self.id,
            question: self.question.clone(),
            counts,
            total_votes: self.votes.len() as u32,
        }
    }
}

/// Vote count for one option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionCount {
    pub option: String,
    pub votes: u32,
}

/// Tally of a poll
#[derive(Debug, Clone)]
pub struct PollResults {
    pub poll_id: Uuid,
    pub question: String,
    /// Per-option counts in declaration order
    pub counts: Vec<OptionCount>,
    pub total_votes: u32,
}

impl PollResults {
    /// Count for an option label, zero if nobody voted for it
    pub fn count_for(&self, option: &str) -> u32 {
        self.counts
            .iter()
            .find(|c| c.option == option)
            .map(|c| c.votes)
            .unwrap_or(0)
    }

    /// Closing announcement text
    pub fn render(&self) -> String {
        let mut body = String::new();
        if self.counts.is_empty() {
            body.push_str("No votes were cast in this poll.");
        } else {
            for count in &self.counts {
                body.push_str(&format!("{}: {} votes\n", count.option, count.votes));
            }
        }
        format!("🛑 Poll has ended. Final results:\n{}", body)
    }
}

/// How far a participant's vote allowance reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteScope {
    /// Allowance resets with every poll
    #[default]
    Poll,
    /// One allowance per user for the whole process lifetime
    Process,
}

/// Key under which a participant's votes are tracked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoterKey {
    /// Set when votes are scoped to a channel's poll
    pub channel: Option<String>,
    pub user_id: String,
}

impl VoterKey {
    pub fn new(scope: VoteScope, channel: &str, user_id: &str) -> Self {
        Self {
            channel: match scope {
                VoteScope::Poll => Some(channel.to_string()),
                VoteScope::Process => None,
            },
            user_id: user_id.to_string(),
        }
    }
}

/// Votes a participant has used up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterRecord {
    pub user_id: String,
    /// 1-based option indices, in the order they were cast
    pub cast_option_indices: Vec<u64>,
}

impl VoterRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            cast_option_indices: Vec::new(),
        }
    }

    /// Number of votes cast so far
    pub fn votes_cast(&self) -> u32 {
        self.cast_option_indices.len() as u32
    }
}
