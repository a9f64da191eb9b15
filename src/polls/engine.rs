//! Poll Engine
//!
//! Applies poll commands against the store, enforces vote limits and option
//! validity, and produces the notices posted back to channels.

use super::command::{parse_unsigned, CreatePollRequest};
use super::error::{PollAction, PollError, PollResult};
use super::poll::{Poll, PollResults, PollVote, VoteScope, VoterKey};
use super::store::PollStore;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default number of votes each participant may cast
pub const DEFAULT_MAX_VOTES_PER_PARTICIPANT: u32 = 2;

/// Engine behaviour knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Votes a participant may cast
    pub max_votes_per_participant: u32,
    /// Whether the allowance resets per poll or lasts the whole process
    pub vote_scope: VoteScope,
    /// Replace a running poll on `!poll` instead of rejecting the request
    pub replace_active_poll: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_votes_per_participant: DEFAULT_MAX_VOTES_PER_PARTICIPANT,
            vote_scope: VoteScope::Poll,
            replace_active_poll: false,
        }
    }
}

/// Outbound text for a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub channel: String,
    pub text: String,
}

impl Notice {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
        }
    }
}

/// Why a poll was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// `!endpoll` was issued
    Ended,
    /// The sweeper found it past its end time
    Expired,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Ended => f.write_str("ended"),
            CloseReason::Expired => f.write_str("expired"),
        }
    }
}

/// Poll engine for managing channel polls
#[derive(Debug)]
pub struct PollEngine {
    store: PollStore,
    settings: PollSettings,
}

impl Default for PollEngine {
    fn default() -> Self {
        Self::new(PollSettings::default())
    }
}

impl PollEngine {
    /// Create a new poll engine with an empty store
    pub fn new(settings: PollSettings) -> Self {
        Self {
            store: PollStore::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Read access to the underlying store
    pub fn store(&self) -> &PollStore {
        &self.store
    }

    /// Start a poll in a channel
    pub fn create_poll(
        &self,
        channel: &str,
        user_id: &str,
        request: CreatePollRequest,
    ) -> PollResult<Notice> {
        let poll = Poll::new(channel, user_id, request, Utc::now())?;
        let announcement = poll.announcement();
        let poll_id = poll.id;
        let option_count = poll.options.len();
        let end_time = poll.end_time;

        let mut state = self.store.lock();
        let replaced = state.get(channel).map(|existing| existing.id);
        if replaced.is_some() {
            if !self.settings.replace_active_poll {
                return Err(PollError::PollAlreadyActive);
            }
            state.clear_voters(channel);
        }
        state.put(poll);
        drop(state);

        if let Some(old_id) = replaced {
            warn!(channel = %channel, old_poll_id = %old_id, poll_id = %poll_id, "replaced running poll");
        }
        info!(
            channel = %channel,
            poll_id = %poll_id,
            created_by = %user_id,
            options = option_count,
            end_time = %end_time,
            "poll created"
        );

        Ok(Notice::new(channel, announcement))
    }

    /// Cast a vote for the 1-based option named by `raw_option`
    pub fn vote(&self, channel: &str, user_id: &str, raw_option: &str) -> PollResult<Notice> {
        let max_votes = self.settings.max_votes_per_participant;
        let key = VoterKey::new(self.settings.vote_scope, channel, user_id);

        let mut state = self.store.lock();
        let poll = match state.get(channel) {
            Some(poll) if poll.active => poll,
            _ => return Err(PollError::NoActivePoll(PollAction::Vote)),
        };
        let poll_id = poll.id;

        let index = parse_unsigned(raw_option).ok_or(PollError::InvalidOption)?;
        let label = poll
            .option_label(index)
            .ok_or(PollError::InvalidOption)?
            .to_string();

        let cast = state.voter(&key).map(|r| r.votes_cast()).unwrap_or(0);
        if cast >= max_votes {
            return Err(PollError::VoteLimitReached);
        }

        if let Some(poll) = state.get_mut(channel) {
            poll.votes.push(PollVote {
                voter_id: user_id.to_string(),
                option: label.clone(),
            });
        }
        let remaining = max_votes.saturating_sub(state.record_vote(&key, index).votes_cast());
        drop(state);

        debug!(
            channel = %channel,
            poll_id = %poll_id,
            user = %user_id,
            option = index,
            remaining,
            "vote recorded"
        );

        Ok(Notice::new(
            channel,
            format!(
                "🗳️ Your vote for '{}' has been recorded. You have {} votes remaining.",
                label, remaining
            ),
        ))
    }

    /// Close the channel's poll on request and report the results
    pub fn end_poll(&self, channel: &str) -> PollResult<Notice> {
        self.close_where(channel, CloseReason::Ended, |_| true)
    }

    /// Close a poll on behalf of the sweeper.
    ///
    /// Re-checks under the lock that the same poll is still stored and past
    /// its end time, so a poll that was ended or replaced after the scan is
    /// left alone.
    pub fn force_close(
        &self,
        channel: &str,
        poll_id: Uuid,
        now: DateTime<Utc>,
    ) -> PollResult<Notice> {
        self.close_where(channel, CloseReason::Expired, |poll| {
            poll.id == poll_id && poll.is_expired(now)
        })
    }

    fn close_where(
        &self,
        channel: &str,
        reason: CloseReason,
        predicate: impl FnOnce(&Poll) -> bool,
    ) -> PollResult<Notice> {
        let mut state = self.store.lock();
        let Some(poll) = state
            .get_mut(channel)
            .filter(|poll| poll.active && predicate(poll))
        else {
            return Err(PollError::NoActivePoll(PollAction::End));
        };

        poll.close();
        let results = poll.results();
        state.delete(channel);
        let cleared_voters = state.clear_voters(channel);
        drop(state);

        info!(
            channel = %channel,
            poll_id = %results.poll_id,
            reason = %reason,
            total_votes = results.total_votes,
            cleared_voters,
            "poll closed"
        );

        Ok(Notice::new(channel, results.render()))
    }

    /// Current tally of a channel's poll
    pub fn tally(&self, channel: &str) -> Option<PollResults> {
        self.store.lock().get(channel).map(Poll::results)
    }

    /// Channel and ID of every active poll whose end time has passed
    pub fn expired_polls(&self, now: DateTime<Utc>) -> Vec<(String, Uuid)> {
        self.store.select(|poll| poll.active && poll.is_expired(now))
    }

    /// Get engine statistics
    pub fn stats(&self) -> PollEngineStats {
        let state = self.store.lock();
        PollEngineStats {
            active_polls: state.polls().filter(|p| p.active).count(),
            total_votes: state.polls().map(|p| p.votes.len()).sum(),
            tracked_voters: state.voter_count(),
        }
    }
}

/// Statistics for the poll engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollEngineStats {
    /// Number of running polls
    pub active_polls: usize,
    /// Votes cast across running polls
    pub total_votes: usize,
    /// Voter records currently held
    pub tracked_voters: usize,
}

/// Create a shared poll engine
pub fn create_engine(settings: PollSettings) -> Arc<PollEngine> {
    Arc::new(PollEngine::new(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn request(question: &str, options: &[&str], duration_seconds: u64) -> CreatePollRequest {
        CreatePollRequest {
            question: question.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            duration_seconds,
        }
    }

    fn engine_with_poll() -> PollEngine {
        let engine = PollEngine::default();
        engine
            .create_poll("C1", "U0", request("Best fruit?", &["Apple", "Banana"], 30))
            .unwrap();
        engine
    }

    #[test]
    fn test_create_poll_announces_options() {
        let engine = PollEngine::default();
        let notice = engine
            .create_poll("C1", "U0", request("Best fruit?", &["Apple", "Banana"], 30))
            .unwrap();

        assert_eq!(notice.channel, "C1");
        assert!(notice.text.contains("1. Apple"));
        assert!(notice.text.contains("2. Banana"));
        assert!(notice.text.contains("ends in 30 seconds"));

        let poll = engine.store().get("C1").unwrap();
        assert_eq!(poll.options, vec!["Apple", "Banana"]);
        assert!(poll.active);
    }

    #[test]
    fn test_create_poll_rejects_single_option() {
        let engine = PollEngine::default();
        let err = engine
            .create_poll("C1", "U0", request("Q?", &["Only"], 30))
            .unwrap_err();
        assert!(matches!(err, PollError::MalformedCommand(_)));
        assert!(engine.store().get("C1").is_none());
    }

    #[test]
    fn test_create_poll_rejects_when_active() {
        let engine = engine_with_poll();
        let original = engine.store().get("C1").unwrap().id;

        let err = engine
            .create_poll("C1", "U9", request("Other?", &["X", "Y"], 10))
            .unwrap_err();
        assert_eq!(err, PollError::PollAlreadyActive);
        assert_eq!(engine.store().get("C1").unwrap().id, original);
    }

    #[test]
    fn test_create_poll_replaces_when_configured() {
        let engine = PollEngine::new(PollSettings {
            replace_active_poll: true,
            ..PollSettings::default()
        });
        engine
            .create_poll("C1", "U0", request("Old?", &["A", "B"], 30))
            .unwrap();
        engine.vote("C1", "U1", "1").unwrap();
        engine.vote("C1", "U1", "1").unwrap();

        engine
            .create_poll("C1", "U0", request("New?", &["X", "Y"], 30))
            .unwrap();
        let poll = engine.store().get("C1").unwrap();
        assert_eq!(poll.question, "New?");
        assert!(poll.votes.is_empty());
        // Allowance starts over with the new poll
        assert!(engine.vote("C1", "U1", "2").is_ok());
    }

    #[test]
    fn test_polls_in_different_channels_are_independent() {
        let engine = engine_with_poll();
        engine
            .create_poll("C2", "U0", request("Other?", &["X", "Y"], 30))
            .unwrap();
        engine.vote("C2", "U1", "2").unwrap();

        assert_eq!(engine.tally("C1").unwrap().total_votes, 0);
        assert_eq!(engine.tally("C2").unwrap().count_for("Y"), 1);
    }

    #[test]
    fn test_vote_confirms_and_counts_down() {
        let engine = engine_with_poll();

        let first = engine.vote("C1", "U1", "1").unwrap();
        assert!(first.text.contains("'Apple'"));
        assert!(first.text.contains("1 votes remaining"));

        let second = engine.vote("C1", "U1", "2").unwrap();
        assert!(second.text.contains("'Banana'"));
        assert!(second.text.contains("0 votes remaining"));
    }

    #[test]
    fn test_vote_without_poll() {
        let engine = PollEngine::default();
        assert_eq!(
            engine.vote("C1", "U1", "1").unwrap_err(),
            PollError::NoActivePoll(PollAction::Vote)
        );
    }

    #[test]
    fn test_vote_without_poll_wins_over_bad_option() {
        let engine = PollEngine::default();
        assert_eq!(
            engine.vote("C1", "U1", "abc").unwrap_err(),
            PollError::NoActivePoll(PollAction::Vote)
        );
    }

    #[test]
    fn test_invalid_option_does_not_mutate() {
        let engine = engine_with_poll();
        for raw in ["0", "3", "-1", "abc", "", "1.0", "99999999999999999999999"] {
            assert_eq!(
                engine.vote("C1", "U1", raw).unwrap_err(),
                PollError::InvalidOption,
                "{raw}"
            );
        }

        assert!(engine.store().get("C1").unwrap().votes.is_empty());
        let key = VoterKey::new(VoteScope::Poll, "C1", "U1");
        assert!(engine.store().voter(&key).is_none());
    }

    #[test]
    fn test_vote_limit_reached_does_not_mutate() {
        let engine = engine_with_poll();
        engine.vote("C1", "U1", "1").unwrap();
        engine.vote("C1", "U1", "1").unwrap();

        assert_eq!(
            engine.vote("C1", "U1", "2").unwrap_err(),
            PollError::VoteLimitReached
        );
        let tally = engine.tally("C1").unwrap();
        assert_eq!(tally.total_votes, 2);
        assert_eq!(tally.count_for("Banana"), 0);
    }

    #[test]
    fn test_vote_limit_is_configurable() {
        let engine = PollEngine::new(PollSettings {
            max_votes_per_participant: 1,
            ..PollSettings::default()
        });
        engine
            .create_poll("C1", "U0", request("Q?", &["A", "B"], 30))
            .unwrap();

        let notice = engine.vote("C1", "U1", "1").unwrap();
        assert!(notice.text.contains("0 votes remaining"));
        assert_eq!(
            engine.vote("C1", "U1", "1").unwrap_err(),
            PollError::VoteLimitReached
        );
        assert!(engine.vote("C1", "U2", "2").is_ok());
    }

    #[test]
    fn test_end_poll_without_votes() {
        let engine = engine_with_poll();
        let notice = engine.end_poll("C1").unwrap();
        assert!(notice.text.contains("No votes were cast in this poll."));

        assert!(engine.store().get("C1").is_none());
        assert_eq!(
            engine.end_poll("C1").unwrap_err(),
            PollError::NoActivePoll(PollAction::End)
        );
        assert_eq!(
            engine.vote("C1", "U1", "1").unwrap_err(),
            PollError::NoActivePoll(PollAction::Vote)
        );
    }

    #[test]
    fn test_end_poll_reports_counts() {
        let engine = engine_with_poll();
        engine.vote("C1", "U1", "1").unwrap();
        engine.vote("C1", "U2", "1").unwrap();
        engine.vote("C1", "U2", "2").unwrap();

        let notice = engine.end_poll("C1").unwrap();
        assert!(notice.text.starts_with("🛑 Poll has ended. Final results:\n"));
        assert!(notice.text.contains("Apple: 2 votes"));
        assert!(notice.text.contains("Banana: 1 votes"));
    }

    #[test]
    fn test_end_poll_resets_allowance_per_poll() {
        let engine = engine_with_poll();
        engine.vote("C1", "U1", "1").unwrap();
        engine.vote("C1", "U1", "1").unwrap();
        engine.end_poll("C1").unwrap();
        assert_eq!(engine.stats().tracked_voters, 0);

        engine
            .create_poll("C1", "U0", request("Again?", &["A", "B"], 30))
            .unwrap();
        assert!(engine.vote("C1", "U1", "1").is_ok());
    }

    #[test]
    fn test_process_scope_keeps_allowance_across_polls() {
        let engine = PollEngine::new(PollSettings {
            vote_scope: VoteScope::Process,
            ..PollSettings::default()
        });
        engine
            .create_poll("C1", "U0", request("Q?", &["A", "B"], 30))
            .unwrap();
        engine
            .create_poll("C2", "U0", request("Q?", &["A", "B"], 30))
            .unwrap();

        engine.vote("C1", "U1", "1").unwrap();
        engine.vote("C2", "U1", "1").unwrap();
        assert_eq!(
            engine.vote("C2", "U1", "2").unwrap_err(),
            PollError::VoteLimitReached
        );

        engine.end_poll("C1").unwrap();
        assert_eq!(engine.stats().tracked_voters, 1);
        assert_eq!(
            engine.vote("C2", "U1", "2").unwrap_err(),
            PollError::VoteLimitReached
        );
    }

    #[test]
    fn test_force_close_requires_expiry() {
        let engine = engine_with_poll();
        let poll = engine.store().get("C1").unwrap();

        let before = poll.end_time - TimeDelta::seconds(1);
        assert!(engine.force_close("C1", poll.id, before).is_err());
        assert!(engine.store().get("C1").is_some());

        let notice = engine.force_close("C1", poll.id, poll.end_time).unwrap();
        assert!(notice.text.contains("No votes were cast"));
        assert!(engine.store().get("C1").is_none());
    }

    #[test]
    fn test_force_close_skips_replaced_poll() {
        let engine = PollEngine::new(PollSettings {
            replace_active_poll: true,
            ..PollSettings::default()
        });
        engine
            .create_poll("C1", "U0", request("Old?", &["A", "B"], 0))
            .unwrap();
        let old = engine.store().get("C1").unwrap();

        engine
            .create_poll("C1", "U0", request("New?", &["A", "B"], 0))
            .unwrap();

        let later = old.end_time + TimeDelta::seconds(5);
        assert!(engine.force_close("C1", old.id, later).is_err());
        assert_eq!(engine.store().get("C1").unwrap().question, "New?");
    }

    #[test]
    fn test_expired_polls() {
        let engine = engine_with_poll();
        engine
            .create_poll("C2", "U0", request("Quick?", &["A", "B"], 0))
            .unwrap();

        let now = Utc::now();
        let expired = engine.expired_polls(now);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].0, "C2");

        let later = now + TimeDelta::seconds(31);
        assert_eq!(engine.expired_polls(later).len(), 2);
    }

    #[test]
    fn test_stats() {
        let engine = engine_with_poll();
        engine.vote("C1", "U1", "1").unwrap();
        engine.vote("C1", "U2", "2").unwrap();

        let stats = engine.stats();
        assert_eq!(stats.active_polls, 1);
        assert_eq!(stats.total_votes, 2);
        assert_eq!(stats.tracked_voters, 2);
    }

    #[test]
    fn test_concurrent_votes_respect_limit() {
        let engine = Arc::new(engine_with_poll());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || engine.vote("C1", "U1", "1").is_ok())
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 2);
        assert_eq!(engine.tally("C1").unwrap().total_votes, 2);
    }
}
