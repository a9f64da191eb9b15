//! Poll Store
//!
//! In-memory registry of active polls keyed by channel, plus per-voter vote
//! tracking. A single lock guards both maps so an engine operation sees and
//! changes them atomically.

use super::poll::{Poll, VoterKey, VoterRecord};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use uuid::Uuid;

/// State guarded by the store lock
#[derive(Debug, Default)]
pub struct StoreState {
    polls: HashMap<String, Poll>,
    voters: HashMap<VoterKey, VoterRecord>,
}

impl StoreState {
    pub fn get(&self, channel: &str) -> Option<&Poll> {
        self.polls.get(channel)
    }

    pub fn get_mut(&mut self, channel: &str) -> Option<&mut Poll> {
        self.polls.get_mut(channel)
    }

    /// Insert a poll, returning the one it replaced
    pub fn put(&mut self, poll: Poll) -> Option<Poll> {
        self.polls.insert(poll.channel.clone(), poll)
    }

    pub fn delete(&mut self, channel: &str) -> Option<Poll> {
        self.polls.remove(channel)
    }

    /// Votes cast under a key so far
    pub fn voter(&self, key: &VoterKey) -> Option<&VoterRecord> {
        self.voters.get(key)
    }

    /// Record that a voter used one vote on `option_index`
    pub fn record_vote(&mut self, key: &VoterKey, option_index: u64) -> &VoterRecord {
        let record = self
            .voters
            .entry(key.clone())
            .or_insert_with(|| VoterRecord::new(key.user_id.clone()));
        record.cast_option_indices.push(option_index);
        record
    }

    /// Drop the voter records tied to a channel, returning how many went away.
    ///
    /// Process-wide records carry no channel and are never cleared.
    pub fn clear_voters(&mut self, channel: &str) -> usize {
        let before = self.voters.len();
        self.voters
            .retain(|key, _| key.channel.as_deref() != Some(channel));
        before - self.voters.len()
    }

    pub fn voter_count(&self) -> usize {
        self.voters.len()
    }

    pub fn polls(&self) -> impl Iterator<Item = &Poll> {
        self.polls.values()
    }
}

/// Thread-safe poll registry
#[derive(Debug, Default)]
pub struct PollStore {
    state: Mutex<StoreState>,
}

impl PollStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the store lock for a multi-step operation.
    ///
    /// Do not hold the guard across I/O.
    pub fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock()
    }

    /// Copy of the poll stored for a channel
    pub fn get(&self, channel: &str) -> Option<Poll> {
        self.state.lock().get(channel).cloned()
    }

    /// Store a poll, returning the one it replaced
    pub fn put(&self, poll: Poll) -> Option<Poll> {
        self.state.lock().put(poll)
    }

    /// Remove a channel's poll along with its voter records
    pub fn delete(&self, channel: &str) -> Option<Poll> {
        let mut state = self.state.lock();
        state.clear_voters(channel);
        state.delete(channel)
    }

    /// Copy of a voter's record
    pub fn voter(&self, key: &VoterKey) -> Option<VoterRecord> {
        self.state.lock().voter(key).cloned()
    }

    /// Snapshot of every stored poll.
    ///
    /// The copy is detached from the store, so callers can scan it while
    /// other tasks keep mutating.
    pub fn all_entries(&self) -> Vec<(String, Poll)> {
        self.state
            .lock()
            .polls
            .iter()
            .map(|(channel, poll)| (channel.clone(), poll.clone()))
            .collect()
    }

    /// Channel and ID of every poll matching `filter`
    pub fn select(&self, mut filter: impl FnMut(&Poll) -> bool) -> Vec<(String, Uuid)> {
        self.state
            .lock()
            .polls()
            .filter(|poll| filter(poll))
            .map(|poll| (poll.channel.clone(), poll.id))
            .collect()
    }
}
