//! In-memory gateway that records every posted message.

use super::{Gateway, GatewayError, GatewayResult};
use crate::polls::Notice;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Gateway that keeps posted messages in memory
#[derive(Debug, Default)]
pub struct RecordingGateway {
    messages: Mutex<Vec<Notice>>,
    posted: Notify,
    fail: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose sends always fail
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Everything posted so far, oldest first
    pub fn messages(&self) -> Vec<Notice> {
        self.messages.lock().clone()
    }

    /// Texts posted to one channel
    pub fn texts_for(&self, channel: &str) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|n| n.channel == channel)
            .map(|n| n.text.clone())
            .collect()
    }

    /// Most recent text posted to a channel
    pub fn last_text(&self, channel: &str) -> Option<String> {
        self.texts_for(channel).pop()
    }

    /// Wait until at least `count` messages have been posted
    pub async fn wait_for(&self, count: usize) {
        loop {
            let notified = self.posted.notified();
            if self.messages.lock().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    fn name(&self) -> &str {
        "memory"
    }

    async fn post_message(&self, channel: &str, text: &str) -> GatewayResult<()> {
        if self.fail {
            return Err(GatewayError::SendFailed("recording gateway set to fail".to_string()));
        }
        self.messages.lock().push(Notice::new(channel, text));
        self.posted.notify_waiters();
        Ok(())
    }
}
