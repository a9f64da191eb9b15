//! Poll bot dispatcher
//!
//! Glue between the gateway and the poll core: inbound event → command
//! parser → engine → outbound notice. Notices are posted after the engine
//! call returns, so no store lock is held while talking to the platform.

use crate::gateway::{self, DynGateway, InboundEvent};
use crate::polls::{parse_command, Command, Notice, PollEngine, PollError, SweeperHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Poll bot bound to one gateway
pub struct PollBot {
    engine: Arc<PollEngine>,
    gateway: DynGateway,
}

impl PollBot {
    pub fn new(engine: Arc<PollEngine>, gateway: DynGateway) -> Self {
        Self { engine, gateway }
    }

    pub fn engine(&self) -> &Arc<PollEngine> {
        &self.engine
    }

    /// Run one message through the parser and engine.
    ///
    /// Returns the notice to post, or `None` when the text is not a command.
    pub fn handle_text(&self, user_id: &str, channel: &str, text: &str) -> Option<Notice> {
        let command = parse_command(text);
        let result = match command {
            Command::Ignore => return None,
            Command::CreatePoll(request) => self.engine.create_poll(channel, user_id, request),
            Command::Vote(raw) => self.engine.vote(channel, user_id, &raw),
            Command::EndPoll => self.engine.end_poll(channel),
            Command::Malformed(reason) => Err(PollError::MalformedCommand(reason)),
        };

        Some(result.unwrap_or_else(|e| {
            debug!(
                channel = %channel,
                user = %user_id,
                error = e.kind(),
                "poll command rejected"
            );
            Notice::new(channel, e.to_string())
        }))
    }

    /// Handle one inbound event and post the resulting notice.
    ///
    /// Returns true if a notice was produced.
    pub async fn handle_event(&self, event: InboundEvent) -> bool {
        let Some((user_id, channel, text)) = event.into_parts() else {
            debug!("ignoring event with missing fields");
            return false;
        };

        match self.handle_text(&user_id, &channel, &text) {
            Some(notice) => {
                gateway::deliver(self.gateway.as_ref(), &notice).await;
                true
            }
            None => false,
        }
    }

    /// Start the expiration sweeper for this bot's engine and gateway
    pub fn spawn_sweeper(&self, interval: Duration) -> SweeperHandle {
        SweeperHandle::spawn(self.engine.clone(), self.gateway.clone(), interval)
    }

    /// Process events in arrival order until the sender closes, `shutdown`
    /// flips to true, or its sender is dropped. Returns the number of events
    /// processed.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<InboundEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> usize {
        let mut processed = 0;
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    self.handle_event(event).await;
                    processed += 1;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(processed, "event loop stopped");
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::RecordingGateway;
    use crate::polls::PollSettings;

    fn bot() -> (PollBot, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::new());
        let engine = Arc::new(PollEngine::new(PollSettings::default()));
        (PollBot::new(engine, gateway.clone()), gateway)
    }

    #[test]
    fn test_handle_text_ignores_chatter() {
        let (bot, _) = bot();
        assert!(bot.handle_text("U1", "C1", "good morning").is_none());
    }

    #[test]
    fn test_handle_text_malformed_poll() {
        let (bot, _) = bot();
        let notice = bot.handle_text("U1", "C1", "!poll Lunch?,Pizza,Sushi,soon").unwrap();
        assert!(notice.text.contains("Usage: !poll"));
        assert!(bot.engine().store().get("C1").is_none());
    }

    #[test]
    fn test_handle_text_routes_commands() {
        let (bot, _) = bot();
        let created = bot.handle_text("U0", "C1", "!poll Lunch?,Pizza,Sushi,60").unwrap();
        assert!(created.text.contains("2. Sushi"));

        let voted = bot.handle_text("U1", "C1", "!vote 2").unwrap();
        assert!(voted.text.contains("'Sushi'"));

        let invalid = bot.handle_text("U1", "C1", "!vote nine").unwrap();
        assert_eq!(invalid.text, "Invalid option. Please vote for a valid option.");

        let ended = bot.handle_text("U0", "C1", "!endpoll").unwrap();
        assert!(ended.text.contains("Sushi: 1 votes"));

        let again = bot.handle_text("U0", "C1", "!endpoll").unwrap();
        assert_eq!(again.text, "No active poll to end.");
    }

    #[tokio::test]
    async fn test_handle_event_posts_notice() {
        let (bot, gateway) = bot();
        assert!(bot.handle_event(InboundEvent::new("U1", "C1", "!vote 1")).await);
        assert_eq!(
            gateway.last_text("C1").as_deref(),
            Some("No active poll to vote on.")
        );
    }

    #[tokio::test]
    async fn test_handle_event_drops_incomplete_events() {
        let (bot, gateway) = bot();
        let event = InboundEvent {
            user: None,
            ..InboundEvent::new("U1", "C1", "!endpoll")
        };
        assert!(!bot.handle_event(event).await);
        assert!(!bot.handle_event(InboundEvent::new("U1", "C1", "hello")).await);
        assert!(gateway.messages().is_empty());
    }

    #[tokio::test]
    async fn test_run_processes_in_order_until_closed() {
        let (bot, gateway) = bot();
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tx.send(InboundEvent::new("U0", "C1", "!poll Q?,A,B,60")).await.unwrap();
        tx.send(InboundEvent::new("U1", "C1", "!vote 1")).await.unwrap();
        tx.send(InboundEvent::new("U0", "C1", "!endpoll")).await.unwrap();
        drop(tx);

        assert_eq!(bot.run(rx, shutdown_rx).await, 3);
        let texts = gateway.texts_for("C1");
        assert_eq!(texts.len(), 3);
        assert!(texts[2].contains("A: 1 votes"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (bot, _) = bot();
        let (_tx, rx) = mpsc::channel::<InboundEvent>(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        shutdown_tx.send(true).unwrap();
        let processed = tokio::time::timeout(Duration::from_secs(2), bot.run(rx, shutdown_rx))
            .await
            .unwrap();
        assert_eq!(processed, 0);
    }

    #[tokio::test]
    async fn test_run_ignores_shutdown_change_to_false() {
        let (bot, gateway) = bot();
        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        shutdown_tx.send(false).unwrap();
        tx.send(InboundEvent::new("U1", "C1", "!endpoll")).await.unwrap();
        drop(tx);

        let processed = tokio::time::timeout(Duration::from_secs(2), bot.run(rx, shutdown_rx))
            .await
            .unwrap();
        assert_eq!(processed, 1);
        assert_eq!(gateway.last_text("C1").as_deref(), Some("No active poll to end."));
        drop(shutdown_tx);
    }
}
