//! Messaging Gateway
//!
//! The boundary between the poll core and a chat platform: inbound text
//! events come in, "post this to a channel" calls go out.

pub mod console;
pub mod memory;

use crate::polls::Notice;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use console::ConsoleGateway;
pub use memory::RecordingGateway;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while talking to the platform
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Inbound message event as delivered by the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(default, alias = "user_id")]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl InboundEvent {
    /// Create a fully populated event
    pub fn new(
        user: impl Into<String>,
        channel: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user: Some(user.into()),
            channel: Some(channel.into()),
            text: Some(text.into()),
        }
    }

    /// Split into `(user, channel, text)`.
    ///
    /// Returns `None` when any field is missing or empty; such events are
    /// dropped.
    pub fn into_parts(self) -> Option<(String, String, String)> {
        let user = self.user.filter(|s| !s.is_empty())?;
        let channel = self.channel.filter(|s| !s.is_empty())?;
        let text = self.text.filter(|s| !s.is_empty())?;
        Some((user, channel, text))
    }
}

/// Outbound side of a chat platform
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Gateway name, for logs
    fn name(&self) -> &str;

    /// Post a message to a channel
    async fn post_message(&self, channel: &str, text: &str) -> GatewayResult<()>;
}

/// Type-erased gateway for sharing between tasks
pub type DynGateway = Arc<dyn Gateway>;

/// Post a notice, logging instead of propagating failures.
///
/// Delivery is fire-and-forget from the poll core's point of view.
pub async fn deliver(gateway: &dyn Gateway, notice: &Notice) -> bool {
    match gateway.post_message(&notice.channel, &notice.text).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                gateway = gateway.name(),
                channel = %notice.channel,
                error = %e,
                "failed to post message"
            );
            false
        }
    }
}
