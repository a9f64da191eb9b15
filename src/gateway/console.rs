//! Console gateway
//!
//! Reads inbound events as JSON lines (`{"user":"U1","channel":"C1","text":"!vote 1"}`)
//! and writes outbound messages as `[channel] text` blocks. Handy for local
//! runs and for piping a platform bridge into the bot.

use super::{Gateway, GatewayResult, InboundEvent};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Gateway that writes messages to any async writer (stdout by default)
pub struct ConsoleGateway<W> {
    writer: Mutex<W>,
}

impl ConsoleGateway<tokio::io::Stdout> {
    /// Gateway writing to the process's stdout
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> ConsoleGateway<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Take back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> Gateway for ConsoleGateway<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        "console"
    }

    async fn post_message(&self, channel: &str, text: &str) -> GatewayResult<()> {
        let mut writer = self.writer.lock().await;
        writer
            .write_all(format!("[{}] {}\n", channel, text).as_bytes())
            .await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Parse one JSON line into an event; blank or invalid lines yield `None`
pub fn parse_event_line(line: &str) -> Option<InboundEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<InboundEvent>(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "discarding malformed inbound event");
            None
        }
    }
}

/// Read JSON-line events until EOF or until the receiver goes away.
///
/// Returns the number of events forwarded.
pub async fn read_events<R>(reader: R, tx: mpsc::Sender<InboundEvent>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    while let Some(line) = lines.next_line().await? {
        let Some(event) = parse_event_line(&line) else {
            continue;
        };
        if tx.send(event).await.is_err() {
            debug!("event receiver closed, stopping console reader");
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}
