//! Command Parser
//!
//! Classifies raw chat text into poll commands. Parsing is total: anything
//! that is not a recognised command comes back as `Command::Ignore`.

/// Prefix that starts a poll
pub const POLL_PREFIX: &str = "!poll";
/// Prefix that casts a vote
pub const VOTE_PREFIX: &str = "!vote";
/// Exact text that ends the current poll
pub const END_POLL: &str = "!endpoll";

/// Arguments of a poll creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePollRequest {
    /// Trimmed question
    pub question: String,
    /// Trimmed option labels, in the order given
    pub options: Vec<String>,
    /// Requested duration in seconds
    pub duration_seconds: u64,
}

/// A classified inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreatePoll(CreatePollRequest),
    /// Raw option text; the engine decides whether it names a valid option
    Vote(String),
    EndPoll,
    /// A `!poll` message that could not be parsed
    Malformed(String),
    Ignore,
}

impl Command {
    /// Name used in log fields
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreatePoll(_) => "create_poll",
            Command::Vote(_) => "vote",
            Command::EndPoll => "end_poll",
            Command::Malformed(_) => "malformed",
            Command::Ignore => "ignore",
        }
    }
}

/// Parse a chat message into a command.
///
/// Prefixes are matched without requiring a following space, so
/// `!pollLunch?,Pizza,Sushi,60` is a valid poll.
pub fn parse_command(text: &str) -> Command {
    if let Some(rest) = text.strip_prefix(POLL_PREFIX) {
        return match parse_create(rest) {
            Ok(request) => Command::CreatePoll(request),
            Err(reason) => Command::Malformed(reason),
        };
    }

    if let Some(rest) = text.strip_prefix(VOTE_PREFIX) {
        return Command::Vote(rest.trim().to_string());
    }

    if text.trim() == END_POLL {
        return Command::EndPoll;
    }

    Command::Ignore
}

fn parse_create(rest: &str) -> Result<CreatePollRequest, String> {
    let segments: Vec<&str> = rest.trim().split(',').collect();
    if segments.len() < 3 {
        return Err("expected a question, at least two options and a duration".to_string());
    }

    let last = segments.len() - 1;
    let duration_seconds = parse_unsigned(segments[last].trim())
        .ok_or_else(|| format!("duration '{}' is not a whole number of seconds", segments[last].trim()))?;

    Ok(CreatePollRequest {
        question: segments[0].trim().to_string(),
        options: segments[1..last]
            .iter()
            .map(|s| s.trim().to_string())
            .collect(),
        duration_seconds,
    })
}

/// Parse an unsigned base-10 literal made of ASCII digits only.
///
/// Signs, whitespace and empty strings are rejected, as are values that do not
/// fit in a `u64`.
pub fn parse_unsigned(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
