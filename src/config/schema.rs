//! JSON Schema Generation
//!
//! Generates a JSON Schema describing the pollbot configuration file.
//! Based on draft-07 of the JSON Schema specification.

use serde_json::json;
use serde_json::Value;

/// Generate the complete JSON schema for pollbot configuration
pub fn generate_config_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Pollbot Configuration",
        "description": "Configuration schema for the pollbot channel poll engine",
        "type": "object",
        "properties": {
            "maxVotesPerParticipant": {
                "type": "integer",
                "minimum": 1,
                "default": 2,
                "description": "Votes each participant may cast"
            },
            "sweepIntervalSeconds": {
                "type": "integer",
                "minimum": 1,
                "maximum": crate::polls::MAX_SWEEP_INTERVAL.as_secs(),
                "default": 10,
                "description": "Seconds between expiration sweeps"
            },
            "voteScope": {
                "type": "string",
                "enum": ["poll", "process"],
                "default": "poll",
                "description": "Reset vote allowances with every poll, or keep one allowance per user for the process lifetime"
            },
            "replaceActivePoll": {
                "type": "boolean",
                "default": false,
                "description": "Replace a running poll on !poll instead of rejecting the request"
            },
            "logging": generate_logging_schema(),
        },
        "additionalProperties": false
    })
}

fn generate_logging_schema() -> Value {
    json!({
        "type": "object",
        "description": "Logging configuration",
        "properties": {
            "level": {
                "type": "string",
                "default": "info",
                "description": "Default tracing filter directive (RUST_LOG takes precedence)"
            },
            "format": {
                "type": "string",
                "enum": ["text", "json"],
                "default": "text"
            }
        },
        "additionalProperties": false
    })
}
