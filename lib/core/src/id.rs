//! Identifier for a single orchestration run.
//!
//! Runs are short-lived and never persisted, so the id exists only to tie
//! together the log lines a run produces. ULIDs keep them sortable by start
//! time when reading logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

const PREFIX: &str = "chat";

/// Error returned when parsing a run id from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The input that failed to parse.
    pub input: String,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse run id '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Unique identifier for one chat run, displayed as `chat_<ulid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatRunId(Ulid);

impl ChatRunId {
    /// Creates a new id with a freshly generated ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for ChatRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChatRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}_{}", self.0)
    }
}

impl FromStr for ChatRunId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(s);

        Ulid::from_str(raw).map(Self).map_err(|e| ParseIdError {
            input: s.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_chat_prefix() {
        let id = ChatRunId::new();
        assert!(id.to_string().starts_with("chat_"));
    }

    #[test]
    fn parses_prefixed_and_raw_forms() {
        let id = ChatRunId::new();
        let prefixed: ChatRunId = id.to_string().parse().expect("prefixed");
        let raw: ChatRunId = id.as_ulid().to_string().parse().expect("raw");
        assert_eq!(prefixed, id);
        assert_eq!(raw, id);
    }

    #[test]
    fn rejects_garbage() {
        let err = "chat_not-a-ulid".parse::<ChatRunId>().unwrap_err();
        assert_eq!(err.input, "chat_not-a-ulid");
    }

    #[test]
    fn serializes_as_bare_ulid() {
        let id = ChatRunId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
    }
}
