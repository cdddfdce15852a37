/// Error taxonomy for the viewer
///
/// Retrieval failures never escape the sequence that issued them; the
/// controller turns them into fallback slots or an error title.

use chrono::NaiveDate;
use thiserror::Error;

/// A single archive call failed
///
/// Carries only owned strings so it can travel inside UI messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    /// The archive answered with a non-success status
    #[error("archive request failed with HTTP {status}")]
    Status { status: u16, url: String },

    /// The request never produced a response
    #[error("archive request failed: {0}")]
    Transport(String),

    /// The payload could not be parsed as archive records
    #[error("unreadable archive response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RetrievalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RetrievalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// An expected date had no usable record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no archive record for {date}")]
pub struct MissingRecordError {
    pub date: NaiveDate,
}

/// The archive credential could not be obtained
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("an API key is required to browse the archive")]
    Missing,

    #[error("settings database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("could not determine a user data directory")]
    DataDir,

    #[error("could not create settings directory: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackError {
    #[error("no placeholder images registered")]
    EmptyPool,
}
