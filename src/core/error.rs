//! Error types for hub and work operations.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a work failure.
///
/// Retry resolvers match on the category rather than on the concrete error,
/// so a host can declare which classes of failure are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transient network failure (connection refused/reset, DNS, ...).
    Network,
    /// An operation did not finish in time.
    Timeout,
    /// Any other I/O failure.
    Io,
    /// The work was aborted before it could conclude.
    Aborted,
    /// The work body panicked.
    Panicked,
    /// Anything the host did not classify.
    Other,
}

impl ErrorKind {
    /// Parse a category from its `snake_case` name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "network" => Some(Self::Network),
            "timeout" => Some(Self::Timeout),
            "io" => Some(Self::Io),
            "aborted" => Some(Self::Aborted),
            "panicked" => Some(Self::Panicked),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Failure captured on a work instance.
///
/// Work errors never cross the hub boundary: they are recorded on the work
/// and surfaced through `AsyncWork::error` or the completion callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkError {
    /// Transient network failure.
    #[error("network error: {0}")]
    Network(String),
    /// The work timed out.
    #[error("timed out: {0}")]
    Timeout(String),
    /// Other I/O failure.
    #[error("io error: {0}")]
    Io(String),
    /// The work was aborted.
    #[error("work aborted")]
    Aborted,
    /// The work body panicked.
    #[error("work panicked: {0}")]
    Panicked(String),
    /// Unclassified failure.
    #[error("{0}")]
    Other(String),
}

impl WorkError {
    /// Category used for retry decisions.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Io(_) => ErrorKind::Io,
            Self::Aborted => ErrorKind::Aborted,
            Self::Panicked(_) => ErrorKind::Panicked,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

impl From<io::Error> for WorkError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout(err.to_string()),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::NetworkDown => Self::Network(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for WorkError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

/// Errors produced by hub components.
#[derive(Debug, Error)]
pub enum HubError {
    /// Configuration could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The cruiser thread could not be spawned.
    #[error("failed to start cruiser thread: {0}")]
    CruiserStart(#[source] io::Error),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
