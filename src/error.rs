//! Error types for the session engine.

use derive_more::{Display, Error};
use tracing::instrument;

/// Errors raised by session and registry operations.
///
/// Only the variants surfaced through acknowledgments ever reach a client;
/// [`GameError::StaleTimer`] and [`GameError::InvalidConfiguration`] are
/// handled inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    /// No active session is registered under the requested PIN.
    #[display("Game not found")]
    SessionNotFound,

    /// A non-host connection attempted a host-only operation.
    #[display("Only host can restart")]
    Unauthorized,

    /// Client supplied settings that could not be used as given.
    #[display("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong with the input.
        message: String,
    },

    /// A phase timer fired after the session had already moved on.
    #[display("Stale timer for epoch {scheduled} (current epoch {current})")]
    StaleTimer {
        /// Epoch captured when the timer was scheduled.
        scheduled: u64,
        /// Epoch of the session when the timer fired.
        current: u64,
    },

    /// Every PIN in the keyspace belongs to an active session.
    #[display("No free game PIN available")]
    PinSpaceExhausted,

    /// The session task has shut down and no longer accepts commands.
    #[display("Game session closed")]
    SessionClosed,
}

impl GameError {
    /// Creates an [`GameError::InvalidConfiguration`] from any message.
    #[instrument(skip(message))]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Reason string reported to clients in a failed acknowledgment.
    ///
    /// A closed session looks the same as a missing one from the outside.
    pub fn client_reason(&self) -> String {
        match self {
            Self::SessionClosed => Self::SessionNotFound.to_string(),
            other => other.to_string(),
        }
    }
}
