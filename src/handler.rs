//! Maps client commands onto registry calls and shapes their
//! acknowledgments.

use std::sync::Arc;

use derive_new::new;
use tracing::{debug, info, instrument, warn};

use crate::protocol::{Ack, AnswerUpdate, Command, JoinGame, PinOnly};
use crate::registry::SessionRegistry;
use crate::{ConnectionId, GameError};

/// Transport-independent command dispatcher.
#[derive(Debug, Clone, new)]
pub struct CommandHandler {
    registry: Arc<SessionRegistry>,
}

impl CommandHandler {
    /// The registry commands are applied to.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Applies `command` for `conn`.
    ///
    /// Returns the acknowledgment to send back, or `None` when the command
    /// is silently ignored (an answer outside a round).
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub async fn dispatch(&self, conn: ConnectionId, command: Command) -> Option<Ack> {
        match command {
            Command::CreateGame(request) => {
                Some(match self.registry.create_session(conn, request).await {
                    Ok(pin) => Ack::with_pin(pin),
                    Err(e) => {
                        warn!(error = %e, "Could not create game");
                        Ack::rejected(e.client_reason())
                    }
                })
            }
            Command::JoinGame(JoinGame { pin, name }) => {
                Some(match self.registry.join_session(&pin, conn, name).await {
                    Ok(pin) => Ack::with_pin(pin),
                    Err(e) => {
                        debug!(error = %e, "Join rejected");
                        Ack::rejected(GameError::SessionNotFound.to_string())
                    }
                })
            }
            Command::StartGame(PinOnly { pin }) => {
                Some(match self.registry.start_game(&pin).await {
                    Ok(()) => Ack::ok(),
                    Err(e) => {
                        debug!(error = %e, "Start rejected");
                        Ack::failed()
                    }
                })
            }
            Command::AnswerUpdate(AnswerUpdate {
                pin,
                category,
                value,
            }) => match self
                .registry
                .submit_answer(&pin, conn, category, value)
                .await
            {
                Ok(Some(valid)) => Some(Ack::with_valid(valid)),
                Ok(None) => None,
                Err(e) => {
                    debug!(error = %e, "Answer for unknown game ignored");
                    None
                }
            },
            Command::RestartGame(PinOnly { pin }) => {
                Some(match self.registry.restart_game(&pin, conn).await {
                    Ok(()) => Ack::ok(),
                    Err(e) => {
                        debug!(error = %e, "Restart rejected");
                        Ack::rejected(e.client_reason())
                    }
                })
            }
        }
    }

    /// Cleans up after a closed connection.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, conn: ConnectionId) {
        info!("Connection closed");
        self.registry.disconnect(conn).await;
    }
}
