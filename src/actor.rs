//! Session actor: one task per session draining a command queue, so every
//! mutation of a session runs to completion before the next one starts.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::gateway::{Gateway, deliver};
use crate::protocol::StateSnapshot;
use crate::session::{Departure, Phase, PhaseTimer, RoundEndReason, Session};
use crate::timer::TimerScheduler;
use crate::{ConnectionId, GameError, Pin};

/// Message processed by a session task.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Join {
        conn: ConnectionId,
        name: Option<String>,
        reply: oneshot::Sender<()>,
    },
    Start {
        reply: oneshot::Sender<()>,
    },
    Answer {
        conn: ConnectionId,
        category: String,
        value: String,
        reply: oneshot::Sender<Option<bool>>,
    },
    Restart {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<Departure>,
    },
    Snapshot {
        reply: oneshot::Sender<StateSnapshot>,
    },
    /// A prep or post window elapsed.
    WindowElapsed { epoch: u64, phase: Phase },
    /// The round opened at `epoch` should end.
    EndRound { epoch: u64, reason: RoundEndReason },
}

/// Cloneable address of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pin: Pin,
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// PIN of the session.
    pub fn pin(&self) -> &Pin {
        &self.pin
    }

    /// Whether the session task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, GameError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| GameError::SessionClosed)?;
        response.await.map_err(|_| GameError::SessionClosed)
    }

    /// Adds a player.
    pub async fn join(&self, conn: ConnectionId, name: Option<String>) -> Result<(), GameError> {
        self.request(|reply| SessionCommand::Join { conn, name, reply })
            .await
    }

    /// Starts the game if it is still in the lobby.
    pub async fn start(&self) -> Result<(), GameError> {
        self.request(|reply| SessionCommand::Start { reply }).await
    }

    /// Submits an answer. `Ok(None)` means the answer was ignored.
    pub async fn submit_answer(
        &self,
        conn: ConnectionId,
        category: String,
        value: String,
    ) -> Result<Option<bool>, GameError> {
        self.request(|reply| SessionCommand::Answer {
            conn,
            category,
            value,
            reply,
        })
        .await
    }

    /// Restarts the game on behalf of `conn`.
    pub async fn restart(&self, conn: ConnectionId) -> Result<(), GameError> {
        self.request(|reply| SessionCommand::Restart { conn, reply })
            .await?
    }

    /// Removes `conn` from the session.
    pub async fn leave(&self, conn: ConnectionId) -> Result<Departure, GameError> {
        self.request(|reply| SessionCommand::Leave { conn, reply })
            .await
    }

    /// Current public state.
    pub async fn snapshot(&self) -> Result<StateSnapshot, GameError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }
}

/// Starts the task owning `session` and returns its handle.
pub(crate) fn spawn_session(
    session: Session,
    gateway: Arc<dyn Gateway>,
    buffer: usize,
) -> SessionHandle {
    let pin = session.pin().clone();
    let (commands, inbox) = mpsc::channel(buffer);
    let timers = TimerScheduler::new(pin.clone(), commands.downgrade());
    let actor = SessionActor {
        session,
        gateway,
        timers,
    };
    let span = info_span!("session", pin = %pin);
    tokio::spawn(actor.run(inbox).instrument(span));
    SessionHandle { pin, commands }
}

/// Whether the task keeps running after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct SessionActor {
    session: Session,
    gateway: Arc<dyn Gateway>,
    timers: TimerScheduler,
}

impl SessionActor {
    async fn run(mut self, mut inbox: mpsc::Receiver<SessionCommand>) {
        self.flush();
        while let Some(command) = inbox.recv().await {
            if self.handle(command) == Flow::Stop {
                break;
            }
        }
        info!("Session task stopped");
    }

    fn handle(&mut self, command: SessionCommand) -> Flow {
        match command {
            SessionCommand::Join { conn, name, reply } => {
                self.session.add_player(conn, name);
                self.flush();
                let _ = reply.send(());
            }
            SessionCommand::Start { reply } => {
                let timer = self.session.start(now_ms());
                self.arm(timer);
                let _ = reply.send(());
            }
            SessionCommand::Answer {
                conn,
                category,
                value,
                reply,
            } => {
                let outcome = self.session.submit_answer(conn, &category, &value);
                if outcome.is_some_and(|o| o.finished) {
                    let epoch = self.session.epoch();
                    self.end_round(epoch, RoundEndReason::FirstFinisher);
                } else {
                    self.flush();
                }
                let _ = reply.send(outcome.map(|o| o.valid));
            }
            SessionCommand::Restart { conn, reply } => {
                let result = self.session.restart(conn, now_ms());
                let response = result.map(|timer| self.arm(Some(timer)));
                let _ = reply.send(response);
            }
            SessionCommand::Leave { conn, reply } => {
                let departure = self.session.remove_player(conn);
                self.flush();
                let ended = matches!(departure, Departure::SessionEnded { .. });
                let _ = reply.send(departure);
                if ended {
                    return Flow::Stop;
                }
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot());
            }
            SessionCommand::WindowElapsed { epoch, phase } => {
                match self.session.window_elapsed(epoch, phase, now_ms()) {
                    Ok(timer) => self.arm(timer),
                    Err(e) => debug!(error = %e, "Ignoring stale window timer"),
                }
            }
            SessionCommand::EndRound { epoch, reason } => self.end_round(epoch, reason),
        }
        Flow::Continue
    }

    /// Single entry point for ending a round, whatever triggered it.
    fn end_round(&mut self, epoch: u64, reason: RoundEndReason) {
        match self.session.end_round(epoch, reason, now_ms()) {
            Ok(timer) => self.arm(Some(timer)),
            Err(GameError::StaleTimer { scheduled, current }) => {
                debug!(scheduled, current, %reason, "Round already ended");
                self.flush();
            }
            Err(e) => {
                warn!(error = %e, %reason, "Unexpected error ending round");
                self.flush();
            }
        }
    }

    /// Delivers queued messages, then schedules `timer` if any.
    fn arm(&mut self, timer: Option<PhaseTimer>) {
        self.flush();
        if let Some(timer) = timer {
            self.timers.schedule(timer);
        }
    }

    fn flush(&mut self) {
        let messages = self.session.drain_outbox();
        if !messages.is_empty() {
            deliver(self.gateway.as_ref(), self.session.pin(), messages);
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
