//! Wire types exchanged with clients: inbound commands, acknowledgments and
//! outbound events.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{Phase, Pin};

/// Command sent by a client, tagged by name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum Command {
    /// Host opens a new session.
    CreateGame(CreateGame),
    /// Player joins an existing session.
    JoinGame(JoinGame),
    /// Host leaves the lobby and starts the first round.
    StartGame(PinOnly),
    /// Player edits one category field.
    AnswerUpdate(AnswerUpdate),
    /// Host resets scores and starts over.
    RestartGame(PinOnly),
}

impl Command {
    /// Wire name of the command, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateGame(_) => "create_game",
            Self::JoinGame(_) => "join_game",
            Self::StartGame(_) => "start_game",
            Self::AnswerUpdate(_) => "answer_update",
            Self::RestartGame(_) => "restart_game",
        }
    }
}

/// `create_game` payload. Every field is optional and coerced leniently.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateGame {
    /// Host display name.
    pub host_name: Option<String>,
    /// Requested round count, as sent.
    pub total_rounds: Option<Value>,
    /// Requested round length in seconds, as sent.
    pub round_seconds: Option<Value>,
    /// Requested categories, as sent.
    pub categories: Option<Value>,
}

/// `join_game` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinGame {
    /// PIN of the session to join.
    #[serde(deserialize_with = "lenient_string")]
    pub pin: String,
    /// Player display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Payload carrying only a PIN.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PinOnly {
    /// Target session.
    #[serde(deserialize_with = "lenient_string")]
    pub pin: String,
}

/// `answer_update` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnswerUpdate {
    /// Target session.
    #[serde(deserialize_with = "lenient_string")]
    pub pin: String,
    /// Category being answered.
    pub category: String,
    /// Current field content.
    #[serde(default)]
    pub value: String,
}

/// Accepts a JSON string or number and yields its text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Acknowledgment returned to the client that sent a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    /// Whether the command succeeded.
    pub ok: bool,
    /// PIN of the created or joined session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<Pin>,
    /// Validation result of an answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Ack {
    /// Bare success.
    pub fn ok() -> Self {
        Self {
            ok: true,
            pin: None,
            valid: None,
            reason: None,
        }
    }

    /// Success carrying a PIN.
    pub fn with_pin(pin: Pin) -> Self {
        Self {
            pin: Some(pin),
            ..Self::ok()
        }
    }

    /// Success carrying an answer's validity.
    pub fn with_valid(valid: bool) -> Self {
        Self {
            valid: Some(valid),
            ..Self::ok()
        }
    }

    /// Failure without a reason.
    pub fn failed() -> Self {
        Self {
            ok: false,
            ..Self::ok()
        }
    }

    /// Failure with a reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::failed()
        }
    }
}

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Player display name.
    pub name: String,
    /// Accumulated score.
    pub score: u32,
}

/// Public view of a player inside a state snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Player display name.
    pub name: String,
    /// Whether the player is done for this round.
    pub completed: bool,
    /// Accumulated score.
    pub score: u32,
}

/// Full session snapshot broadcast as the `state` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Session PIN.
    pub pin: Pin,
    /// Current round, 1-indexed.
    pub round: u32,
    /// Rounds per game.
    pub total_rounds: u32,
    /// Letter of the current round.
    pub letter: Option<char>,
    /// Letter pre-selected for the next round.
    pub next_letter: Option<char>,
    /// Categories played every round.
    pub categories: Vec<String>,
    /// Whether the host has started the game.
    pub started: bool,
    /// Current phase.
    pub phase: Phase,
    /// End of the prep window, epoch milliseconds.
    pub prep_ends_ts: Option<i64>,
    /// End of the round, epoch milliseconds.
    pub deadline_ts: Option<i64>,
    /// End of the post window, epoch milliseconds.
    pub post_ends_ts: Option<i64>,
    /// Round length in seconds.
    pub round_seconds: u32,
    /// Players in join order.
    pub players: Vec<PlayerView>,
}

impl StateSnapshot {
    /// Countdown timestamps that are currently set.
    pub fn active_countdowns(&self) -> usize {
        [self.prep_ends_ts, self.deadline_ts, self.post_ends_ts]
            .iter()
            .filter(|ts| ts.is_some())
            .count()
    }
}

/// Event pushed from a session to its connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full state snapshot.
    State(StateSnapshot),
    /// A prep window opened for `letter`.
    #[serde(rename_all = "camelCase")]
    RoundPreparing { letter: char, prep_ends_ts: i64 },
    /// The round opened; answers are accepted until `deadline_ts`.
    #[serde(rename_all = "camelCase")]
    RoundStarted { letter: char, deadline_ts: i64 },
    /// The round closed and scores were added.
    #[serde(rename_all = "camelCase")]
    RoundOver {
        leaderboard: Vec<LeaderboardEntry>,
        next_letter: char,
        post_ends_ts: i64,
    },
    /// The final round's post window elapsed.
    GameFinished { leaderboard: Vec<LeaderboardEntry> },
    /// A player filled every category validly.
    PlayerCompleted { name: String },
    /// The session ended for everyone.
    GameOver { reason: String },
    /// Result of the sender's own answer. Never broadcast.
    AnswerValidated { category: String, valid: bool },
    /// The sender's frame could not be understood. Never broadcast.
    Error { reason: String },
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::State(_) => "state",
            Self::RoundPreparing { .. } => "round_preparing",
            Self::RoundStarted { .. } => "round_started",
            Self::RoundOver { .. } => "round_over",
            Self::GameFinished { .. } => "game_finished",
            Self::PlayerCompleted { .. } => "player_completed",
            Self::GameOver { .. } => "game_over",
            Self::AnswerValidated { .. } => "answer_validated",
            Self::Error { .. } => "error",
        }
    }
}

/// Frame received over the socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientFrame {
    /// Correlation id echoed in the acknowledgment.
    #[serde(default)]
    pub id: Option<u64>,
    /// The command itself.
    #[serde(flatten)]
    pub command: Command,
}

/// Frame sent over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ServerFrame {
    /// Reply to a command that carried an id.
    Ack {
        /// Id from the client frame.
        ack: u64,
        /// The acknowledgment body.
        data: Ack,
    },
    /// Session or connection event.
    Event(ServerEvent),
}
