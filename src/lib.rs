//! Letter Rush library - realtime multiplayer letter/category race
//!
//! Hosts open sessions identified by a six-digit PIN; players join, and every
//! round they race to fill each category with a word starting with the round's
//! letter.
//!
//! # Architecture
//!
//! - **Session**: pure phase state machine (prep → round → post → finished)
//! - **Actor**: one task per session serializing every mutation
//! - **Registry**: PIN → session, plus connection memberships
//! - **Gateway**: pub/sub boundary the engine pushes events through
//! - **Server**: axum WebSocket transport and admin routes
//!
//! # Example
//!
//! ```no_run
//! use letter_rush::{GameServer, ServerConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::load(None)?.with_port(8080);
//! GameServer::new(config)?.serve().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod actor;
mod admin;
mod config;
mod dataset;
mod error;
mod gateway;
mod handler;
mod letters;
mod pin;
mod protocol;
mod registry;
mod server;
mod session;
mod settings;
mod timer;
mod validator;
mod words;
mod ws;

// Crate-level exports - Errors and configuration
pub use config::{ConfigError, ServerConfig, Timings};
pub use error::GameError;

// Crate-level exports - Identifiers
pub use pin::{ConnectionId, PIN_LEN, PIN_MAX, PIN_MIN, Pin, PinError, allocate_pin};

// Crate-level exports - Word sets and validation
pub use dataset::{DatasetError, DatasetLoader, EXTRA_DIR};
pub use validator::validate;
pub use words::{ALL_TOPICS, SharedWordSets, WordSetProvider, WordSets, normalize};

// Crate-level exports - Session engine
pub use actor::SessionHandle;
pub use letters::{ALPHABET, LetterPool};
pub use session::{
    Answer, AnswerOutcome, Departure, HOST_LEFT_REASON, Outbound, POINTS_PER_ANSWER, Phase,
    PhaseTimer, Player, RoundEndReason, Session,
};
pub use settings::{GameSettings, MIN_ROUND_SECONDS, SettingsDefaults};

// Crate-level exports - Registry and dispatch
pub use gateway::{Gateway, deliver};
pub use handler::CommandHandler;
pub use registry::{RegistryOptions, SessionRegistry};

// Crate-level exports - Wire protocol
pub use protocol::{
    Ack, AnswerUpdate, ClientFrame, Command, CreateGame, JoinGame, LeaderboardEntry, PinOnly,
    PlayerView, ServerEvent, ServerFrame, StateSnapshot,
};

// Crate-level exports - Server
pub use admin::{HealthResponse, ReloadResponse};
pub use server::{AppState, GameServer, router};
pub use ws::{WsGateway, handle_text};
