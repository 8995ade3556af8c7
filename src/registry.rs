//! Session registry: PIN → running session, plus which sessions each
//! connection belongs to.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::actor::{SessionHandle, spawn_session};
use crate::config::{ServerConfig, Timings};
use crate::gateway::Gateway;
use crate::pin::allocate_pin;
use crate::protocol::{CreateGame, StateSnapshot};
use crate::session::{Departure, Session};
use crate::settings::{GameSettings, SettingsDefaults};
use crate::words::WordSetProvider;
use crate::{ConnectionId, GameError, Pin};

/// Registry tuning taken from [`ServerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Prep and post windows.
    pub timings: Timings,
    /// Fallbacks for unusable host input.
    pub defaults: SettingsDefaults,
    /// Random PIN draws before scanning.
    pub pin_attempts: u32,
    /// Per-session command queue capacity.
    pub command_buffer: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for RegistryOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            timings: config.timings(),
            defaults: SettingsDefaults {
                total_rounds: *config.default_total_rounds(),
                round_seconds: *config.default_round_seconds(),
            },
            pin_attempts: *config.pin_attempts(),
            command_buffer: *config.command_buffer(),
        }
    }
}

#[derive(Debug, Default)]
struct Entries {
    sessions: HashMap<Pin, SessionHandle>,
    memberships: HashMap<ConnectionId, BTreeSet<Pin>>,
}

impl Entries {
    fn add_membership(&mut self, conn: ConnectionId, pin: &Pin) {
        self.memberships.entry(conn).or_default().insert(pin.clone());
    }

    fn drop_membership(&mut self, conn: ConnectionId, pin: &Pin) {
        if let Some(pins) = self.memberships.get_mut(&conn) {
            pins.remove(pin);
            if pins.is_empty() {
                self.memberships.remove(&conn);
            }
        }
    }
}

/// Owns every active session of the process.
///
/// Constructed once at startup and shared behind an `Arc`; the lock is never
/// held while waiting on a session.
pub struct SessionRegistry {
    entries: RwLock<Entries>,
    gateway: Arc<dyn Gateway>,
    words: Arc<dyn WordSetProvider>,
    options: RegistryOptions,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[instrument(skip(gateway, words))]
    pub fn new(
        options: RegistryOptions,
        words: Arc<dyn WordSetProvider>,
        gateway: Arc<dyn Gateway>,
    ) -> Self {
        info!("Creating session registry");
        Self {
            entries: RwLock::new(Entries::default()),
            gateway,
            words,
            options,
        }
    }

    /// Categories hosts may choose from.
    pub fn known_categories(&self) -> Vec<String> {
        self.words.categories()
    }

    /// Opens a session from raw host input, coercing anything unusable.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PinSpaceExhausted`] if no PIN is free.
    #[instrument(skip(self, request))]
    pub async fn create_session(
        &self,
        host: ConnectionId,
        request: CreateGame,
    ) -> Result<Pin, GameError> {
        let known = self.known_categories();
        let settings = GameSettings::coerce(
            request.host_name,
            request.total_rounds.as_ref(),
            request.round_seconds.as_ref(),
            request.categories.as_ref(),
            &known,
            self.options.defaults,
        );
        self.create_with_settings(host, settings).await
    }

    /// Opens a session with already-validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PinSpaceExhausted`] if no PIN is free.
    #[instrument(skip(self, settings))]
    pub async fn create_with_settings(
        &self,
        host: ConnectionId,
        settings: GameSettings,
    ) -> Result<Pin, GameError> {
        let mut entries = self.entries.write().await;
        let pin = {
            let mut rng = rand::rng();
            allocate_pin(&mut rng, self.options.pin_attempts, |pin| {
                entries.sessions.contains_key(pin)
            })?
        };

        let session = Session::new(
            pin.clone(),
            host,
            settings,
            self.options.timings,
            self.words.clone(),
            StdRng::from_os_rng(),
        );
        let handle = spawn_session(session, self.gateway.clone(), self.options.command_buffer);
        entries.sessions.insert(pin.clone(), handle);
        entries.add_membership(host, &pin);

        info!(pin = %pin, host = %host, active = entries.sessions.len(), "Session created");
        Ok(pin)
    }

    /// Looks up a running session.
    pub async fn get(&self, pin: &Pin) -> Option<SessionHandle> {
        self.entries.read().await.sessions.get(pin).cloned()
    }

    async fn resolve(&self, pin: &str) -> Result<SessionHandle, GameError> {
        let Ok(pin) = Pin::parse(pin) else {
            debug!(pin, "Malformed PIN");
            return Err(GameError::SessionNotFound);
        };
        self.get(&pin).await.ok_or_else(|| {
            debug!(pin = %pin, "No session for PIN");
            GameError::SessionNotFound
        })
    }

    /// Adds `conn` as a player of the session at `pin`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionNotFound`] if no session has that PIN.
    #[instrument(skip(self))]
    pub async fn join_session(
        &self,
        pin: &str,
        conn: ConnectionId,
        name: Option<String>,
    ) -> Result<Pin, GameError> {
        let handle = self.resolve(pin).await?;
        handle.join(conn, name).await?;
        let pin = handle.pin().clone();
        self.entries.write().await.add_membership(conn, &pin);
        Ok(pin)
    }

    /// Starts the game at `pin`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionNotFound`] if no session has that PIN.
    #[instrument(skip(self))]
    pub async fn start_game(&self, pin: &str) -> Result<(), GameError> {
        self.resolve(pin).await?.start().await
    }

    /// Forwards an answer. `Ok(None)` means it was ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionNotFound`] if no session has that PIN.
    #[instrument(skip(self, value))]
    pub async fn submit_answer(
        &self,
        pin: &str,
        conn: ConnectionId,
        category: String,
        value: String,
    ) -> Result<Option<bool>, GameError> {
        self.resolve(pin)
            .await?
            .submit_answer(conn, category, value)
            .await
    }

    /// Restarts the game at `pin` on behalf of `conn`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionNotFound`] or [`GameError::Unauthorized`].
    #[instrument(skip(self))]
    pub async fn restart_game(&self, pin: &str, conn: ConnectionId) -> Result<(), GameError> {
        self.resolve(pin).await?.restart(conn).await
    }

    /// Removes `conn` from the session at `pin`, tearing the session down if
    /// `conn` is its host.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionNotFound`] if no session has that PIN.
    #[instrument(skip(self))]
    pub async fn remove_player(&self, pin: &Pin, conn: ConnectionId) -> Result<Departure, GameError> {
        let handle = self.get(pin).await.ok_or(GameError::SessionNotFound)?;
        let departure = handle.leave(conn).await?;

        let mut entries = self.entries.write().await;
        match &departure {
            Departure::SessionEnded { members } => {
                entries.sessions.remove(pin);
                for member in members {
                    entries.drop_membership(*member, pin);
                }
                info!(pin = %pin, active = entries.sessions.len(), "Session torn down");
            }
            Departure::Left | Departure::NotMember => entries.drop_membership(conn, pin),
        }
        Ok(departure)
    }

    /// Removes a closed connection from every session it was part of.
    #[instrument(skip(self))]
    pub async fn disconnect(&self, conn: ConnectionId) {
        let pins = self
            .entries
            .write()
            .await
            .memberships
            .remove(&conn)
            .unwrap_or_default();
        debug!(sessions = pins.len(), "Handling disconnect");

        for pin in pins {
            match self.remove_player(&pin, conn).await {
                Ok(departure) => debug!(pin = %pin, ?departure, "Removed connection"),
                Err(GameError::SessionClosed) => {
                    self.entries.write().await.sessions.remove(&pin);
                    debug!(pin = %pin, "Session already stopped");
                }
                Err(e) => debug!(pin = %pin, error = %e, "Nothing to remove"),
            }
        }
    }

    /// Current public state of the session at `pin`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SessionNotFound`] if no session has that PIN.
    pub async fn snapshot(&self, pin: &Pin) -> Result<StateSnapshot, GameError> {
        let handle = self.get(pin).await.ok_or(GameError::SessionNotFound)?;
        handle.snapshot().await
    }

    /// Number of active sessions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.sessions.len()
    }

    /// Returns `true` if no session is active.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.sessions.is_empty()
    }

    /// PINs of every active session.
    pub async fn pins(&self) -> Vec<Pin> {
        self.entries.read().await.sessions.keys().cloned().collect()
    }

    /// Drops every session. Session tasks stop once their queues drain.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.sessions.len();
        for pin in entries.sessions.keys() {
            self.gateway.close_room(pin);
        }
        entries.sessions.clear();
        entries.memberships.clear();
        if count > 0 {
            warn!(count, "Dropped active sessions on shutdown");
        }
    }
}
