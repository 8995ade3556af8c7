//! Session entity and its phase state machine.
//!
//! A [`Session`] is plain data plus transitions. It never touches a clock,
//! a timer or a socket itself: callers pass the current time in, collect the
//! [`Outbound`] messages it queued, and schedule the [`PhaseTimer`] each
//! transition returns. The actor in `actor.rs` does exactly that.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use derive_getters::Getters;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, info, instrument, warn};

use crate::config::Timings;
use crate::letters::LetterPool;
use crate::protocol::{LeaderboardEntry, PlayerView, ServerEvent, StateSnapshot};
use crate::settings::{GameSettings, display_name};
use crate::validator::validate;
use crate::words::WordSetProvider;
use crate::{ConnectionId, GameError, Pin};

/// Points awarded per valid category at round end.
pub const POINTS_PER_ANSWER: u32 = 10;

/// Reason sent to everyone left in a session when its host goes away.
pub const HOST_LEFT_REASON: &str = "Host disconnected";

/// Phase of the round cycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// Letter shown, countdown before answers open.
    Prep,
    /// Answers accepted.
    Round,
    /// Leaderboard and next letter shown.
    Post,
    /// All rounds played.
    Finished,
}

/// What ended a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RoundEndReason {
    /// The round deadline elapsed.
    Deadline,
    /// A player answered every category validly.
    FirstFinisher,
}

/// A player's latest input for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Raw text as submitted.
    pub value: String,
    /// Validation result at submission time.
    pub valid: bool,
}

/// A participant, alive exactly as long as its connection.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Player {
    id: ConnectionId,
    name: String,
    score: u32,
    completed: bool,
    answers: HashMap<String, Answer>,
}

impl Player {
    fn new(id: ConnectionId, name: String) -> Self {
        Self {
            id,
            name,
            score: 0,
            completed: false,
            answers: HashMap::new(),
        }
    }

    fn clear_round(&mut self) {
        self.completed = false;
        self.answers.clear();
    }

    fn valid_count(&self, categories: &[String]) -> u32 {
        categories
            .iter()
            .filter(|c| self.answers.get(*c).is_some_and(|a| a.valid))
            .count() as u32
    }

    fn view(&self) -> PlayerView {
        PlayerView {
            name: self.name.clone(),
            completed: self.completed,
            score: self.score,
        }
    }
}

/// Message queued by a transition for delivery through the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Add a connection to the session's room.
    Subscribe(ConnectionId),
    /// Remove a connection from the session's room.
    Unsubscribe(ConnectionId),
    /// Send to every connection in the room.
    Broadcast(ServerEvent),
    /// Send to one connection only.
    SendTo(ConnectionId, ServerEvent),
    /// Empty the room; the session is gone.
    CloseRoom,
}

/// Request to fire a phase callback after `after`.
///
/// The callback is only honored while the session is still in `phase` at
/// `epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimer {
    /// Epoch of the phase entry that scheduled this timer.
    pub epoch: u64,
    /// Phase the timer ends.
    pub phase: Phase,
    /// Delay from scheduling to firing.
    pub after: Duration,
}

/// Result of accepting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Whether the submitted answer is valid.
    pub valid: bool,
    /// Whether the submitter now has every category valid.
    pub finished: bool,
}

/// Result of removing a connection from a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The connection was not a player here.
    NotMember,
    /// A regular player left.
    Left,
    /// The host left; the session is over. Lists everyone who was still in it.
    SessionEnded {
        /// Connections that were members when the session ended.
        members: Vec<ConnectionId>,
    },
}

/// One live game.
pub struct Session {
    pin: Pin,
    host: ConnectionId,
    players: Vec<Player>,
    categories: Vec<String>,
    round: u32,
    total_rounds: u32,
    round_seconds: u32,
    letter: Option<char>,
    next_letter: Option<char>,
    letters: LetterPool,
    phase: Phase,
    prep_ends_ts: Option<i64>,
    deadline_ts: Option<i64>,
    post_ends_ts: Option<i64>,
    started: bool,
    epoch: u64,
    timings: Timings,
    words: Arc<dyn WordSetProvider>,
    rng: StdRng,
    outbox: Vec<Outbound>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pin", &self.pin)
            .field("host", &self.host)
            .field("players", &self.players.len())
            .field("round", &self.round)
            .field("phase", &self.phase)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Opens a session in the lobby with the host as its first player.
    #[instrument(skip(pin, settings, timings, words, rng), fields(pin = %pin))]
    pub fn new(
        pin: Pin,
        host: ConnectionId,
        settings: GameSettings,
        timings: Timings,
        words: Arc<dyn WordSetProvider>,
        rng: StdRng,
    ) -> Self {
        info!(host = %host, "Creating session");
        let mut session = Self {
            pin,
            host,
            players: vec![Player::new(host, settings.host_name().clone())],
            categories: settings.categories().clone(),
            round: 1,
            total_rounds: *settings.total_rounds(),
            round_seconds: *settings.round_seconds(),
            letter: None,
            next_letter: None,
            letters: LetterPool::new(),
            phase: Phase::Prep,
            prep_ends_ts: None,
            deadline_ts: None,
            post_ends_ts: None,
            started: false,
            epoch: 0,
            timings,
            words,
            rng,
            outbox: Vec::new(),
        };
        session.outbox.push(Outbound::Subscribe(host));
        session.broadcast_state();
        session
    }

    /// Session PIN.
    pub fn pin(&self) -> &Pin {
        &self.pin
    }

    /// Connection that owns the session.
    pub fn host(&self) -> ConnectionId {
        self.host
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Counter bumped on every phase entry.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Current round, 1-indexed.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Whether the host has started the game.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Players in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Looks up a player by connection.
    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Letters drawn since creation or the last restart.
    pub fn used_letters(&self) -> &LetterPool {
        &self.letters
    }

    /// Takes every message queued since the last call.
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Adds a player. Duplicate names are allowed.
    #[instrument(skip(self), fields(pin = %self.pin))]
    pub fn add_player(&mut self, id: ConnectionId, name: Option<String>) {
        let name = display_name(name, "Player");
        if self.player(id).is_some() {
            debug!(player = %id, "Connection already in session, keeping existing player");
        } else {
            info!(player = %id, name = %name, "Player joined");
            self.players.push(Player::new(id, name));
        }
        self.outbox.push(Outbound::Subscribe(id));
        self.broadcast_state();
    }

    /// Removes a connection's player. Removing the host ends the session.
    #[instrument(skip(self), fields(pin = %self.pin))]
    pub fn remove_player(&mut self, id: ConnectionId) -> Departure {
        if id == self.host {
            info!(host = %id, "Host left, ending session");
            let members = self.players.iter().map(|p| p.id).collect();
            self.players.retain(|p| p.id != id);
            self.outbox.push(Outbound::Unsubscribe(id));
            self.outbox.push(Outbound::Broadcast(ServerEvent::GameOver {
                reason: HOST_LEFT_REASON.to_string(),
            }));
            self.outbox.push(Outbound::CloseRoom);
            return Departure::SessionEnded { members };
        }

        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() == before {
            debug!(player = %id, "Connection was not a player here");
            return Departure::NotMember;
        }

        info!(player = %id, remaining = self.players.len(), "Player left");
        self.outbox.push(Outbound::Unsubscribe(id));
        self.broadcast_state();
        Departure::Left
    }

    /// Leaves the lobby and opens the first prep window.
    ///
    /// Returns `None` if the game was already started; the call is then a
    /// no-op so an in-flight round is never interrupted.
    #[instrument(skip(self), fields(pin = %self.pin))]
    pub fn start(&mut self, now_ms: i64) -> Option<PhaseTimer> {
        if self.started {
            debug!(phase = %self.phase, "Game already started, ignoring start");
            return None;
        }
        self.started = true;
        info!("Game started");
        Some(self.enter_prep(now_ms))
    }

    /// Handles an elapsed prep or post window scheduled at `epoch`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::StaleTimer`] if the session has moved on since
    /// the timer was scheduled, or if `phase` is not a window this method
    /// ends.
    #[instrument(skip(self), fields(pin = %self.pin, current = self.epoch))]
    pub fn window_elapsed(
        &mut self,
        epoch: u64,
        phase: Phase,
        now_ms: i64,
    ) -> Result<Option<PhaseTimer>, GameError> {
        self.check_current(epoch, phase)?;
        match phase {
            Phase::Prep => Ok(Some(self.enter_round(now_ms))),
            Phase::Post => Ok(self.finish_post(now_ms)),
            Phase::Round | Phase::Finished => Err(GameError::StaleTimer {
                scheduled: epoch,
                current: self.epoch,
            }),
        }
    }

    /// Accepts an answer from `id` while a round is open.
    ///
    /// Returns `None` when the answer is ignored: no round is open or `id`
    /// is not a player. Answers for categories this session does not play
    /// are reported invalid and not kept.
    #[instrument(skip(self, value), fields(pin = %self.pin))]
    pub fn submit_answer(
        &mut self,
        id: ConnectionId,
        category: &str,
        value: &str,
    ) -> Option<AnswerOutcome> {
        if self.phase != Phase::Round {
            debug!(phase = %self.phase, "Ignoring answer outside a round");
            return None;
        }
        let letter = self.letter.map(String::from).unwrap_or_default();
        let plays_category = self.categories.iter().any(|c| c == category);
        let valid = plays_category && validate(self.words.as_ref(), category, &letter, value);

        let categories = &self.categories;
        let Some(player) = self.players.iter_mut().find(|p| p.id == id) else {
            debug!(player = %id, "Ignoring answer from unknown connection");
            return None;
        };

        if plays_category {
            player.answers.insert(
                category.to_string(),
                Answer {
                    value: value.to_string(),
                    valid,
                },
            );
        }
        let finished = player.valid_count(categories) as usize == categories.len();
        if finished {
            player.completed = true;
        }
        let name = player.name.clone();
        debug!(player = %id, category, valid, finished, "Answer validated");

        self.outbox.push(Outbound::SendTo(
            id,
            ServerEvent::AnswerValidated {
                category: category.to_string(),
                valid,
            },
        ));
        if finished {
            info!(player = %id, name = %name, "Player completed every category");
            self.outbox
                .push(Outbound::Broadcast(ServerEvent::PlayerCompleted { name }));
        }
        Some(AnswerOutcome { valid, finished })
    }

    /// Closes the round opened at `epoch`, scores everyone and opens the
    /// post window.
    ///
    /// Both the deadline timer and a first finisher end up here; whichever
    /// arrives second finds the epoch already advanced.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::StaleTimer`] if that round is no longer open.
    #[instrument(skip(self), fields(pin = %self.pin, current = self.epoch))]
    pub fn end_round(
        &mut self,
        epoch: u64,
        reason: RoundEndReason,
        now_ms: i64,
    ) -> Result<PhaseTimer, GameError> {
        self.check_current(epoch, Phase::Round)?;

        for player in &mut self.players {
            let gained = POINTS_PER_ANSWER * player.valid_count(&self.categories);
            player.score += gained;
            player.completed = true;
            debug!(player = %player.id, gained, score = player.score, "Scored round");
        }

        let next_letter = self.letters.draw(&mut self.rng);
        self.next_letter = Some(next_letter);
        let timer = self.enter_phase(Phase::Post, self.timings.post, now_ms);
        info!(round = self.round, %reason, next_letter = %next_letter, "Round over");

        let post_ends_ts = self.post_ends_ts.unwrap_or(now_ms);
        self.outbox.push(Outbound::Broadcast(ServerEvent::RoundOver {
            leaderboard: self.leaderboard(),
            next_letter,
            post_ends_ts,
        }));
        self.broadcast_state();
        Ok(timer)
    }

    /// Resets scores and letters and opens a fresh prep window. Host only.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unauthorized`] if `by` is not the host.
    #[instrument(skip(self), fields(pin = %self.pin))]
    pub fn restart(&mut self, by: ConnectionId, now_ms: i64) -> Result<PhaseTimer, GameError> {
        if by != self.host {
            warn!(by = %by, "Non-host attempted restart");
            return Err(GameError::Unauthorized);
        }
        for player in &mut self.players {
            player.score = 0;
            player.clear_round();
        }
        self.letters.reset();
        self.round = 1;
        self.started = true;
        self.letter = None;
        self.next_letter = None;
        info!(from = %self.phase, "Restarting game");
        Ok(self.enter_prep(now_ms))
    }

    /// Players sorted by score, highest first; ties keep join order.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut board: Vec<LeaderboardEntry> = self
            .players
            .iter()
            .map(|p| LeaderboardEntry {
                name: p.name.clone(),
                score: p.score,
            })
            .collect();
        board.sort_by(|a, b| b.score.cmp(&a.score));
        board
    }

    /// Public state as broadcast in the `state` event.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            pin: self.pin.clone(),
            round: self.round,
            total_rounds: self.total_rounds,
            letter: self.letter,
            next_letter: self.next_letter,
            categories: self.categories.clone(),
            started: self.started,
            phase: self.phase,
            prep_ends_ts: self.prep_ends_ts,
            deadline_ts: self.deadline_ts,
            post_ends_ts: self.post_ends_ts,
            round_seconds: self.round_seconds,
            players: self.players.iter().map(Player::view).collect(),
        }
    }

    fn enter_prep(&mut self, now_ms: i64) -> PhaseTimer {
        let letter = match self.next_letter.take() {
            Some(letter) => letter,
            None => self.letters.draw(&mut self.rng),
        };
        self.letter = Some(letter);
        for player in &mut self.players {
            player.clear_round();
        }
        let timer = self.enter_phase(Phase::Prep, self.timings.prep, now_ms);
        info!(round = self.round, letter = %letter, "Preparing round");

        self.broadcast_state();
        self.outbox.push(Outbound::Broadcast(ServerEvent::RoundPreparing {
            letter,
            prep_ends_ts: self.prep_ends_ts.unwrap_or(now_ms),
        }));
        timer
    }

    fn enter_round(&mut self, now_ms: i64) -> PhaseTimer {
        for player in &mut self.players {
            player.clear_round();
        }
        let length = Duration::from_secs(u64::from(self.round_seconds));
        let timer = self.enter_phase(Phase::Round, length, now_ms);
        let letter = self.letter.unwrap_or('A');
        info!(round = self.round, letter = %letter, "Round open");

        self.outbox.push(Outbound::Broadcast(ServerEvent::RoundStarted {
            letter,
            deadline_ts: self.deadline_ts.unwrap_or(now_ms),
        }));
        self.broadcast_state();
        timer
    }

    fn finish_post(&mut self, now_ms: i64) -> Option<PhaseTimer> {
        if self.round >= self.total_rounds {
            self.epoch += 1;
            self.phase = Phase::Finished;
            self.prep_ends_ts = None;
            self.deadline_ts = None;
            self.post_ends_ts = None;
            info!(rounds = self.total_rounds, "Game finished");
            self.outbox.push(Outbound::Broadcast(ServerEvent::GameFinished {
                leaderboard: self.leaderboard(),
            }));
            self.broadcast_state();
            return None;
        }
        self.round += 1;
        Some(self.enter_prep(now_ms))
    }

    /// Moves to `phase` with a countdown of `length`, clearing the other
    /// countdowns and bumping the epoch.
    fn enter_phase(&mut self, phase: Phase, length: Duration, now_ms: i64) -> PhaseTimer {
        self.epoch += 1;
        self.phase = phase;
        let ends = now_ms + i64::try_from(length.as_millis()).unwrap_or(i64::MAX - now_ms);
        self.prep_ends_ts = (phase == Phase::Prep).then_some(ends);
        self.deadline_ts = (phase == Phase::Round).then_some(ends);
        self.post_ends_ts = (phase == Phase::Post).then_some(ends);
        debug!(epoch = self.epoch, phase = %phase, ends, "Entered phase");
        PhaseTimer {
            epoch: self.epoch,
            phase,
            after: length,
        }
    }

    fn check_current(&self, epoch: u64, phase: Phase) -> Result<(), GameError> {
        if epoch != self.epoch || phase != self.phase {
            debug!(
                scheduled = epoch,
                current = self.epoch,
                expected = %phase,
                actual = %self.phase,
                "Stale phase callback"
            );
            return Err(GameError::StaleTimer {
                scheduled: epoch,
                current: self.epoch,
            });
        }
        Ok(())
    }

    fn broadcast_state(&mut self) {
        let snapshot = self.snapshot();
        self.outbox.push(Outbound::Broadcast(ServerEvent::State(snapshot)));
    }
}
