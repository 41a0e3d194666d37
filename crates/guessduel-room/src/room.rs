//! A single room: two seats, two guesses, one winner.
//!
//! [`Room`] is plain data plus the rules that mutate it. It knows nothing
//! about codes being unique, clocks, or connections; the registry and the
//! coordinator supply those.

use std::ops::RangeInclusive;
use std::time::Duration;

use guessduel_protocol::{GuessReport, PlayerId, RawGuess, RoomCode, ServerMessage};
use tokio::time::Instant;

use crate::{RoomError, RoomState};

/// Seats per room.
pub const MAX_PLAYERS: usize = 2;

/// Valid secrets and guesses.
pub const GUESS_RANGE: RangeInclusive<u8> = 1..=100;

/// A guess that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedGuess {
    pub player: PlayerId,
    pub value: u8,
    pub submitted_at: Instant,
}

/// What a successful [`Room::join`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The joiner already had a seat; nothing changed.
    Rejoined,
    /// The joiner took a seat and the room still needs a second player.
    Waiting,
    /// The joiner took the last seat; guessing can begin.
    Started,
}

/// What a successful [`Room::submit_guess`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    /// The guess is in; `count` guesses recorded so far.
    Recorded { count: usize },
    /// That was the second guess and the game is decided.
    Resolved(GameResult),
}

/// The decided outcome of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub secret_number: u8,
    /// One report per player, in join order.
    pub reports: Vec<GuessReport>,
    pub winner: PlayerId,
    pub is_tie: bool,
}

impl GameResult {
    /// Builds the `game_result` message broadcast to the room.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::GameResult {
            secret_number: self.secret_number,
            guesses: self.reports.clone(),
            winner: self.winner,
            is_tie: self.is_tie,
        }
    }
}

/// Checks a raw guess and returns it as a value in [`GUESS_RANGE`].
pub fn parse_guess(raw: &RawGuess) -> Result<u8, RoomError> {
    raw.as_integer()
        .and_then(|n| u8::try_from(n).ok())
        .filter(|n| GUESS_RANGE.contains(n))
        .ok_or(RoomError::InvalidGuessRange)
}

/// One game between two players.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    secret_number: u8,
    state: RoomState,
    /// Seat order; index 0 is the creator and wins exact ties.
    players: Vec<PlayerId>,
    /// Submission order.
    guesses: Vec<RecordedGuess>,
    created_at: Instant,
}

impl Room {
    /// Opens a room with `owner` in the first seat.
    pub fn new(code: RoomCode, owner: PlayerId, secret_number: u8, created_at: Instant) -> Self {
        debug_assert!(GUESS_RANGE.contains(&secret_number));
        Self {
            code,
            secret_number,
            state: RoomState::AwaitingPlayer2,
            players: vec![owner],
            guesses: Vec::with_capacity(MAX_PLAYERS),
            created_at,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn secret_number(&self) -> u8 {
        self.secret_number
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    /// Seated players in join order.
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    /// Accepted guesses in submission order.
    pub fn guesses(&self) -> &[RecordedGuess] {
        &self.guesses
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn is_member(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    /// The guess `player` locked in, if any.
    pub fn guess_of(&self, player: PlayerId) -> Option<u8> {
        self.guesses
            .iter()
            .find(|g| g.player == player)
            .map(|g| g.value)
    }

    /// Time since creation. Never negative, even against a skewed clock.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Returns `true` once the room is strictly older than `ttl`.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) > ttl
    }

    /// Seats `joiner`.
    ///
    /// A player who already has a seat gets [`JoinOutcome::Rejoined`] even
    /// when the room is full; a stranger gets [`RoomError::RoomFull`].
    pub fn join(&mut self, joiner: PlayerId) -> Result<JoinOutcome, RoomError> {
        if self.is_member(joiner) {
            return Ok(JoinOutcome::Rejoined);
        }
        if self.players.len() >= MAX_PLAYERS || !self.state.is_joinable() {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        self.players.push(joiner);
        if self.players.len() == MAX_PLAYERS {
            self.advance(RoomState::AwaitingGuesses);
            Ok(JoinOutcome::Started)
        } else {
            Ok(JoinOutcome::Waiting)
        }
    }

    /// Records `player`'s guess.
    ///
    /// Checks run in a fixed order (seat, range, duplicate) and all of them
    /// run before anything is written. A creator still waiting for an
    /// opponent counts as not a participant: there is no game to guess in.
    pub fn submit_guess(
        &mut self,
        player: PlayerId,
        raw: &RawGuess,
        now: Instant,
    ) -> Result<GuessOutcome, RoomError> {
        if !self.is_member(player) || self.state == RoomState::AwaitingPlayer2 {
            return Err(RoomError::NotAParticipant(player));
        }
        let value = parse_guess(raw)?;
        if self.guess_of(player).is_some() || !self.state.accepts_guesses() {
            return Err(RoomError::DuplicateSubmission(player));
        }

        self.guesses.push(RecordedGuess {
            player,
            value,
            submitted_at: now,
        });

        if self.guesses.len() < MAX_PLAYERS {
            return Ok(GuessOutcome::Recorded {
                count: self.guesses.len(),
            });
        }

        let result = self.compute_result();
        self.advance(RoomState::Resolved);
        Ok(GuessOutcome::Resolved(result))
    }

    /// Scores both seats. Only meaningful once every seat has guessed.
    ///
    /// The closer guess wins. On equal distance the first seat wins and the
    /// result is flagged as a tie (`<=`, not `<`).
    fn compute_result(&self) -> GameResult {
        let reports: Vec<GuessReport> = self
            .players
            .iter()
            .filter_map(|&player| {
                let guess = self.guess_of(player)?;
                Some(GuessReport {
                    player,
                    guess,
                    difference: guess.abs_diff(self.secret_number),
                })
            })
            .collect();

        let (winner, is_tie) = match reports.as_slice() {
            [first, second] => {
                let winner = if first.difference <= second.difference {
                    first.player
                } else {
                    second.player
                };
                (winner, first.difference == second.difference)
            }
            // Unreachable while both seats are filled before guessing opens.
            _ => (self.players[0], false),
        };

        GameResult {
            secret_number: self.secret_number,
            reports,
            winner,
            is_tie,
        }
    }

    fn advance(&mut self, target: RoomState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "illegal transition {} -> {}",
            self.state,
            target
        );
        tracing::trace!(code = %self.code, from = %self.state, to = %target, "room state");
        self.state = target;
    }
}
