//! Event coordinator: turns client events into registry operations and
//! outbound notifications.
//!
//! The coordinator is synchronous and owns the whole registry. Callers
//! serialize access (the server keeps it behind one mutex), which makes
//! every handler below an atomic check-then-act: two players racing for
//! the last seat, or two guesses arriving together, are processed one
//! after the other and the result is computed exactly once.

use guessduel_protocol::{ClientMessage, PlayerId, RawGuess, Recipient, RoomCode, ServerMessage};

use crate::room::MAX_PLAYERS;
use crate::{
    Clock, GuessOutcome, JoinOutcome, Outbound, RegistryConfig, RoomError, SessionRegistry,
    SystemClock,
};

/// Drives the game for every connected player.
pub struct GameCoordinator<C: Clock = SystemClock> {
    registry: SessionRegistry<C>,
}

impl GameCoordinator<SystemClock> {
    /// Creates a coordinator over an empty registry on the system clock.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::new(SessionRegistry::new(config))
    }
}

impl<C: Clock> GameCoordinator<C> {
    pub fn new(registry: SessionRegistry<C>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SessionRegistry<C> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SessionRegistry<C> {
        &mut self.registry
    }

    /// Processes one client event from `sender`.
    ///
    /// Rejections come back as a single `error` addressed to `sender`; they
    /// are never broadcast.
    pub fn handle(&mut self, sender: PlayerId, msg: ClientMessage) -> Vec<Outbound> {
        let result = match msg {
            ClientMessage::CreateGame => Ok(self.create_game(sender)),
            ClientMessage::JoinGame { code } => self.join_game(sender, &code),
            ClientMessage::SubmitGuess { code, guess } => self.submit_guess(sender, &code, &guess),
            ClientMessage::GetStatus { code } => Ok(self.get_status(sender, &code)),
        };

        result.unwrap_or_else(|err| {
            tracing::debug!(player_id = %sender, error = %err, "request rejected");
            vec![(Recipient::Player(sender), err.to_message())]
        })
    }

    /// Opens a room for `sender`: `game_created` then `waiting`.
    pub fn create_game(&mut self, sender: PlayerId) -> Vec<Outbound> {
        let code = self.registry.create_room(sender);
        vec![
            (
                Recipient::Player(sender),
                ServerMessage::GameCreated { code: code.clone() },
            ),
            (Recipient::Player(sender), ServerMessage::Waiting { code }),
        ]
    }

    /// Seats `sender` in room `code`.
    ///
    /// Filling the last seat broadcasts `game_start`; a re-join by a seated
    /// player just gets `waiting` again.
    pub fn join_game(
        &mut self,
        sender: PlayerId,
        code: &RoomCode,
    ) -> Result<Vec<Outbound>, RoomError> {
        let room = self.registry.get_room(code)?;
        let outbound = match room.join(sender)? {
            JoinOutcome::Rejoined | JoinOutcome::Waiting => {
                vec![(
                    Recipient::Player(sender),
                    ServerMessage::Waiting { code: code.clone() },
                )]
            }
            JoinOutcome::Started => {
                tracing::info!(%code, player_id = %sender, "game started");
                vec![(
                    Recipient::Room(room.players().to_vec()),
                    ServerMessage::GameStart { code: code.clone() },
                )]
            }
        };
        Ok(outbound)
    }

    /// Records `sender`'s guess for room `code`.
    ///
    /// Each accepted guess broadcasts `guess_received`. The second one also
    /// broadcasts `game_result` and deletes the room, so any later request
    /// for the code sees `room not found`.
    pub fn submit_guess(
        &mut self,
        sender: PlayerId,
        code: &RoomCode,
        raw: &RawGuess,
    ) -> Result<Vec<Outbound>, RoomError> {
        let now = self.registry.clock().now();
        let room = self
            .registry
            .get_room(code)
            .map_err(RoomError::expired_as_not_found)?;
        let members = room.players().to_vec();

        match room.submit_guess(sender, raw, now)? {
            GuessOutcome::Recorded { count } => Ok(vec![(
                Recipient::Room(members),
                ServerMessage::GuessReceived {
                    count,
                    needed: MAX_PLAYERS,
                },
            )]),
            GuessOutcome::Resolved(result) => {
                self.registry.delete_room(code);
                tracing::info!(
                    %code,
                    winner = %result.winner,
                    is_tie = result.is_tie,
                    "game resolved"
                );
                Ok(vec![
                    (
                        Recipient::Room(members.clone()),
                        ServerMessage::GuessReceived {
                            count: MAX_PLAYERS,
                            needed: MAX_PLAYERS,
                        },
                    ),
                    (Recipient::Room(members), result.to_message()),
                ])
            }
        }
    }

    /// Reports a room's progress to `sender`, or nothing if there is no
    /// such live room.
    pub fn get_status(&mut self, sender: PlayerId, code: &RoomCode) -> Vec<Outbound> {
        let Some(room) = self.registry.peek(code) else {
            return Vec::new();
        };
        vec![(
            Recipient::Player(sender),
            ServerMessage::Status {
                code: code.clone(),
                player_count: room.players().len(),
                guess_count: room.guesses().len(),
            },
        )]
    }

    /// Notes that `player` went away.
    ///
    /// Rooms are left alone: a player who never guesses simply stalls their
    /// room until the TTL sweep removes it.
    pub fn disconnect(&mut self, player: PlayerId) {
        tracing::info!(player_id = %player, "player disconnected");
    }

    /// Removes expired rooms. Called by the periodic sweep.
    pub fn sweep_expired(&mut self) -> Vec<RoomCode> {
        self.registry.sweep_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    fn coordinator() -> GameCoordinator<ManualClock> {
        let registry =
            SessionRegistry::with_clock(RegistryConfig::default(), ManualClock::new()).with_seed(1);
        GameCoordinator::new(registry)
    }

    fn created_code(outbound: &[Outbound]) -> RoomCode {
        match &outbound[0].1 {
            ServerMessage::GameCreated { code } => code.clone(),
            other => panic!("expected GameCreated, got {other:?}"),
        }
    }

    #[test]
    fn test_handle_create_game_replies_created_then_waiting() {
        let mut coord = coordinator();
        let out = coord.handle(PlayerId(1), ClientMessage::CreateGame);

        assert_eq!(out.len(), 2);
        let code = created_code(&out);
        assert_eq!(out[0].0, Recipient::Player(PlayerId(1)));
        assert_eq!(
            out[1],
            (Recipient::Player(PlayerId(1)), ServerMessage::Waiting { code })
        );
    }

    #[test]
    fn test_handle_join_unknown_room_returns_error_to_sender() {
        let mut coord = coordinator();
        let out = coord.handle(
            PlayerId(2),
            ClientMessage::JoinGame {
                code: RoomCode::new("nope00"),
            },
        );
        assert_eq!(
            out,
            vec![(
                Recipient::Player(PlayerId(2)),
                ServerMessage::Error {
                    status: 404,
                    message: "room not found".into()
                }
            )]
        );
    }

    #[test]
    fn test_handle_join_second_player_broadcasts_start() {
        let mut coord = coordinator();
        let code = created_code(&coord.handle(PlayerId(1), ClientMessage::CreateGame));

        let out = coord.handle(PlayerId(2), ClientMessage::JoinGame { code: code.clone() });
        assert_eq!(
            out,
            vec![(
                Recipient::Room(vec![PlayerId(1), PlayerId(2)]),
                ServerMessage::GameStart { code }
            )]
        );
    }

    #[test]
    fn test_handle_get_status_unknown_room_is_silent() {
        let mut coord = coordinator();
        let out = coord.handle(
            PlayerId(1),
            ClientMessage::GetStatus {
                code: RoomCode::new("nope00"),
            },
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_handle_submit_guess_missing_value_is_invalid_range() {
        let mut coord = coordinator();
        let code = created_code(&coord.handle(PlayerId(1), ClientMessage::CreateGame));
        coord.handle(PlayerId(2), ClientMessage::JoinGame { code: code.clone() });

        let out = coord.handle(
            PlayerId(1),
            ClientMessage::SubmitGuess {
                code,
                guess: RawGuess::Missing,
            },
        );
        assert_eq!(
            out[0].1,
            ServerMessage::Error {
                status: 400,
                message: "invalid range".into()
            }
        );
    }

    #[test]
    fn test_disconnect_leaves_room_in_place() {
        let mut coord = coordinator();
        let code = created_code(&coord.handle(PlayerId(1), ClientMessage::CreateGame));

        coord.disconnect(PlayerId(1));
        assert!(coord.registry().peek(&code).is_some());
    }
}
