//! Protocol types for guessduel's wire format.
//!
//! Every type here crosses the network. Messages are JSON objects tagged
//! with an `event` name and carrying their fields under `data`, which maps
//! one-to-one onto the named events a browser client emits and listens for.

use std::fmt;

use guessduel_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The transient handle of a connected player.
///
/// There are no accounts: a player *is* their connection, so the handle is
/// derived from the transport's [`ConnectionId`] and dies with it.
///
/// `#[serde(transparent)]` makes `PlayerId(42)` travel as plain `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

/// The short code players share to meet in a room.
///
/// Codes are compared after trimming whitespace and lowercasing, because
/// people read them aloud and paste them from chat. The normalisation runs
/// on construction *and* on deserialization, so every `RoomCode` in the
/// system is already canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Builds a normalised room code.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomCode {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RawGuess: the unvalidated guess as typed by the player
// ---------------------------------------------------------------------------

/// A guess exactly as it arrived, before range validation.
///
/// Browser forms hand over strings as often as numbers, so any JSON scalar
/// is accepted here and judged later. Keeping the raw shape lets the game
/// layer answer "invalid range" instead of failing the whole frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawGuess {
    /// A JSON integer, e.g. `42`.
    Integer(i64),
    /// A JSON number with a fraction or exponent, e.g. `42.0` or `4.2e1`.
    Number(f64),
    /// A JSON string, e.g. `"42"`.
    Text(String),
    /// `true` / `false`.
    Flag(bool),
    /// `null` or an absent field.
    #[default]
    Missing,
}

impl RawGuess {
    /// Interprets the raw value as a whole number, if it is one.
    ///
    /// Integral floats (`42.0`) and trimmed decimal strings (`" 42 "`)
    /// count; fractions, booleans and junk do not.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Number(x) => {
                let in_range = x.is_finite()
                    && x.fract() == 0.0
                    && *x >= i64::MIN as f64
                    && *x <= i64::MAX as f64;
                in_range.then_some(*x as i64)
            }
            Self::Text(s) => s.trim().parse().ok(),
            Self::Flag(_) | Self::Missing => None,
        }
    }
}

impl From<i64> for RawGuess {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<&str> for RawGuess {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a server message?
// ---------------------------------------------------------------------------

/// Addressing for an outbound [`ServerMessage`].
///
/// Room membership is resolved to concrete handles when the message is
/// produced, because a resolved room is gone from the registry by the time
/// its result is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Only the connection that caused the event.
    Player(PlayerId),
    /// Every member of a room.
    Room(Vec<PlayerId>),
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Events a client can send.
///
/// `#[serde(tag = "event", content = "data")]` produces
/// `{"event": "join_game", "data": {"code": "ab12cd"}}`; events without
/// fields serialize as `{"event": "create_game"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new room with the sender as first player.
    CreateGame,

    /// Take the second seat in an existing room.
    JoinGame { code: RoomCode },

    /// Lock in a guess for the sender.
    SubmitGuess {
        code: RoomCode,
        #[serde(default)]
        guess: RawGuess,
    },

    /// Ask how far a room has progressed.
    GetStatus { code: RoomCode },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// One player's line in the final result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessReport {
    pub player: PlayerId,
    pub guess: u8,
    /// `|guess - secret_number|`.
    pub difference: u8,
}

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every connection: the handle the server knows
    /// you by, so you can spot yourself in `game_result`.
    Connected { player_id: PlayerId },

    /// Your room exists; share this code.
    GameCreated { code: RoomCode },

    /// You are seated and the room is waiting for someone else.
    Waiting { code: RoomCode },

    /// Both seats are taken: submit your guesses.
    GameStart { code: RoomCode },

    /// A guess was locked in. Sent to the whole room.
    GuessReceived { count: usize, needed: usize },

    /// Both guesses are in; the room is closed after this.
    GameResult {
        secret_number: u8,
        /// One entry per player, in join order.
        guesses: Vec<GuessReport>,
        winner: PlayerId,
        /// `true` when both differences were equal and the first player
        /// won on the tie-break.
        is_tie: bool,
    },

    /// Reply to [`ClientMessage::GetStatus`].
    Status {
        code: RoomCode,
        player_count: usize,
        guess_count: usize,
    },

    /// A request was rejected. Only ever sent to the requester.
    ///
    /// `status` follows HTTP conventions (400, 403, 404, 409, 410).
    Error { status: u16, message: String },
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON-shape tests. Browser clients match on these exact keys, so a
    //! serde attribute slip is a wire break.

    use super::*;
    use serde_json::json;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&PlayerId(42)).unwrap(), "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_player_id_from_connection_id() {
        assert_eq!(PlayerId::from(ConnectionId::new(9)), PlayerId(9));
    }

    #[test]
    fn test_room_code_new_normalises_case_and_whitespace() {
        assert_eq!(RoomCode::new("  Ab12Cd \n").as_str(), "ab12cd");
    }

    #[test]
    fn test_room_code_deserialize_normalises() {
        let code: RoomCode = serde_json::from_str(r#"" XY9Z00""#).unwrap();
        assert_eq!(code, RoomCode::new("xy9z00"));
        assert_eq!(serde_json::to_string(&code).unwrap(), r#""xy9z00""#);
    }

    // =====================================================================
    // RawGuess
    // =====================================================================

    #[test]
    fn test_raw_guess_accepts_any_scalar() {
        let cases = [
            ("42", RawGuess::Integer(42)),
            ("42.5", RawGuess::Number(42.5)),
            (r#""42""#, RawGuess::Text("42".into())),
            ("true", RawGuess::Flag(true)),
            ("null", RawGuess::Missing),
        ];
        for (input, expected) in cases {
            let parsed: RawGuess = serde_json::from_str(input).unwrap();
            assert_eq!(parsed, expected, "input {input}");
        }
    }

    #[test]
    fn test_raw_guess_as_integer() {
        assert_eq!(RawGuess::Integer(7).as_integer(), Some(7));
        assert_eq!(RawGuess::Number(50.0).as_integer(), Some(50));
        assert_eq!(RawGuess::Number(50.5).as_integer(), None);
        assert_eq!(RawGuess::Number(f64::NAN).as_integer(), None);
        assert_eq!(RawGuess::Text(" 13 ".into()).as_integer(), Some(13));
        assert_eq!(RawGuess::Text("13abc".into()).as_integer(), None);
        assert_eq!(RawGuess::Text("".into()).as_integer(), None);
        assert_eq!(RawGuess::Flag(true).as_integer(), None);
        assert_eq!(RawGuess::Missing.as_integer(), None);
    }

    // =====================================================================
    // ClientMessage
    // =====================================================================

    #[test]
    fn test_client_create_game_has_no_data() {
        let json = serde_json::to_value(&ClientMessage::CreateGame).unwrap();
        assert_eq!(json, json!({ "event": "create_game" }));

        let decoded: ClientMessage =
            serde_json::from_str(r#"{"event":"create_game"}"#).unwrap();
        assert_eq!(decoded, ClientMessage::CreateGame);
    }

    #[test]
    fn test_client_submit_guess_json_format() {
        let msg = ClientMessage::SubmitGuess {
            code: RoomCode::new("ab12cd"),
            guess: RawGuess::Integer(50),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({ "event": "submit_guess", "data": { "code": "ab12cd", "guess": 50 } })
        );
    }

    #[test]
    fn test_client_submit_guess_missing_guess_defaults() {
        let decoded: ClientMessage = serde_json::from_str(
            r#"{"event":"submit_guess","data":{"code":"ab12cd"}}"#,
        )
        .unwrap();
        assert_eq!(
            decoded,
            ClientMessage::SubmitGuess {
                code: RoomCode::new("ab12cd"),
                guess: RawGuess::Missing,
            }
        );
    }

    #[test]
    fn test_client_unknown_event_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"event":"fly_to_moon","data":{}}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerMessage
    // =====================================================================

    #[test]
    fn test_server_game_result_json_format() {
        let msg = ServerMessage::GameResult {
            secret_number: 51,
            guesses: vec![
                GuessReport { player: PlayerId(1), guess: 50, difference: 1 },
                GuessReport { player: PlayerId(2), guess: 52, difference: 1 },
            ],
            winner: PlayerId(1),
            is_tie: true,
        };
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["event"], "game_result");
        assert_eq!(json["data"]["secret_number"], 51);
        assert_eq!(json["data"]["winner"], 1);
        assert_eq!(json["data"]["is_tie"], true);
        assert_eq!(
            json["data"]["guesses"][1],
            json!({ "player": 2, "guess": 52, "difference": 1 })
        );
    }

    #[test]
    fn test_server_error_json_format() {
        let msg = ServerMessage::Error {
            status: 404,
            message: "room not found".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({ "event": "error", "data": { "status": 404, "message": "room not found" } })
        );
    }

    #[test]
    fn test_server_status_json_format() {
        let msg = ServerMessage::Status {
            code: RoomCode::new("ab12cd"),
            player_count: 2,
            guess_count: 1,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["event"], "status");
        assert_eq!(json["data"]["player_count"], 2);
        assert_eq!(json["data"]["guess_count"], 1);
    }

    #[test]
    fn test_server_connected_json_format() {
        let msg = ServerMessage::Connected {
            player_id: PlayerId(9),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "event": "connected", "data": { "player_id": 9 } })
        );
    }
}
