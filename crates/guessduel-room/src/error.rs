//! Error types for the room layer.
//!
//! Every variant is an ordinary outcome of user input. The coordinator
//! turns them into an `error` message for the requester and nothing else
//! happens: validation runs before any mutation, so a rejected request
//! leaves the registry exactly as it was.

use guessduel_protocol::{PlayerId, RoomCode, ServerMessage};

/// Errors that can occur during room operations.
///
/// The `Display` text is what the client sees, so it stays short and
/// stable; the payloads are for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room not found")]
    NotFound(RoomCode),

    /// The room outlived its TTL and was just removed.
    #[error("room expired")]
    Expired(RoomCode),

    /// Both seats are taken.
    #[error("room full")]
    RoomFull(RoomCode),

    /// The sender has no seat in a started game.
    #[error("not a participant")]
    NotAParticipant(PlayerId),

    /// The guess is not a whole number in `1..=100`.
    #[error("invalid range")]
    InvalidGuessRange,

    /// The sender already locked in a guess.
    #[error("duplicate submission")]
    DuplicateSubmission(PlayerId),
}

impl RoomError {
    /// HTTP-style status code sent alongside the message.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Expired(_) => 410,
            Self::RoomFull(_) | Self::DuplicateSubmission(_) => 409,
            Self::NotAParticipant(_) => 403,
            Self::InvalidGuessRange => 400,
        }
    }

    /// Collapses expiry into plain not-found.
    ///
    /// Only `join_game` tells players a room *expired*; every other request
    /// keeps the smaller error surface.
    pub fn expired_as_not_found(self) -> Self {
        match self {
            Self::Expired(code) => Self::NotFound(code),
            other => other,
        }
    }

    /// The `error` message to send back to the requester.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::Error {
            status: self.status(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_client_strings() {
        let code = RoomCode::new("abcd12");
        assert_eq!(RoomError::NotFound(code.clone()).to_string(), "room not found");
        assert_eq!(RoomError::Expired(code.clone()).to_string(), "room expired");
        assert_eq!(RoomError::RoomFull(code).to_string(), "room full");
        assert_eq!(
            RoomError::NotAParticipant(PlayerId(1)).to_string(),
            "not a participant"
        );
        assert_eq!(RoomError::InvalidGuessRange.to_string(), "invalid range");
        assert_eq!(
            RoomError::DuplicateSubmission(PlayerId(1)).to_string(),
            "duplicate submission"
        );
    }

    #[test]
    fn test_expired_as_not_found_only_touches_expired() {
        let code = RoomCode::new("abcd12");
        assert_eq!(
            RoomError::Expired(code.clone()).expired_as_not_found(),
            RoomError::NotFound(code.clone())
        );
        assert_eq!(
            RoomError::RoomFull(code.clone()).expired_as_not_found(),
            RoomError::RoomFull(code)
        );
    }

    #[test]
    fn test_to_message_carries_status_and_text() {
        let msg = RoomError::InvalidGuessRange.to_message();
        assert_eq!(
            msg,
            ServerMessage::Error {
                status: 400,
                message: "invalid range".into()
            }
        );
    }
}
