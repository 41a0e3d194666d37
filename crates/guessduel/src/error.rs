//! Unified error type for the guessduel server.

use guessduel_protocol::ProtocolError;
use guessduel_transport::TransportError;

/// Top-level error that wraps the crate-specific errors a running server
/// can hit.
///
/// Game-rule rejections ([`RoomError`](guessduel_room::RoomError)) are not
/// here: they become `error` messages to the client and never escape a
/// connection handler.
#[derive(Debug, thiserror::Error)]
pub enum GuessduelError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
