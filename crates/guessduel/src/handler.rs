//! Per-connection handler: greeting, message routing and outbound delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbox in the hub and greet the player with its handle
//!   2. Loop: decode inbound frames and run them through the coordinator,
//!      while draining the outbox onto the socket
//!   3. On close, or once the outbox overflows, unregister and report the
//!      disconnect

use std::sync::Arc;

use guessduel_protocol::{ClientMessage, Codec, PlayerId, ProtocolError, ServerMessage};
use guessduel_room::dispatch;
use guessduel_transport::{Connection, WebSocketConnection};

use crate::GuessduelError;
use crate::server::{OUTBOX_CAPACITY, Outbox, ServerState};

/// Largest inbound frame accepted. Every client event fits comfortably.
pub const MAX_FRAME_BYTES: usize = 4 * 1024;

/// Drop guard that unregisters a player when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async locks.
struct ConnectionGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.hub.lock().await.unregister(player_id);
            state.coordinator.lock().await.disconnect(player_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), GuessduelError> {
    let conn_id = conn.id();
    let player_id = PlayerId::from(conn_id);

    let (outbox, mut inbox, overflow) = Outbox::channel(player_id, OUTBOX_CAPACITY);
    state.hub.lock().await.register(player_id, outbox.clone());
    let _guard = ConnectionGuard {
        player_id,
        state: Arc::clone(&state),
    };
    tracing::info!(%conn_id, %player_id, "player connected");

    outbox.push(ServerMessage::Connected { player_id });

    loop {
        tokio::select! {
            incoming = conn.recv() => match incoming {
                Ok(Some(frame)) => handle_frame(&state, &outbox, player_id, &frame).await,
                Ok(None) => {
                    tracing::info!(%player_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%player_id, error = %e, "recv error");
                    break;
                }
            },
            Some(msg) = inbox.recv() => {
                let bytes = state.codec.encode(&msg)?;
                // A peer that stops reading stalls `send`; the overflow
                // signal is what gets us out.
                tokio::select! {
                    sent = conn.send(&bytes) => sent?,
                    () = overflow.notified() => {
                        tracing::info!(%player_id, "dropping slow reader");
                        break;
                    }
                }
            }
            () = overflow.notified() => {
                tracing::info!(%player_id, "dropping slow reader");
                break;
            }
        }
    }

    // _guard drops here → hub unregister and disconnect fire.
    Ok(())
}

/// Decodes one inbound frame and runs it through the coordinator.
///
/// A frame that does not decode is answered with a `malformed message`
/// error; the connection stays open.
async fn handle_frame<C: Codec>(
    state: &ServerState<C>,
    outbox: &Outbox,
    player_id: PlayerId,
    frame: &[u8],
) {
    let msg = match decode_frame(&state.codec, frame) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(%player_id, error = %e, "failed to decode message");
            outbox.push(malformed());
            return;
        }
    };
    tracing::debug!(%player_id, ?msg, "client event");

    // Hold the coordinator across dispatch so per-room delivery order
    // matches state-transition order.
    let mut coordinator = state.coordinator.lock().await;
    let outbound = coordinator.handle(player_id, msg);
    let hub = state.hub.lock().await;
    dispatch(&*hub, outbound);
}

fn decode_frame(codec: &impl Codec, frame: &[u8]) -> Result<ClientMessage, ProtocolError> {
    if frame.len() > MAX_FRAME_BYTES {
        return Err(ProtocolError::InvalidMessage(format!(
            "frame of {} bytes exceeds {MAX_FRAME_BYTES}",
            frame.len()
        )));
    }
    codec.decode(frame)
}

fn malformed() -> ServerMessage {
    ServerMessage::Error {
        status: 400,
        message: "malformed message".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guessduel_protocol::{JsonCodec, RoomCode};

    #[test]
    fn test_decode_frame_valid_event() {
        let msg = decode_frame(&JsonCodec, br#"{"event":"get_status","data":{"code":"AB12CD"}}"#);
        assert_eq!(
            msg.unwrap(),
            ClientMessage::GetStatus {
                code: RoomCode::new("ab12cd")
            }
        );
    }

    #[test]
    fn test_decode_frame_garbage_is_decode_error() {
        let err = decode_frame(&JsonCodec, b"hello").unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_decode_frame_oversized_is_rejected_before_parsing() {
        let frame = vec![b' '; MAX_FRAME_BYTES + 1];
        let err = decode_frame(&JsonCodec, &frame).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidMessage(_)));
    }

    #[test]
    fn test_malformed_reply_shape() {
        assert_eq!(
            malformed(),
            ServerMessage::Error {
                status: 400,
                message: "malformed message".into()
            }
        );
    }
}
