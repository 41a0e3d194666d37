//! Outbound notification seam.
//!
//! Game logic never touches sockets. The coordinator returns
//! `(Recipient, ServerMessage)` pairs and whoever owns the connections
//! implements [`Notifier`] to deliver them.

use guessduel_protocol::{PlayerId, Recipient, ServerMessage};

/// A message together with who should receive it.
pub type Outbound = (Recipient, ServerMessage);

/// Delivers server messages to connected players.
///
/// Implementations must not block: the coordinator's lock is held while
/// notifications are handed over, which keeps per-room delivery order equal
/// to state-transition order. Delivery to a player who is no longer
/// connected is silently dropped.
pub trait Notifier {
    /// Sends `msg` to one player.
    fn notify(&self, player: PlayerId, msg: &ServerMessage);

    /// Sends `msg` to every player in `members`.
    fn broadcast(&self, members: &[PlayerId], msg: &ServerMessage) {
        for &player in members {
            self.notify(player, msg);
        }
    }
}

/// Hands every outbound message to `notifier`, in order.
pub fn dispatch<N: Notifier + ?Sized>(notifier: &N, outbound: Vec<Outbound>) {
    for (recipient, msg) in outbound {
        match recipient {
            Recipient::Player(player) => notifier.notify(player, &msg),
            Recipient::Room(members) => notifier.broadcast(&members, &msg),
        }
    }
}
