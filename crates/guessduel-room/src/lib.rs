//! Room registry and game rules for guessduel.
//!
//! Everything here is synchronous, in-memory and single-owner. The server
//! crate puts one [`GameCoordinator`] behind a mutex; tests drive it
//! directly.
//!
//! # Key types
//!
//! - [`SessionRegistry`]: creates, finds, expires and deletes rooms
//! - [`Room`]: seats, guesses and result computation
//! - [`RoomState`]: lifecycle state machine
//! - [`GameCoordinator`]: maps client events to outbound messages
//! - [`Notifier`]: the delivery seam the server implements
//! - [`Clock`]: time source, swappable in tests

mod clock;
mod config;
mod coordinator;
mod error;
mod notify;
mod registry;
mod room;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RegistryConfig, RoomState};
pub use coordinator::GameCoordinator;
pub use error::RoomError;
pub use notify::{Notifier, Outbound, dispatch};
pub use registry::SessionRegistry;
pub use room::{
    GUESS_RANGE, GameResult, GuessOutcome, JoinOutcome, MAX_PLAYERS, RecordedGuess, Room,
    parse_guess,
};
