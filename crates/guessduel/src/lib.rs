//! # guessduel
//!
//! Real-time two-player number-guessing game server.
//!
//! Two players meet in a room identified by a short code, each locks in a
//! guess against a hidden number in `1..=100`, and the closest guess wins.
//! This crate wires the layers together: a WebSocket transport, the JSON
//! wire protocol, the room coordinator and the background expiry sweep.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use guessduel::prelude::*;
//!
//! # async fn start() -> Result<(), GuessduelError> {
//! let server = GuessduelServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::GuessduelError;
pub use handler::MAX_FRAME_BYTES;
pub use server::{GuessduelServer, GuessduelServerBuilder};

pub mod prelude {
    pub use crate::{GuessduelError, GuessduelServer, GuessduelServerBuilder};
    pub use guessduel_protocol::{
        ClientMessage, GuessReport, PlayerId, RawGuess, RoomCode, ServerMessage,
    };
    pub use guessduel_room::RegistryConfig;
    pub use guessduel_sweep::SweepConfig;
}
