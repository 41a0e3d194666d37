//! Registry configuration and the room state machine.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`SessionRegistry`](crate::SessionRegistry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How long a room may live before it is treated as abandoned.
    /// Measured from creation, not from last activity.
    pub room_ttl: Duration,

    /// Number of characters in generated room codes.
    pub code_length: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            room_ttl: Duration::from_secs(30 * 60),
            code_length: 6,
        }
    }
}

impl RegistryConfig {
    /// Shortest code the registry will generate.
    pub const MIN_CODE_LENGTH: usize = 4;
    /// Longest code the registry will generate.
    pub const MAX_CODE_LENGTH: usize = 16;

    /// Builds a config with the given TTL and default everything else.
    pub fn with_ttl(room_ttl: Duration) -> Self {
        Self {
            room_ttl,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by the registry constructors. A too-short code space would
    /// make the collision-retry loop in room creation spin.
    pub fn validated(mut self) -> Self {
        let clamped = self
            .code_length
            .clamp(Self::MIN_CODE_LENGTH, Self::MAX_CODE_LENGTH);
        if clamped != self.code_length {
            tracing::warn!(
                requested = self.code_length,
                used = clamped,
                "code_length out of range, clamping"
            );
            self.code_length = clamped;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// Transitions are strictly ordered:
///
/// ```text
/// AwaitingPlayer2 → AwaitingGuesses → Resolved
/// ```
///
/// - **AwaitingPlayer2**: only the creator is seated.
/// - **AwaitingGuesses**: both seats taken, fewer than two guesses in.
/// - **Resolved**: both guesses in and the result computed. The registry
///   drops the room right after, so nobody outside the state machine ever
///   observes this state on a live room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    AwaitingPlayer2,
    AwaitingGuesses,
    Resolved,
}

impl RoomState {
    /// Returns `true` if a new player may take a seat.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::AwaitingPlayer2)
    }

    /// Returns `true` if guesses are being collected.
    pub fn accepts_guesses(&self) -> bool {
        matches!(self, Self::AwaitingGuesses)
    }

    /// The state that follows this one, or `None` for the terminal state.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::AwaitingPlayer2 => Some(Self::AwaitingGuesses),
            Self::AwaitingGuesses => Some(Self::Resolved),
            Self::Resolved => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingPlayer2 => write!(f, "AwaitingPlayer2"),
            Self::AwaitingGuesses => write!(f, "AwaitingGuesses"),
            Self::Resolved => write!(f, "Resolved"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_state_next_follows_strict_order() {
        assert_eq!(
            RoomState::AwaitingPlayer2.next(),
            Some(RoomState::AwaitingGuesses)
        );
        assert_eq!(
            RoomState::AwaitingGuesses.next(),
            Some(RoomState::Resolved)
        );
        assert_eq!(RoomState::Resolved.next(), None);
    }

    #[test]
    fn test_room_state_can_transition_to() {
        assert!(RoomState::AwaitingPlayer2.can_transition_to(RoomState::AwaitingGuesses));
        assert!(!RoomState::AwaitingPlayer2.can_transition_to(RoomState::Resolved));
        assert!(!RoomState::Resolved.can_transition_to(RoomState::AwaitingPlayer2));
    }

    #[test]
    fn test_room_state_predicates() {
        assert!(RoomState::AwaitingPlayer2.is_joinable());
        assert!(!RoomState::AwaitingGuesses.is_joinable());
        assert!(!RoomState::AwaitingPlayer2.accepts_guesses());
        assert!(RoomState::AwaitingGuesses.accepts_guesses());
        assert!(!RoomState::Resolved.accepts_guesses());
    }

    #[test]
    fn test_room_state_display() {
        assert_eq!(RoomState::AwaitingGuesses.to_string(), "AwaitingGuesses");
    }

    #[test]
    fn test_registry_config_default() {
        let config = RegistryConfig::default();
        assert_eq!(config.room_ttl, Duration::from_secs(1800));
        assert_eq!(config.code_length, 6);
    }

    #[test]
    fn test_registry_config_validated_clamps_code_length() {
        let short = RegistryConfig { code_length: 1, ..Default::default() }.validated();
        assert_eq!(short.code_length, RegistryConfig::MIN_CODE_LENGTH);

        let long = RegistryConfig { code_length: 99, ..Default::default() }.validated();
        assert_eq!(long.code_length, RegistryConfig::MAX_CODE_LENGTH);
    }
}
