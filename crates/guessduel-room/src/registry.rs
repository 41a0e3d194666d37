//! Session registry: creates, finds, expires and deletes rooms.

use std::collections::HashMap;

use guessduel_protocol::{PlayerId, RoomCode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::room::GUESS_RANGE;
use crate::{Clock, RegistryConfig, Room, RoomError, SystemClock};

/// Characters a generated room code is drawn from.
const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Owns every live room, keyed by code.
///
/// The registry is a plain value: no globals, no interior locking. The
/// server wraps it in one mutex and tests build as many as they like.
/// Rooms are only ever lent out as `&Room` / `&mut Room` borrowed from the
/// registry, so nobody can keep a room alive past its removal.
pub struct SessionRegistry<C: Clock = SystemClock> {
    rooms: HashMap<RoomCode, Room>,
    config: RegistryConfig,
    clock: C,
    /// Draws room codes and secrets.
    rng: StdRng,
}

impl SessionRegistry<SystemClock> {
    /// Creates an empty registry on the system clock.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for SessionRegistry<SystemClock> {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl<C: Clock> SessionRegistry<C> {
    /// Creates an empty registry reading time from `clock`.
    pub fn with_clock(config: RegistryConfig, clock: C) -> Self {
        Self {
            rooms: HashMap::new(),
            config: config.validated(),
            clock,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replaces the random source with a seeded one, making codes and
    /// secrets reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Opens a room with `owner` seated and returns its code.
    ///
    /// Codes are unique among live rooms; a collision just draws again.
    pub fn create_room(&mut self, owner: PlayerId) -> RoomCode {
        let code = loop {
            let candidate = self.generate_code();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
            tracing::debug!(code = %candidate, "room code collision, retrying");
        };
        let secret = self.rng.random_range(GUESS_RANGE);
        let room = Room::new(code.clone(), owner, secret, self.clock.now());
        self.rooms.insert(code.clone(), room);

        tracing::info!(%code, player_id = %owner, "room created");
        code
    }

    /// Looks up a live room for mutation.
    ///
    /// A room past its TTL is removed on the spot and reported as
    /// [`RoomError::Expired`], so an expired room is never handed out even
    /// if the sweep has not run yet.
    pub fn get_room(&mut self, code: &RoomCode) -> Result<&mut Room, RoomError> {
        let now = self.clock.now();
        let ttl = self.config.room_ttl;

        let expired = match self.rooms.get(code) {
            None => return Err(RoomError::NotFound(code.clone())),
            Some(room) => room.is_expired(now, ttl),
        };
        if expired {
            self.rooms.remove(code);
            tracing::info!(%code, "room expired on access");
            return Err(RoomError::Expired(code.clone()));
        }

        self.rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Read-only lookup with no expiry side effect.
    ///
    /// Returns `None` for rooms past their TTL as well, so readers never
    /// see a room that [`get_room`](Self::get_room) would refuse.
    pub fn peek(&self, code: &RoomCode) -> Option<&Room> {
        let now = self.clock.now();
        self.rooms
            .get(code)
            .filter(|room| !room.is_expired(now, self.config.room_ttl))
    }

    /// Removes a room. Returns `false` if it was already gone.
    pub fn delete_room(&mut self, code: &RoomCode) -> bool {
        let removed = self.rooms.remove(code).is_some();
        if removed {
            tracing::debug!(%code, "room deleted");
        }
        removed
    }

    /// Removes every room older than the TTL and returns their codes.
    pub fn sweep_expired(&mut self) -> Vec<RoomCode> {
        let now = self.clock.now();
        let ttl = self.config.room_ttl;

        let expired: Vec<RoomCode> = self
            .rooms
            .values()
            .filter(|room| room.is_expired(now, ttl))
            .map(|room| room.code().clone())
            .collect();

        for code in &expired {
            self.rooms.remove(code);
            tracing::info!(%code, "room expired");
        }
        expired
    }

    /// Number of rooms held, including expired ones not yet swept.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn generate_code(&mut self) -> RoomCode {
        let code: String = (0..self.config.code_length)
            .map(|_| {
                let idx = self.rng.random_range(0..CODE_ALPHABET.len());
                char::from(CODE_ALPHABET[idx])
            })
            .collect();
        RoomCode::new(code)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::{ManualClock, RoomState};

    const TTL: Duration = Duration::from_secs(60);

    fn registry() -> (SessionRegistry<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let reg = SessionRegistry::with_clock(RegistryConfig::with_ttl(TTL), clock.clone())
            .with_seed(7);
        (reg, clock)
    }

    // =====================================================================
    // create_room()
    // =====================================================================

    #[test]
    fn test_create_room_seats_owner_with_secret_in_range() {
        let (mut reg, _) = registry();
        let code = reg.create_room(PlayerId(1));

        let room = reg.peek(&code).unwrap();
        assert_eq!(room.players(), &[PlayerId(1)]);
        assert_eq!(room.state(), RoomState::AwaitingPlayer2);
        assert!(GUESS_RANGE.contains(&room.secret_number()));
    }

    #[test]
    fn test_create_room_code_shape() {
        let (mut reg, _) = registry();
        let code = reg.create_room(PlayerId(1));

        assert_eq!(code.as_str().len(), 6);
        assert!(
            code.as_str()
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        );
    }

    #[test]
    fn test_create_room_codes_are_unique() {
        let (mut reg, _) = registry();
        let codes: HashSet<RoomCode> = (0..500).map(|i| reg.create_room(PlayerId(i))).collect();
        assert_eq!(codes.len(), 500);
        assert_eq!(reg.room_count(), 500);
    }

    #[test]
    fn test_create_room_same_seed_same_codes() {
        let (mut a, _) = registry();
        let (mut b, _) = registry();
        assert_eq!(a.create_room(PlayerId(1)), b.create_room(PlayerId(1)));
    }

    #[test]
    fn test_create_room_respects_code_length() {
        let config = RegistryConfig {
            code_length: 10,
            ..Default::default()
        };
        let mut reg = SessionRegistry::with_clock(config, ManualClock::new());
        assert_eq!(reg.create_room(PlayerId(1)).as_str().len(), 10);
    }

    // =====================================================================
    // get_room() / peek()
    // =====================================================================

    #[test]
    fn test_get_room_unknown_returns_not_found() {
        let (mut reg, _) = registry();
        let code = RoomCode::new("zzzzzz");
        assert_eq!(reg.get_room(&code).err(), Some(RoomError::NotFound(code)));
    }

    #[test]
    fn test_get_room_normalises_code() {
        let (mut reg, _) = registry();
        let code = reg.create_room(PlayerId(1));
        let shouted = RoomCode::new(format!("  {}  ", code.as_str().to_uppercase()));
        assert!(reg.get_room(&shouted).is_ok());
    }

    #[test]
    fn test_get_room_at_ttl_is_still_live() {
        let (mut reg, clock) = registry();
        let code = reg.create_room(PlayerId(1));

        clock.advance(TTL);
        assert!(reg.get_room(&code).is_ok());
    }

    #[test]
    fn test_get_room_past_ttl_returns_expired_and_removes() {
        let (mut reg, clock) = registry();
        let code = reg.create_room(PlayerId(1));

        clock.advance(TTL + Duration::from_secs(1));
        assert_eq!(
            reg.get_room(&code).err(),
            Some(RoomError::Expired(code.clone()))
        );
        assert!(reg.is_empty());
        // Second lookup: gone for good.
        assert_eq!(reg.get_room(&code).err(), Some(RoomError::NotFound(code)));
    }

    #[test]
    fn test_peek_hides_expired_without_removing() {
        let (mut reg, clock) = registry();
        let code = reg.create_room(PlayerId(1));

        clock.advance(TTL + Duration::from_secs(1));
        assert!(reg.peek(&code).is_none());
        assert_eq!(reg.room_count(), 1);
    }

    // =====================================================================
    // delete_room() / sweep_expired()
    // =====================================================================

    #[test]
    fn test_delete_room_is_idempotent() {
        let (mut reg, _) = registry();
        let code = reg.create_room(PlayerId(1));

        assert!(reg.delete_room(&code));
        assert!(!reg.delete_room(&code));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_sweep_expired_removes_only_old_rooms() {
        let (mut reg, clock) = registry();
        let old = reg.create_room(PlayerId(1));
        clock.advance(Duration::from_secs(45));
        let young = reg.create_room(PlayerId(2));
        clock.advance(Duration::from_secs(30));

        let removed = reg.sweep_expired();
        assert_eq!(removed, vec![old.clone()]);
        assert!(reg.peek(&old).is_none());
        assert!(reg.peek(&young).is_some());
        assert_eq!(reg.room_count(), 1);
    }

    #[test]
    fn test_sweep_expired_on_fresh_registry_is_noop() {
        let (mut reg, _) = registry();
        reg.create_room(PlayerId(1));
        assert!(reg.sweep_expired().is_empty());
        assert_eq!(reg.room_count(), 1);
    }

    #[test]
    fn test_with_clock_validates_config() {
        let config = RegistryConfig {
            code_length: 0,
            ..Default::default()
        };
        let reg = SessionRegistry::with_clock(config, ManualClock::new());
        assert_eq!(reg.config().code_length, RegistryConfig::MIN_CODE_LENGTH);
    }
}
