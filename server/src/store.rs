//! State store seam and the in-process implementation backing it
//!
//! Every piece of per-game state (serialized aggregates, stopwatch origins,
//! blocking windows, the raised-hand ledger) lives behind the [`Store`]
//! trait rather than in process-wide singletons. State is retrieved, mutated,
//! and written back per request, so a networked key-value store can replace
//! [`MemoryStore`] without touching the engine.

use std::collections::HashMap;
use std::sync::Mutex;

/// Key for the serialized game aggregate.
pub fn game_key(game_id: &str) -> String {
    format!("game.{game_id}")
}

/// Key for the per-game stopwatch origin.
pub fn stopwatch_key(game_id: &str) -> String {
    format!("stopwatch.{game_id}")
}

/// Key for the game-wide blocking window (post-transition suppression).
///
/// Game and participant windows share one blocked-until keyspace but live in
/// disjoint namespaces, so a participant id can never collide with a game id.
pub fn game_block_key(game_id: &str) -> String {
    format!("blocked.game.{game_id}")
}

/// Key for a participant's individual cooldown window.
pub fn player_block_key(player_id: &str) -> String {
    format!("blocked.player.{player_id}")
}

/// Key for the per-game raised-hand ledger.
pub fn hands_key(game_id: &str) -> String {
    format!("hands.{game_id}")
}

/// Minimal key-value surface consumed by the synchronization engine.
///
/// Plain values have last-write-wins semantics. The score-ordered set backs
/// the raised-hand ledger: inserts are first-write-wins per member, and range
/// reads come back ordered by ascending score with ties in insertion order.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    fn set(&self, key: &str, value: Vec<u8>);

    /// Removes a key, whether it holds a plain value or an ordered set.
    fn delete(&self, key: &str);

    /// Inserts a member with the given score only if the member is absent.
    /// Returns whether the insert happened.
    fn zadd_nx(&self, key: &str, member: &str, score: u64) -> bool;

    /// All members of an ordered set, ascending by score. Members with equal
    /// scores keep their insertion order.
    fn zrange_with_scores(&self, key: &str) -> Vec<(String, u64)>;
}

/// In-process [`Store`] with the semantics of a single-node key-value server.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
    sets: Mutex<HashMap<String, Vec<(String, u64)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.values.lock().expect("store lock poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: Vec<u8>) {
        self.values.lock().expect("store lock poisoned").insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.values.lock().expect("store lock poisoned").remove(key);
        self.sets.lock().expect("store lock poisoned").remove(key);
    }

    fn zadd_nx(&self, key: &str, member: &str, score: u64) -> bool {
        let mut sets = self.sets.lock().expect("store lock poisoned");
        let entries = sets.entry(key.to_string()).or_default();
        if entries.iter().any(|(m, _)| m == member) {
            return false;
        }
        entries.push((member.to_string(), score));
        true
    }

    fn zrange_with_scores(&self, key: &str) -> Vec<(String, u64)> {
        let sets = self.sets.lock().expect("store lock poisoned");
        let mut entries = match sets.get(key) {
            Some(entries) => entries.clone(),
            None => return Vec::new(),
        };
        // Stable sort keeps insertion order for tied scores
        entries.sort_by_key(|(_, score)| *score);
        entries
    }
}
