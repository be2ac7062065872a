//! Synchronization engine: command scheduling, blocking windows, and the
//! raised-hand leaderboard
//!
//! Clients observe host commands over variable-latency delivery, and every
//! client clock is skewed differently. Rather than trusting "now" on either
//! side, the engine schedules a *future* execution instant that all clients
//! wait for locally and react to, bounding the fairness error to
//! clock-skew-plus-jitter instead of one-way latency.
//!
//! There is no server-side timer: the transition from "awaiting execution" to
//! "accepting reactions" is purely a comparison of submitted timestamps
//! against stored blocking windows, evaluated lazily on each incoming event.

use crate::error::GameError;
use crate::store::{self, Store};
use log::debug;
use shared::{COMMAND_LEAD_MS, HAND_COOLDOWN_MS};
use std::sync::Arc;

/// Outcome of a non-host reaction submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// First claim of the round for this participant; it was ranked.
    Accepted,
    /// The participant already claimed a reaction this round. Dropped, not an
    /// error.
    Duplicate,
    /// A blocking window covers the claimed instant. Dropped silently.
    Blocked,
}

/// Owns the stopwatch origin, blocking windows, and raised-hand ledger for
/// every active game, addressed through the state store per request.
///
/// Every operation takes the server-observed `now` explicitly; the engine
/// never reads a clock itself.
pub struct SyncEngine {
    store: Arc<dyn Store>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Schedules a future instant at which all clients treat a command as in
    /// effect, and suppresses every reaction claiming to predate it.
    ///
    /// Returns `now + COMMAND_LEAD_MS`. Side effect: installs a blocking
    /// window on the game's namespace until that instant.
    pub fn schedule_execution(&self, game_id: &str, now: u64) -> Result<u64, GameError> {
        let execute_at = now + COMMAND_LEAD_MS;
        self.put_instant(&store::game_block_key(game_id), execute_at)?;
        Ok(execute_at)
    }

    /// Clears the raised-hand ledger and re-anchors the stopwatch origin.
    ///
    /// Slide changes pass the scheduled execution instant; an explicit hand
    /// reset passes `now` with no scheduling delay.
    pub fn reset_round(&self, game_id: &str, new_origin: u64) -> Result<(), GameError> {
        self.store.delete(&store::hands_key(game_id));
        self.put_instant(&store::stopwatch_key(game_id), new_origin)
    }

    /// Records a participant's reaction claim for the current round.
    ///
    /// Rejects claims covered by the participant's individual cooldown or by
    /// the game's post-transition window. Accepted or not-yet-ranked claims
    /// install a fresh individual cooldown starting at `now`; within a round
    /// the first claim wins and later ones are dropped as [`Reaction::Duplicate`].
    pub fn submit_reaction(
        &self,
        game_id: &str,
        participant_id: &str,
        claimed: u64,
        now: u64,
    ) -> Result<Reaction, GameError> {
        if self.is_blocked(&store::player_block_key(participant_id), claimed)? {
            debug!("reaction from {} inside individual cooldown", participant_id);
            return Ok(Reaction::Blocked);
        }
        if self.is_blocked(&store::game_block_key(game_id), claimed)? {
            debug!("reaction from {} inside game window", participant_id);
            return Ok(Reaction::Blocked);
        }

        self.put_instant(&store::player_block_key(participant_id), now + HAND_COOLDOWN_MS)?;

        let inserted = self
            .store
            .zadd_nx(&store::hands_key(game_id), participant_id, claimed);
        Ok(if inserted {
            Reaction::Accepted
        } else {
            Reaction::Duplicate
        })
    }

    /// Host-triggered "go!" signal.
    ///
    /// Subject to the same two blocking checks as a reaction, but never
    /// ranked: schedules a new execution instant, resets the round anchored
    /// at it, and leaves the game window covering everything before it.
    /// Returns the execution instant to broadcast, or `None` when blocked.
    pub fn fire(
        &self,
        game_id: &str,
        host_id: &str,
        claimed: u64,
        now: u64,
    ) -> Result<Option<u64>, GameError> {
        if self.is_blocked(&store::player_block_key(host_id), claimed)?
            || self.is_blocked(&store::game_block_key(game_id), claimed)?
        {
            debug!("fire from {} suppressed by blocking window", host_id);
            return Ok(None);
        }

        let execute_at = self.schedule_execution(game_id, now)?;
        self.reset_round(game_id, execute_at)?;
        Ok(Some(execute_at))
    }

    /// Current-round leaderboard: `(participant_id, delay_ms)` ascending by
    /// delay, ties in arrival order.
    ///
    /// `delay_ms = claimed - origin`; negative values only arise from clock
    /// skew and are reported unclamped. A game with no stopwatch origin has
    /// no round, so its ranking is empty.
    pub fn ranking(&self, game_id: &str) -> Result<Vec<(String, i64)>, GameError> {
        let origin = match self.get_instant(&store::stopwatch_key(game_id))? {
            Some(origin) => origin,
            None => return Ok(Vec::new()),
        };

        let hands = self.store.zrange_with_scores(&store::hands_key(game_id));
        Ok(hands
            .into_iter()
            .map(|(id, claimed)| (id, claimed as i64 - origin as i64))
            .collect())
    }

    /// A window blocks a claim when the claim does not strictly postdate it.
    fn is_blocked(&self, key: &str, check_time: u64) -> Result<bool, GameError> {
        Ok(match self.get_instant(key)? {
            Some(blocked_until) => check_time <= blocked_until,
            None => false,
        })
    }

    fn put_instant(&self, key: &str, instant: u64) -> Result<(), GameError> {
        let bytes = bincode::serialize(&instant)?;
        self.store.set(key, bytes);
        Ok(())
    }

    fn get_instant(&self, key: &str) -> Result<Option<u64>, GameError> {
        match self.store.get(key) {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}
