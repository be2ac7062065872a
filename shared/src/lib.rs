use serde::{Deserialize, Serialize};

/// Delay between broadcasting a host command and the instant clients act on it.
///
/// Commands carry a future execution instant instead of "now": every client
/// waits for the instant locally, so the fairness error is bounded by clock
/// skew plus jitter rather than by one-way network latency.
pub const COMMAND_LEAD_MS: u64 = 1250;

/// Individual cooldown installed after a participant raises their hand.
pub const HAND_COOLDOWN_MS: u64 = 7000;

/// Maximum length of a player display name, in characters.
pub const MAX_NAME_LEN: usize = 20;

/// Events sent by clients into a game room.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join {
        game_id: String,
        player_id: String,
    },
    Leave {
        game_id: String,
        player_id: String,
    },
    ChangePoints {
        game_id: String,
        host_id: String,
        player_id: String,
        points: i64,
    },
    ChangeSlide {
        game_id: String,
        player_id: String,
        current_slide: u32,
    },
    ResetHands {
        game_id: String,
        player_id: String,
    },
    RaiseHand {
        game_id: String,
        player_id: String,
        /// Instant at which the client claims the reaction occurred, in epoch
        /// milliseconds on the server's clock (clients estimate their offset
        /// through the epoch request operation first).
        was_executed_at: u64,
    },
}

/// Events broadcast by the server to every member of a game room.
///
/// Every payload is a full snapshot of the state it describes, never a delta,
/// so out-of-order delivery is self-correcting on the client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Joined {
        message: String,
    },
    Left {
        message: String,
    },
    ChangedPlayers {
        players: Vec<PlayerView>,
    },
    ChangedSlide {
        current_slide: u32,
        execute_at: u64,
    },
    Fire {
        execute_at: u64,
    },
    RaisedHands {
        hands: Vec<RaisedHand>,
    },
}

/// Transport-safe projection of a player.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub points: i64,
}

/// Transport-safe projection of a game session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameView {
    pub id: String,
    pub slide_count: u32,
    pub current_slide: Option<u32>,
    /// Players ordered by id.
    pub players: Vec<PlayerView>,
}

/// One leaderboard entry: who reacted, and how long after the stopwatch
/// origin. Negative delays are possible under clock skew and are reported
/// as-is.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RaisedHand {
    pub player: String,
    pub delay_ms: i64,
}
