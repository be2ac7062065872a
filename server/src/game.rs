use crate::error::GameError;
use serde::{Deserialize, Serialize};
use shared::{GameView, PlayerView, MAX_NAME_LEN};
use std::collections::HashMap;
use uuid::Uuid;

/// Version tag written into every serialized game snapshot.
pub const SNAPSHOT_VERSION: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub points: i64,
}

impl Player {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().chars().take(MAX_NAME_LEN).collect(),
            points: 0,
        }
    }

    pub fn to_view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            name: self.name.clone(),
            points: self.points,
        }
    }
}

// Equality by id only
impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub host: Player,
    /// Participants keyed by id. The host is tracked separately and never
    /// appears here.
    pub players: HashMap<String, Player>,
    pub current_slide: Option<u32>,
    pub slide_count: u32,
}

impl Game {
    pub fn new(host: Player, slide_count: u32) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            host,
            players: HashMap::new(),
            current_slide: if slide_count > 0 { Some(0) } else { None },
            slide_count,
        }
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.host.id == player_id
    }

    /// Participants ordered by id, for deterministic broadcast payloads.
    pub fn sorted_players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        players
    }

    pub fn to_view(&self) -> GameView {
        GameView {
            id: self.id.clone(),
            slide_count: self.slide_count,
            current_slide: self.current_slide,
            players: self.sorted_players().iter().map(|p| p.to_view()).collect(),
        }
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u16,
    game: &'a Game,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u16,
    game: Game,
}

/// Serializes a game into its versioned snapshot envelope.
pub fn encode_snapshot(game: &Game) -> Result<Vec<u8>, GameError> {
    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        game,
    };
    Ok(bincode::serialize(&snapshot)?)
}

/// Decodes a snapshot envelope, rejecting unknown versions.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Game, GameError> {
    let snapshot: Snapshot = bincode::deserialize(bytes)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(GameError::SnapshotVersion(snapshot.version));
    }
    Ok(snapshot.game)
}
