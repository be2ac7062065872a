use thiserror::Error;

/// Errors surfaced to callers of the game service.
///
/// Unauthorized, blocked, and out-of-range conditions are deliberately *not*
/// represented here: handlers treat those as silent no-ops so that a
/// misbehaving client never receives a timing oracle. Lookup failures and
/// snapshot corruption are the only visible failures, since they indicate
/// stale or malformed client state rather than a racing condition.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("unknown game {0}")]
    GameNotFound(String),

    #[error("unknown player {0}")]
    PlayerNotFound(String),

    #[error("player name is empty")]
    EmptyName,

    #[error("player name {0:?} is already taken")]
    NameTaken(String),

    #[error("unsupported snapshot version {0}")]
    SnapshotVersion(u16),

    #[error("snapshot codec error: {0}")]
    Snapshot(#[from] bincode::Error),
}
