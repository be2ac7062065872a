//! Room membership and fire-and-forget broadcasting
//!
//! Rooms are named by game id. Broadcasting serializes an event once and
//! pushes it to every member's outgoing queue: at-most-once delivery, no
//! ordering guarantee across members, no replay for members that join later.

use log::warn;
use shared::ServerEvent;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Connection identifier assigned by the accept loop.
pub type ConnId = u64;

/// Outgoing queue of a single connection.
pub type EventSender = mpsc::UnboundedSender<Message>;

/// Tracks which connections are members of which rooms.
#[derive(Default)]
pub struct RoomManager {
    rooms: HashMap<String, HashMap<ConnId, EventSender>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, room: &str, conn_id: ConnId, sender: EventSender) {
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn_id, sender);
    }

    /// Removes a connection from a room. Returns whether it was a member.
    pub fn leave(&mut self, room: &str, conn_id: ConnId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&conn_id).is_some();
        if members.is_empty() {
            self.rooms.remove(room);
        }
        removed
    }

    /// Removes a connection from every room it joined, returning the rooms
    /// it left. Used on disconnect.
    pub fn leave_all(&mut self, conn_id: ConnId) -> Vec<String> {
        let rooms: Vec<String> = self
            .rooms
            .iter()
            .filter(|(_, members)| members.contains_key(&conn_id))
            .map(|(room, _)| room.clone())
            .collect();
        for room in &rooms {
            self.leave(room, conn_id);
        }
        rooms
    }

    /// Sends an event to every current member of a room.
    ///
    /// Send failures mean the connection is gone; the reader side will report
    /// the disconnect, so failures are only logged here.
    pub fn broadcast(&self, room: &str, event: &ServerEvent) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };

        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize event for room {}: {}", room, e);
                return;
            }
        };

        for (conn_id, sender) in members {
            if sender.send(Message::Text(payload.clone())).is_err() {
                warn!("Failed to send to connection {} in room {}", conn_id, room);
            }
        }
    }

    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, |members| members.len())
    }
}
