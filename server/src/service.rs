//! Event dispatch: validates requests against the game aggregate, drives the
//! synchronization engine, and broadcasts full-state snapshots to the room
//!
//! Authorization and blocking failures are deliberately silent no-ops with no
//! broadcast, so a misbehaving client cannot extract a timing oracle from the
//! server's responses. Unknown game or player ids are the only conditions
//! surfaced as errors.

use crate::error::GameError;
use crate::game::{self, Game, Player};
use crate::rooms::{ConnId, EventSender, RoomManager};
use crate::store::{self, Store};
use crate::sync::{Reaction, SyncEngine};
use crate::utils::epoch_ms;
use log::{debug, info};
use shared::{GameView, RaisedHand, ServerEvent};
use std::sync::Arc;
use unidecode::unidecode;

/// Display name assigned to every game's host.
const HOST_NAME: &str = "Host";

/// Single authority over all game state.
///
/// All room events for all games funnel through one owner of this struct, so
/// each fetch-mutate-save below is one atomic step and racing reactions
/// cannot lose updates.
pub struct GameService {
    store: Arc<dyn Store>,
    engine: SyncEngine,
    rooms: RoomManager,
}

impl GameService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let engine = SyncEngine::new(Arc::clone(&store));
        Self {
            store,
            engine,
            rooms: RoomManager::new(),
        }
    }

    // --- Request operations consumed by the HTTP layer ---

    /// Current server time in epoch milliseconds. Exposed so clients can
    /// estimate their clock offset before trusting any execution instant.
    pub fn epoch(&self) -> u64 {
        epoch_ms()
    }

    /// Creates a game with a fresh host and starts its stopwatch.
    /// Returns `(game_id, host_id)`.
    pub fn create_game(&mut self, slide_count: u32) -> Result<(String, String), GameError> {
        let host = Player::new(HOST_NAME);
        let game = Game::new(host, slide_count);

        self.engine.reset_round(&game.id, epoch_ms())?;
        self.save_game(&game)?;

        info!("Created game {} with {} slides", game.id, slide_count);
        Ok((game.id.clone(), game.host.id.clone()))
    }

    /// Adds a participant. Names are trimmed and truncated; empty names and
    /// names that collide case-insensitively after ASCII transliteration with
    /// an existing participant are rejected. Returns `(game_id, player_id)`.
    pub fn add_player(&mut self, game_id: &str, name: &str) -> Result<(String, String), GameError> {
        let player = Player::new(name);
        if player.name.is_empty() {
            return Err(GameError::EmptyName);
        }

        let mut game = self.retrieve_game(game_id)?;

        let folded = unidecode(&player.name).to_lowercase();
        if game
            .players
            .values()
            .any(|p| unidecode(&p.name).to_lowercase() == folded)
        {
            return Err(GameError::NameTaken(player.name));
        }

        info!("New player named {:?} in game {}", player.name, game.id);
        let player_id = player.id.clone();
        game.players.insert(player_id.clone(), player);
        self.save_game(&game)?;

        self.broadcast_players(&game);
        Ok((game.id.clone(), player_id))
    }

    /// Snapshot of a game plus whether the requesting player is its host.
    pub fn game_snapshot(&self, game_id: &str, player_id: &str) -> Result<(GameView, bool), GameError> {
        let game = self.retrieve_game(game_id)?;
        let is_host = game.is_host(player_id);
        Ok((game.to_view(), is_host))
    }

    // --- Room events ---

    pub fn on_join(&mut self, conn_id: ConnId, game_id: &str, sender: EventSender) {
        self.rooms.join(game_id, conn_id, sender);
        self.rooms.broadcast(
            game_id,
            &ServerEvent::Joined {
                message: format!("has entered the room {game_id}."),
            },
        );
    }

    pub fn on_leave(&mut self, conn_id: ConnId, game_id: &str) {
        if self.rooms.leave(game_id, conn_id) {
            self.rooms.broadcast(
                game_id,
                &ServerEvent::Left {
                    message: format!("has left the room {game_id}."),
                },
            );
        }
    }

    pub fn on_disconnect(&mut self, conn_id: ConnId) {
        for game_id in self.rooms.leave_all(conn_id) {
            self.rooms.broadcast(
                &game_id,
                &ServerEvent::Left {
                    message: format!("has left the room {game_id}."),
                },
            );
        }
    }

    /// Host adjusts a participant's points.
    pub fn on_change_points(
        &mut self,
        game_id: &str,
        host_id: &str,
        player_id: &str,
        points: i64,
    ) -> Result<(), GameError> {
        let mut game = self.retrieve_game(game_id)?;
        if !game.is_host(host_id) {
            debug!("Ignoring change_points from non-host {}", host_id);
            return Ok(());
        }

        let player = game
            .players
            .get_mut(player_id)
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
        player.points = points;

        self.save_game(&game)?;
        self.broadcast_players(&game);
        Ok(())
    }

    /// Host advances the presentation. Schedules the shared execution
    /// instant, suppresses reactions until it, and starts a fresh round
    /// anchored at it.
    pub fn on_change_slide(
        &mut self,
        game_id: &str,
        player_id: &str,
        current_slide: u32,
    ) -> Result<(), GameError> {
        let mut game = self.retrieve_game(game_id)?;
        if current_slide >= game.slide_count {
            debug!("Ignoring out-of-range slide {} for game {}", current_slide, game.id);
            return Ok(());
        }
        if !game.is_host(player_id) {
            debug!("Ignoring change_slide from non-host {}", player_id);
            return Ok(());
        }

        info!("Game {} changing slide to {}", game.id, current_slide);
        game.current_slide = Some(current_slide);
        self.save_game(&game)?;

        let execute_at = self.engine.schedule_execution(game_id, epoch_ms())?;
        self.rooms.broadcast(
            game_id,
            &ServerEvent::ChangedSlide {
                current_slide,
                execute_at,
            },
        );

        self.engine.reset_round(game_id, execute_at)?;
        self.broadcast_hands(&game)
    }

    /// Host clears the current round immediately, with no scheduling delay.
    pub fn on_reset_hands(&mut self, game_id: &str, player_id: &str) -> Result<(), GameError> {
        let game = self.retrieve_game(game_id)?;
        if !game.is_host(player_id) {
            debug!("Ignoring reset_hands from non-host {}", player_id);
            return Ok(());
        }

        self.engine.reset_round(game_id, epoch_ms())?;
        self.broadcast_hands(&game)
    }

    /// A raised hand. The host's hand is a "go!" signal, never a ranked
    /// entry; everyone else races onto the leaderboard.
    pub fn on_raise_hand(
        &mut self,
        game_id: &str,
        player_id: &str,
        was_executed_at: u64,
    ) -> Result<(), GameError> {
        let now = epoch_ms();
        let game = self.retrieve_game(game_id)?;

        if game.is_host(player_id) {
            if let Some(execute_at) = self.engine.fire(game_id, player_id, was_executed_at, now)? {
                self.rooms.broadcast(game_id, &ServerEvent::Fire { execute_at });
                self.broadcast_hands(&game)?;
            }
            return Ok(());
        }

        if !game.players.contains_key(player_id) {
            return Err(GameError::PlayerNotFound(player_id.to_string()));
        }

        match self.engine.submit_reaction(game_id, player_id, was_executed_at, now)? {
            // No broadcast: blocked submissions get no observable reply
            Reaction::Blocked => Ok(()),
            verdict => {
                if verdict == Reaction::Accepted {
                    info!("{} raised hand in game {}", player_id, game.id);
                }
                self.broadcast_hands(&game)
            }
        }
    }

    // --- Shared projections ---

    fn broadcast_players(&mut self, game: &Game) {
        let players = game.sorted_players().iter().map(|p| p.to_view()).collect();
        self.rooms
            .broadcast(&game.id, &ServerEvent::ChangedPlayers { players });
    }

    fn broadcast_hands(&mut self, game: &Game) -> Result<(), GameError> {
        let hands: Vec<RaisedHand> = self
            .engine
            .ranking(&game.id)?
            .into_iter()
            .filter_map(|(participant_id, delay_ms)| {
                game.players.get(&participant_id).map(|p| RaisedHand {
                    player: p.name.clone(),
                    delay_ms,
                })
            })
            .collect();

        self.rooms
            .broadcast(&game.id, &ServerEvent::RaisedHands { hands });
        Ok(())
    }

    fn retrieve_game(&self, game_id: &str) -> Result<Game, GameError> {
        let bytes = self
            .store
            .get(&store::game_key(game_id))
            .ok_or_else(|| GameError::GameNotFound(game_id.to_string()))?;
        game::decode_snapshot(&bytes)
    }

    fn save_game(&self, game: &Game) -> Result<(), GameError> {
        let bytes = game::encode_snapshot(game)?;
        self.store.set(&store::game_key(&game.id), bytes);
        Ok(())
    }
}
