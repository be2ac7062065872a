//! # Buzzer Server Library
//!
//! This library provides the authoritative server for a live, multi-participant
//! buzzer layered on a shared slide presentation. One host drives slide
//! advancement; every other participant races to raise a hand after each slide
//! change, and the server produces a fair, clock-skew-tolerant ranking of
//! reaction times.
//!
//! ## Core Responsibilities
//!
//! ### Command Scheduling
//! Host commands (slide changes, "go!" signals) are broadcast with a *future*
//! execution instant rather than taking effect immediately. Every client waits
//! for the instant on its own clock, so the fairness error between
//! participants is bounded by clock skew plus jitter instead of by one-way
//! network latency.
//!
//! ### Blocking Windows
//! Two suppression mechanisms keep the leaderboard honest: a short game-wide
//! window after every slide change or fire (no reaction may claim to predate
//! the execution instant), and a per-participant cooldown after each raised
//! hand (no accidental double-triggers). Both are lazy timestamp comparisons;
//! no server-side timer ever fires.
//!
//! ### Reaction Ranking
//! Accepted reactions are ranked by their delay against the round's stopwatch
//! origin, first claim per participant wins, and every broadcast carries the
//! full current leaderboard so out-of-order delivery self-corrects.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All room events from all connections are funneled through one channel and
//! processed sequentially. This makes each game's read-modify-write steps
//! atomic without locks and keeps ranking behavior deterministic when two
//! reactions race.
//!
//! ### State Store Seam
//! Every piece of per-game state (serialized aggregates, stopwatch origins,
//! blocking windows, the raised-hand ledger) is addressed through the
//! [`store::Store`] trait per request. Nothing lives in process-wide
//! singletons, so a networked key-value store can replace the in-process one
//! without touching the engine.
//!
//! ## Module Organization
//!
//! - [`store`]: state store seam and the in-process implementation
//! - [`game`]: game/player aggregates and versioned snapshots
//! - [`sync`]: the synchronization engine (scheduling, windows, ranking)
//! - [`rooms`]: room membership and fire-and-forget broadcasting
//! - [`service`]: event dispatch and the request operations
//! - [`network`]: WebSocket transport and the main event loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080").await?;
//!
//!     // Create a game before the room loop takes over the service
//!     let (game_id, host_id) = server.service_mut().create_game(12)?;
//!     println!("game {} host {}", game_id, host_id);
//!
//!     // Accept WebSocket connections and process room events until shutdown
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod game;
pub mod network;
pub mod rooms;
pub mod service;
pub mod store;
pub mod sync;
pub mod utils;
