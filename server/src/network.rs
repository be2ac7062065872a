//! Server network layer handling WebSocket connections and event loop coordination

use crate::rooms::{ConnId, EventSender};
use crate::service::GameService;
use crate::store::MemoryStore;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::ClientEvent;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        conn_id: ConnId,
        sender: EventSender,
    },
    EventReceived {
        conn_id: ConnId,
        event: ClientEvent,
    },
    Disconnected {
        conn_id: ConnId,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Main server coordinating the WebSocket transport and event dispatch
///
/// Every room event from every connection funnels through one unbounded
/// channel into a single-threaded loop. Processing events sequentially gives
/// each game's read-modify-write steps atomicity without locking, and keeps
/// behavior deterministic when two reactions race.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: std::net::SocketAddr,
    service: GameService,
    connections: std::collections::HashMap<ConnId, EventSender>,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            service: GameService::new(Arc::new(MemoryStore::new())),
            connections: std::collections::HashMap::new(),
            server_tx,
            server_rx,
        })
    }

    /// Address the server actually bound, useful when the port was 0.
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// The request operations (game creation, joins over HTTP, snapshots)
    /// are served before the room loop starts owning the service.
    pub fn service_mut(&mut self) -> &mut GameService {
        &mut self.service
    }

    /// Spawns the task that accepts connections and hands each one its own
    /// reader/writer tasks
    fn spawn_acceptor(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut next_conn_id: ConnId = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let conn_id = next_conn_id;
                        next_conn_id += 1;
                        debug!("Connection {} from {}", conn_id, addr);

                        let server_tx = server_tx.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, conn_id, server_tx).await;
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Routes one parsed client event into the service.
    ///
    /// Lookup failures are logged and answered with silence; the offending
    /// client is working from stale state and the next full-snapshot
    /// broadcast corrects everyone else.
    fn handle_event(&mut self, conn_id: ConnId, event: ClientEvent) {
        let result = match event {
            ClientEvent::Join { game_id, .. } => {
                if let Some(sender) = self.connections.get(&conn_id) {
                    let sender = sender.clone();
                    self.service.on_join(conn_id, &game_id, sender);
                }
                Ok(())
            }
            ClientEvent::Leave { game_id, .. } => {
                self.service.on_leave(conn_id, &game_id);
                Ok(())
            }
            ClientEvent::ChangePoints {
                game_id,
                host_id,
                player_id,
                points,
            } => self
                .service
                .on_change_points(&game_id, &host_id, &player_id, points),
            ClientEvent::ChangeSlide {
                game_id,
                player_id,
                current_slide,
            } => self
                .service
                .on_change_slide(&game_id, &player_id, current_slide),
            ClientEvent::ResetHands { game_id, player_id } => {
                self.service.on_reset_hands(&game_id, &player_id)
            }
            ClientEvent::RaiseHand {
                game_id,
                player_id,
                was_executed_at,
            } => self
                .service
                .on_raise_hand(&game_id, &player_id, was_executed_at),
        };

        if let Err(e) = result {
            warn!("Rejected event from connection {}: {}", conn_id, e);
        }
    }

    /// Main server loop processing all connection and room events
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_acceptor();
        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::Connected { conn_id, sender } => {
                    self.connections.insert(conn_id, sender);
                }
                ServerMessage::EventReceived { conn_id, event } => {
                    self.handle_event(conn_id, event);
                }
                ServerMessage::Disconnected { conn_id } => {
                    self.connections.remove(&conn_id);
                    self.service.on_disconnect(conn_id);
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Per-connection lifecycle: WebSocket upgrade, a writer task draining the
/// connection's outgoing queue, and a read loop feeding the main loop.
async fn handle_connection(
    stream: TcpStream,
    conn_id: ConnId,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for connection {}: {}", conn_id, e);
            return;
        }
    };
    let (mut sink, mut ws_stream) = ws.split();

    let (sender, mut outgoing) = mpsc::unbounded_channel::<Message>();
    if server_tx
        .send(ServerMessage::Connected { conn_id, sender })
        .is_err()
    {
        return;
    }

    let writer = tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = ws_stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if server_tx
                        .send(ServerMessage::EventReceived { conn_id, event })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse event from connection {}: {}", conn_id, e);
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Connection {} read error: {}", conn_id, e);
                break;
            }
        }
    }

    let _ = server_tx.send(ServerMessage::Disconnected { conn_id });
    writer.abort();
}
