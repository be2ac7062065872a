//! Integration tests for the buzzer server components
//!
//! These tests validate cross-component interactions and real network behavior.

use futures_util::{SinkExt, StreamExt};
use server::service::GameService;
use server::store::MemoryStore;
use server::sync::{Reaction, SyncEngine};
use server::utils::epoch_ms;
use shared::{ClientEvent, RaisedHand, ServerEvent, COMMAND_LEAD_MS, HAND_COOLDOWN_MS};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

/// WIRE PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests that events written by a plain JSON client parse into the
    /// protocol types
    #[test]
    fn client_event_from_raw_json() {
        let raw = r#"{"type":"raise_hand","game_id":"g1","player_id":"p1","was_executed_at":3250}"#;
        let event: ClientEvent = serde_json::from_str(raw).unwrap();

        match event {
            ClientEvent::RaiseHand {
                game_id,
                player_id,
                was_executed_at,
            } => {
                assert_eq!(game_id, "g1");
                assert_eq!(player_id, "p1");
                assert_eq!(was_executed_at, 3250);
            }
            _ => panic!("Wrong event type after deserialization"),
        }
    }

    /// Tests server event serialization as seen by clients
    #[test]
    fn server_event_to_raw_json() {
        let event = ServerEvent::RaisedHands {
            hands: vec![
                RaisedHand {
                    player: "B".to_string(),
                    delay_ms: 250,
                },
                RaisedHand {
                    player: "A".to_string(),
                    delay_ms: 400,
                },
            ],
        };

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(json["type"], "raised_hands");
        assert_eq!(json["hands"][0]["player"], "B");
        assert_eq!(json["hands"][1]["delay_ms"], 400);
    }

    /// Tests event roundtrip across every client event variant
    #[test]
    fn client_event_roundtrip() {
        let events = vec![
            ClientEvent::Join {
                game_id: "g".to_string(),
                player_id: "p".to_string(),
            },
            ClientEvent::Leave {
                game_id: "g".to_string(),
                player_id: "p".to_string(),
            },
            ClientEvent::ChangePoints {
                game_id: "g".to_string(),
                host_id: "h".to_string(),
                player_id: "p".to_string(),
                points: -3,
            },
            ClientEvent::ChangeSlide {
                game_id: "g".to_string(),
                player_id: "h".to_string(),
                current_slide: 2,
            },
            ClientEvent::ResetHands {
                game_id: "g".to_string(),
                player_id: "h".to_string(),
            },
            ClientEvent::RaiseHand {
                game_id: "g".to_string(),
                player_id: "p".to_string(),
                was_executed_at: 12,
            },
        ];

        for event in events {
            let serialized = serde_json::to_string(&event).unwrap();
            let deserialized: ClientEvent = serde_json::from_str(&serialized).unwrap();

            match (&event, &deserialized) {
                (ClientEvent::Join { .. }, ClientEvent::Join { .. }) => {}
                (ClientEvent::Leave { .. }, ClientEvent::Leave { .. }) => {}
                (ClientEvent::ChangePoints { .. }, ClientEvent::ChangePoints { .. }) => {}
                (ClientEvent::ChangeSlide { .. }, ClientEvent::ChangeSlide { .. }) => {}
                (ClientEvent::ResetHands { .. }, ClientEvent::ResetHands { .. }) => {}
                (ClientEvent::RaiseHand { .. }, ClientEvent::RaiseHand { .. }) => {}
                _ => panic!("Event type mismatch after roundtrip"),
            }
        }
    }
}

/// SYNCHRONIZATION PROTOCOL TESTS
///
/// Exact-timestamp scenarios for the scheduling and ranking engine.
mod synchronization_tests {
    use super::*;

    fn engine() -> SyncEngine {
        SyncEngine::new(Arc::new(MemoryStore::new()))
    }

    /// Stopwatch origin 1000; A claims 1400, B claims 1250 -> [B:250, A:400]
    #[test]
    fn ranking_orders_by_delay_from_origin() {
        let engine = engine();
        engine.reset_round("g", 1000).unwrap();

        assert_eq!(
            engine.submit_reaction("g", "a", 1400, 1400).unwrap(),
            Reaction::Accepted
        );
        assert_eq!(
            engine.submit_reaction("g", "b", 1250, 1450).unwrap(),
            Reaction::Accepted
        );

        let ranking = engine.ranking("g").unwrap();
        assert_eq!(
            ranking,
            vec![("b".to_string(), 250), ("a".to_string(), 400)]
        );
    }

    /// Host fires at 2000 with the 1250 ms lead: execution instant is 3250,
    /// a claim of 3000 is suppressed, a claim of 3300 ranks with delay 50
    #[test]
    fn fire_schedules_execution_and_gates_claims() {
        let engine = engine();

        let execute_at = engine.fire("g", "host", 2000, 2000).unwrap().unwrap();
        assert_eq!(execute_at, 3250);

        assert_eq!(
            engine.submit_reaction("g", "p", 3000, 3400).unwrap(),
            Reaction::Blocked
        );
        assert_eq!(
            engine.submit_reaction("g", "q", 3300, 3400).unwrap(),
            Reaction::Accepted
        );

        assert_eq!(engine.ranking("g").unwrap(), vec![("q".to_string(), 50)]);
    }

    /// A participant's second reaction within the cooldown is rejected no
    /// matter what instant it claims
    #[test]
    fn cooldown_rejects_resubmission() {
        let engine = engine();
        engine.reset_round("g", 0).unwrap();

        engine.submit_reaction("g", "p", 500, 500).unwrap();

        for claimed in [0, 500, 5000, 500 + HAND_COOLDOWN_MS] {
            assert_eq!(
                engine.submit_reaction("g", "p", claimed, 600).unwrap(),
                Reaction::Blocked,
                "claim {} should be inside the cooldown",
                claimed
            );
        }
    }

    /// The host's own reaction is a fire, never a ranked entry
    #[test]
    fn host_fire_leaves_ledger_empty() {
        let engine = engine();
        engine.reset_round("g", 1000).unwrap();

        let execute_at = engine.fire("g", "host", 5000, 5000).unwrap();
        assert!(execute_at.is_some());
        assert!(engine.ranking("g").unwrap().is_empty());
    }

    /// Re-invoking the ranking with no new reactions returns an identical
    /// sequence
    #[test]
    fn ranking_is_stable() {
        let engine = engine();
        engine.reset_round("g", 100).unwrap();
        engine.submit_reaction("g", "a", 180, 180).unwrap();
        engine.submit_reaction("g", "b", 140, 200).unwrap();
        engine.submit_reaction("g", "c", 180, 220).unwrap();

        let first = engine.ranking("g").unwrap();
        assert_eq!(first, engine.ranking("g").unwrap());
        assert_eq!(first, engine.ranking("g").unwrap());
    }
}

/// GAME FLOW TESTS
///
/// End-to-end flows through the service with room members observing the
/// broadcasts.
mod game_flow_tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn next_event(rx: &mut UnboundedReceiver<Message>) -> ServerEvent {
        match rx.try_recv().expect("expected a broadcast") {
            Message::Text(text) => serde_json::from_str(&text).expect("valid event json"),
            other => panic!("Unexpected message kind: {:?}", other),
        }
    }

    fn drain(rx: &mut UnboundedReceiver<Message>) {
        while rx.try_recv().is_ok() {}
    }

    #[test]
    fn slide_change_resets_round_and_blocks_stale_claims() {
        let mut service = GameService::new(Arc::new(MemoryStore::new()));
        let (game_id, host_id) = service.create_game(5).unwrap();
        let (_, player_id) = service.add_player(&game_id, "Ada").unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        service.on_join(1, &game_id, tx);
        drain(&mut rx);

        service.on_change_slide(&game_id, &host_id, 1).unwrap();

        let execute_at = match next_event(&mut rx) {
            ServerEvent::ChangedSlide {
                current_slide,
                execute_at,
            } => {
                assert_eq!(current_slide, 1);
                execute_at
            }
            other => panic!("Expected changed_slide, got {:?}", other),
        };
        match next_event(&mut rx) {
            ServerEvent::RaisedHands { hands } => assert!(hands.is_empty()),
            other => panic!("Expected raised_hands, got {:?}", other),
        }

        // A reaction claiming to predate the execution instant is silent
        service
            .on_raise_hand(&game_id, &player_id, execute_at - 1)
            .unwrap();
        assert!(rx.try_recv().is_err());

        // One claiming just past it ranks with the delay against the instant
        service
            .on_raise_hand(&game_id, &player_id, execute_at + 40)
            .unwrap();
        match next_event(&mut rx) {
            ServerEvent::RaisedHands { hands } => {
                assert_eq!(hands.len(), 1);
                assert_eq!(hands[0].player, "Ada");
                assert_eq!(hands[0].delay_ms, 40);
            }
            other => panic!("Expected raised_hands, got {:?}", other),
        }
    }

    #[test]
    fn host_fire_flow_broadcasts_instant_and_clears_hands() {
        let mut service = GameService::new(Arc::new(MemoryStore::new()));
        let (game_id, host_id) = service.create_game(1).unwrap();
        let (_, player_id) = service.add_player(&game_id, "Ada").unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        service.on_join(1, &game_id, tx);
        drain(&mut rx);

        // A participant ranks in the current round
        service
            .on_raise_hand(&game_id, &player_id, epoch_ms() + 50)
            .unwrap();
        drain(&mut rx);

        let before = epoch_ms();
        service
            .on_raise_hand(&game_id, &host_id, epoch_ms() + 50)
            .unwrap();

        match next_event(&mut rx) {
            ServerEvent::Fire { execute_at } => {
                assert!(execute_at >= before + COMMAND_LEAD_MS);
            }
            other => panic!("Expected fire, got {:?}", other),
        }
        match next_event(&mut rx) {
            ServerEvent::RaisedHands { hands } => assert!(hands.is_empty()),
            other => panic!("Expected raised_hands, got {:?}", other),
        }
    }

    #[test]
    fn roster_updates_reach_every_member() {
        let mut service = GameService::new(Arc::new(MemoryStore::new()));
        let (game_id, host_id) = service.create_game(1).unwrap();

        let (tx1, mut rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, mut rx2) = tokio::sync::mpsc::unbounded_channel();
        service.on_join(1, &game_id, tx1);
        service.on_join(2, &game_id, tx2);
        drain(&mut rx1);
        drain(&mut rx2);

        let (_, player_id) = service.add_player(&game_id, "Ada").unwrap();
        service
            .on_change_points(&game_id, &host_id, &player_id, 7)
            .unwrap();

        for rx in [&mut rx1, &mut rx2] {
            match next_event(rx) {
                ServerEvent::ChangedPlayers { players } => assert_eq!(players.len(), 1),
                other => panic!("Expected changed_players, got {:?}", other),
            }
            match next_event(rx) {
                ServerEvent::ChangedPlayers { players } => assert_eq!(players[0].points, 7),
                other => panic!("Expected changed_players, got {:?}", other),
            }
        }
    }
}

/// NETWORK TESTS
mod network_tests {
    use super::*;
    use server::network::Server;

    /// Tests a real WebSocket round trip: connect, join a room, observe the
    /// join announcement
    #[tokio::test]
    async fn websocket_join_roundtrip() {
        let mut server = Server::new("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr();
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let url = format!("ws://{}", addr);
        let (mut ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("Failed to connect");

        let join = ClientEvent::Join {
            game_id: "lobby".to_string(),
            player_id: "p1".to_string(),
        };
        ws.send(Message::Text(serde_json::to_string(&join).unwrap()))
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(message) = ws.next().await {
                if let Ok(Message::Text(text)) = message {
                    return serde_json::from_str::<ServerEvent>(&text).ok();
                }
            }
            None
        })
        .await
        .expect("Timed out waiting for broadcast")
        .expect("Connection closed before broadcast");

        match received {
            ServerEvent::Joined { message } => assert!(message.contains("lobby")),
            other => panic!("Expected joined, got {:?}", other),
        }
    }
}
