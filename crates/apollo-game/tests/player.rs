//! Integration tests for the player actor over a mock connection.

mod support;

use apollo_game::{
    GameHandle, GameType, PlayerConfig, PlayerHandle, PlayerMailbox, spawn_game, spawn_world,
};
use apollo_protocol::{EntityId, EntityState, GameId, GameUpdate, PlayerId};
use apollo_transport::Connection;
use serde_json::Value;

use support::{busy_game, eventually, player, quiet_game, world_config};

fn select_frame(entity: u64) -> Vec<u8> {
    format!(r#"{{"ReqId":"1","Act":{{"W":null,"G":{{"C":0,"E":{entity}}}}}}}"#).into_bytes()
}

fn entity_with_state(update: &Value, state: i64) -> Option<u64> {
    update["Es"]
        .as_array()?
        .iter()
        .find(|e| e["St"] == state)
        .and_then(|e| e["Id"].as_u64())
}

#[tokio::test(start_paused = true)]
async fn test_select_round_trip() {
    let world = spawn_world(world_config(busy_game()));
    let (p1, conn, mut peer) = player(1, &world);
    world.register(p1, None).await.unwrap();

    let added = peer.next_matching(|u| entity_with_state(u, 0).is_some()).await;
    let entity = entity_with_state(&added, 0).unwrap();

    conn.push(&select_frame(entity)).await;

    let update = peer
        .next_matching(|u| {
            u["Es"]
                .as_array()
                .is_some_and(|es| es.iter().any(|e| e["Id"] == entity && e["St"] == 2))
        })
        .await;
    assert_eq!(update["Ps"][0]["Id"], 1);
    assert_eq!(update["Ps"][0]["St"], 2);
}

#[tokio::test]
async fn test_undecodable_frames_are_dropped() {
    let world = spawn_world(world_config(quiet_game()));
    let (p1, conn, mut peer) = player(1, &world);
    world.register(p1, None).await.unwrap();
    peer.next_json().await;
    peer.next_json().await;

    conn.push(b"not json").await;
    conn.push(br#"{"ReqId":"2","Act":{"G":{"C":99,"E":1}}}"#).await;
    conn.push(&select_frame(12345)).await;
    conn.push(br#"{"ReqId":"3","Act":{"W":{}}}"#).await;

    // Still registered, still open, and nothing was sent back.
    assert_eq!(world.info().await.unwrap().players, 1);
    assert!(!conn.is_closed());
    assert!(peer.sent.try_recv().is_err());
}

#[tokio::test]
async fn test_reader_closing_unregisters_player() {
    let world = spawn_world(world_config(quiet_game()));
    let (p1, conn, _peer) = player(1, &world);
    world.register(p1, None).await.unwrap();

    // What the read pump does when the socket goes away.
    conn.close();

    eventually(async || world.info().await.unwrap().players == 0).await;
}

#[tokio::test]
async fn test_world_unregister_closes_connection() {
    let world = spawn_world(world_config(quiet_game()));
    let (p1, conn, _peer) = player(7, &world);
    world.register(p1, None).await.unwrap();

    world.unregister(PlayerId(7)).await;
    eventually(async || conn.is_closed()).await;
}

/// A member that only watches a game's broadcasts.
async fn observe(game: &GameHandle, id: u64) -> PlayerMailbox {
    let config = PlayerConfig {
        outbound_capacity: 1024,
        ..PlayerConfig::default()
    };
    let (handle, mailbox) = PlayerHandle::channel(PlayerId(id), &config);
    game.join(handle).await.unwrap();
    mailbox
}

async fn next_added(mailbox: &mut PlayerMailbox) -> EntityId {
    loop {
        let update = mailbox.outbound.recv().await.expect("game alive");
        if let Some(e) = update.entities.iter().find(|e| e.state == EntityState::Added) {
            return e.id;
        }
    }
}

fn selects(update: &GameUpdate, entity: EntityId) -> bool {
    update
        .entities
        .iter()
        .any(|e| e.id == entity && e.state == EntityState::Selected)
}

#[tokio::test(start_paused = true)]
async fn test_frame_queued_before_bind_reaches_game() {
    for round in 0..8u64 {
        let world = spawn_world(world_config(busy_game()));
        let (first, _c1, mut peer) = player(1, &world);
        world.register(first, None).await.unwrap();
        let added = peer.next_matching(|u| entity_with_state(u, 0).is_some()).await;
        let entity = entity_with_state(&added, 0).unwrap();

        // The frame is already waiting when the player starts.
        let (second, conn, _peer2) = player(2, &world);
        conn.push(&select_frame(entity)).await;
        world.register(second, None).await.unwrap();

        let update = peer
            .next_matching(|u| {
                u["Es"]
                    .as_array()
                    .is_some_and(|es| es.iter().any(|e| e["Id"] == entity && e["St"] == 2))
            })
            .await;
        assert_eq!(update["Ps"][0]["Id"], 2, "round {round}");
        world.shutdown().await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_rebind_moves_actions_to_new_game() {
    let world = spawn_world(world_config(quiet_game()));
    let (player, conn, _peer) = player(1, &world);
    let handle = player.handle();

    let old = spawn_game(GameId(1), GameType::MOBILE_SMALL, busy_game());
    let new = spawn_game(GameId(2), GameType::MOBILE_SMALL, busy_game());
    let mut old_watch = observe(&old, 100).await;
    let mut new_watch = observe(&new, 200).await;
    old.join(handle.clone()).await.unwrap();
    new.join(handle.clone()).await.unwrap();

    tokio::spawn(player.run());
    assert!(handle.bind(old.clone()).await);

    // Both boards spawn from the same seed, so the same id exists in each.
    let in_old = next_added(&mut old_watch).await;
    let in_new = next_added(&mut new_watch).await;
    assert_eq!(in_old, in_new);

    assert!(handle.bind(new.clone()).await);
    conn.push(&select_frame(in_new.0)).await;

    loop {
        let update = new_watch.outbound.recv().await.expect("game alive");
        if selects(&update, in_new) {
            assert_eq!(update.players[0].id, PlayerId(1));
            break;
        }
    }

    // A round trip through the old game's inbox, then nothing selected there.
    old.info().await.unwrap();
    while let Ok(update) = old_watch.outbound.try_recv() {
        assert!(!selects(&update, in_old), "old game saw the action");
    }
}
