//! Integration tests for the game actor, driven through its handle.

mod support;

use std::time::Duration;

use apollo_game::{
    GameAction, GameError, GameState, GameType, PlayerConfig, PlayerControl, PlayerHandle,
    spawn_game,
};
use apollo_protocol::{EntityState, GameCommand, GameId, PlayerId};

use support::{busy_game, quiet_game};

fn player(id: u64) -> (PlayerHandle, apollo_game::PlayerMailbox) {
    let config = PlayerConfig {
        outbound_capacity: 256,
        ..PlayerConfig::default()
    };
    PlayerHandle::channel(PlayerId(id), &config)
}

#[tokio::test(start_paused = true)]
async fn test_join_starts_and_last_leave_stops() {
    let game = spawn_game(GameId(1), GameType::MOBILE_SMALL, quiet_game());
    assert_eq!(game.info().await.unwrap().state, GameState::Stopped);

    let (p1, _m1) = player(1);
    game.join(p1).await.unwrap();
    let info = game.info().await.unwrap();
    assert_eq!(info.state, GameState::Running);
    assert_eq!(info.player_count, 1);
    assert_eq!(info.game_type, GameType::MOBILE_SMALL);

    game.leave(PlayerId(1)).await.unwrap();
    let info = game.info().await.unwrap();
    assert_eq!(info.state, GameState::Stopped);
    assert_eq!(info.player_count, 0);

    assert_eq!(
        game.leave(PlayerId(1)).await,
        Err(GameError::NotMember(PlayerId(1), GameId(1)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_ticks_fire_on_period_even_when_stopped() {
    let game = spawn_game(GameId(1), GameType::MOBILE_SMALL, quiet_game());
    tokio::time::sleep(Duration::from_millis(1_010)).await;
    let info = game.info().await.unwrap();
    assert_eq!(info.ticks, 4);
    assert_eq!(info.state, GameState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn test_spawns_are_broadcast_then_selectable() {
    let game = spawn_game(GameId(1), GameType::MOBILE_SMALL, busy_game());
    let (p1, mut m1) = player(1);
    game.join(p1).await.unwrap();

    let sync = m1.outbound.recv().await.unwrap();
    assert!(sync.game_type.is_some());
    assert!(sync.entities.is_empty());

    let spawned = loop {
        let update = m1.outbound.recv().await.unwrap();
        if let Some(e) = update.entities.iter().find(|e| e.state == EntityState::Added) {
            break e.id;
        }
    };

    game.action(
        PlayerId(1),
        GameAction {
            command: GameCommand::SelectEntity,
            entity: spawned,
        },
    )
    .await
    .unwrap();

    let selected = loop {
        let update = m1.outbound.recv().await.unwrap();
        if let Some(e) = update.entities.iter().find(|e| e.id == spawned) {
            break (e.state, update.players.clone());
        }
    };
    assert_eq!(selected.0, EntityState::Selected);
    assert_eq!(selected.1[0].id, PlayerId(1));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_disconnects_members() {
    let game = spawn_game(GameId(4), GameType::MOBILE_SMALL, quiet_game());
    let (p1, mut m1) = player(1);
    game.join(p1).await.unwrap();

    game.shutdown().await.unwrap();
    let control = m1.control.recv().await;
    assert!(matches!(control, Some(PlayerControl::Disconnect)));

    support::eventually(async || game.info().await.is_err()).await;
    assert_eq!(game.info().await, Err(GameError::Unavailable(GameId(4))));
}
