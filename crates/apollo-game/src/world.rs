//! World actor: admits players, places them in games, and keeps the
//! registry of who is where.
//!
//! The world runs no simulation. It owns the pool of game actors and a
//! ledger of registered players, and only ever talks to them through
//! their handles.

use std::collections::{BTreeMap, HashMap};

use apollo_protocol::{GameId, PlayerId};
use apollo_transport::Connection;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::game::spawn_game;
use crate::{
    GameError, GameHandle, GameType, Player, PlayerAction, PlayerHandle, WorldConfig, WorldError,
};

/// Commands sent to the world actor.
enum WorldRequest {
    Register {
        player: PlayerHandle,
        task: BoxFuture<'static, ()>,
        game_type: Option<GameType>,
        reply: oneshot::Sender<Result<GameId, WorldError>>,
    },
    Unregister {
        player: PlayerId,
        reply: Option<oneshot::Sender<()>>,
    },
    Action(PlayerAction),
    Info {
        reply: oneshot::Sender<WorldInfo>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Counts of what the world is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldInfo {
    pub games: usize,
    pub players: usize,
}

// ---------------------------------------------------------------------------
// WorldHandle
// ---------------------------------------------------------------------------

/// Handle to the world actor. Cheap to clone; one is passed to every
/// connection handler and every player.
#[derive(Clone)]
pub struct WorldHandle {
    sender: mpsc::Sender<WorldRequest>,
}

impl WorldHandle {
    /// Places `player` in a game of `game_type` (the world's default when
    /// `None`) and starts its event loop.
    ///
    /// On failure the player is disconnected and never started.
    pub async fn register<C: Connection>(
        &self,
        player: Player<C>,
        game_type: Option<GameType>,
    ) -> Result<GameId, WorldError> {
        let handle = player.handle();
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(WorldRequest::Register {
                player: handle,
                task: player.run().boxed(),
                game_type,
                reply,
            })
            .await
            .map_err(|_| WorldError::Unavailable)?;
        rx.await.map_err(|_| WorldError::Unavailable)?
    }

    /// Removes a player from its game and the registry, and disconnects
    /// it. Unknown players are ignored, so calling this twice is harmless.
    pub async fn unregister(&self, player: PlayerId) {
        let (reply, rx) = oneshot::channel();
        let request = WorldRequest::Unregister {
            player,
            reply: Some(reply),
        };
        if self.sender.send(request).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Like [`unregister`](Self::unregister), but returns at once. Usable
    /// from `Drop`.
    pub fn unregister_detached(&self, player: PlayerId) {
        let request = WorldRequest::Unregister {
            player,
            reply: None,
        };
        match self.sender.try_send(request) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(request)) => {
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    let _ = sender.send(request).await;
                });
            }
        }
    }

    /// Delivers a world-scoped action.
    pub async fn action(&self, action: PlayerAction) -> Result<(), WorldError> {
        self.sender
            .send(WorldRequest::Action(action))
            .await
            .map_err(|_| WorldError::Unavailable)
    }

    pub async fn info(&self) -> Result<WorldInfo, WorldError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(WorldRequest::Info { reply })
            .await
            .map_err(|_| WorldError::Unavailable)?;
        rx.await.map_err(|_| WorldError::Unavailable)
    }

    /// Disconnects every player, stops every game, and stops the world.
    /// Returns once that is done.
    pub async fn shutdown(&self) -> Result<(), WorldError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(WorldRequest::Shutdown { reply })
            .await
            .map_err(|_| WorldError::Unavailable)?;
        rx.await.map_err(|_| WorldError::Unavailable)
    }
}

/// Spawns the world actor and returns a handle to it.
pub fn spawn_world(config: WorldConfig) -> WorldHandle {
    let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
    let world = World {
        config,
        games: BTreeMap::new(),
        players: HashMap::new(),
        next_game_id: 1,
    };
    tokio::spawn(world.run(inbox));
    WorldHandle { sender }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

struct Registration {
    handle: PlayerHandle,
    game_id: GameId,
}

struct World {
    config: WorldConfig,
    /// Ordered by id so placement fills the oldest game first.
    games: BTreeMap<GameId, GameHandle>,
    players: HashMap<PlayerId, Registration>,
    next_game_id: u64,
}

impl World {
    async fn run(mut self, mut inbox: mpsc::Receiver<WorldRequest>) {
        info!("world started");

        while let Some(request) = inbox.recv().await {
            match request {
                WorldRequest::Register {
                    player,
                    task,
                    game_type,
                    reply,
                } => {
                    let result = self.register(player, task, game_type).await;
                    let _ = reply.send(result);
                }
                WorldRequest::Unregister { player, reply } => {
                    self.unregister(player).await;
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                }
                WorldRequest::Action(action) => {
                    debug!(
                        player_id = %action.player,
                        req_id = %action.req_id,
                        "world action ignored"
                    );
                }
                WorldRequest::Info { reply } => {
                    let _ = reply.send(WorldInfo {
                        games: self.games.len(),
                        players: self.players.len(),
                    });
                }
                WorldRequest::Shutdown { reply } => {
                    self.shutdown().await;
                    let _ = reply.send(());
                    break;
                }
            }
        }

        info!("world stopped");
    }

    async fn register(
        &mut self,
        player: PlayerHandle,
        task: BoxFuture<'static, ()>,
        game_type: Option<GameType>,
    ) -> Result<GameId, WorldError> {
        let player_id = player.id();
        if self.players.contains_key(&player_id) {
            player.disconnect();
            return Err(WorldError::AlreadyRegistered(player_id));
        }
        let game_type = game_type.unwrap_or(self.config.default_game_type);

        let game = match self.place(&player, game_type).await {
            Ok(game) => game,
            Err(e) => {
                warn!(%player_id, error = %e, "registration failed");
                player.disconnect();
                return Err(e);
            }
        };

        let game_id = game.game_id();
        if !player.bind(game.clone()).await {
            // The player is already gone; undo the join.
            let _ = game.leave(player_id).await;
            return Err(WorldError::Placement(GameError::Delivery(player_id)));
        }

        self.players.insert(
            player_id,
            Registration {
                handle: player,
                game_id,
            },
        );
        tokio::spawn(task);
        info!(%player_id, %game_id, players = self.players.len(), "player registered");
        Ok(game_id)
    }

    /// Joins the first game of `game_type` with room, or a new one.
    async fn place(
        &mut self,
        player: &PlayerHandle,
        game_type: GameType,
    ) -> Result<GameHandle, WorldError> {
        let candidates: Vec<GameHandle> = self
            .games
            .values()
            .filter(|g| g.game_type() == game_type)
            .cloned()
            .collect();

        for game in candidates {
            let info = match game.info().await {
                Ok(info) => info,
                Err(_) => {
                    warn!(game_id = %game.game_id(), "dropping dead game");
                    self.games.remove(&game.game_id());
                    continue;
                }
            };
            if info.player_count >= game_type.players as usize {
                continue;
            }
            match game.join(player.clone()).await {
                Ok(()) => return Ok(game),
                Err(GameError::Full(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let game = self.create_game(game_type);
        game.join(player.clone()).await?;
        Ok(game)
    }

    fn create_game(&mut self, game_type: GameType) -> GameHandle {
        let game_id = GameId(self.next_game_id);
        self.next_game_id += 1;
        let game = spawn_game(game_id, game_type, self.config.game.clone());
        self.games.insert(game_id, game.clone());
        info!(%game_id, %game_type, games = self.games.len(), "game created");
        game
    }

    async fn unregister(&mut self, player_id: PlayerId) {
        let Some(registration) = self.players.remove(&player_id) else {
            return;
        };

        if let Some(game) = self.games.get(&registration.game_id) {
            match game.leave(player_id).await {
                Ok(()) => {}
                Err(GameError::NotMember(..)) => {
                    debug!(%player_id, "already removed by its game");
                }
                Err(e) => debug!(%player_id, error = %e, "leave failed"),
            }
        }
        registration.handle.disconnect();
        info!(%player_id, players = self.players.len(), "player unregistered");
    }

    async fn shutdown(&mut self) {
        info!(
            games = self.games.len(),
            players = self.players.len(),
            "world shutting down"
        );
        for (_, registration) in self.players.drain() {
            registration.handle.disconnect();
        }
        for (_, game) in std::mem::take(&mut self.games) {
            let _ = game.shutdown().await;
        }
    }
}
