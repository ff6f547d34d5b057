//! Game actor: one match, run as an isolated Tokio task.
//!
//! The task owns the board, the simulation, and every member's
//! [`GamePlayerInfo`]. Joins, leaves, actions, and ticks arrive one at a
//! time through a single `select!` loop and each handler runs to
//! completion, so nothing here needs a lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;

use apollo_board::{Board, Entity, Simulation};
use apollo_protocol::{EntityId, EntityState, GameCommand, GameId, GameUpdate, PlayerId, PlayerState};
use apollo_tick::{GameTick, TickConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{GameAction, GameConfig, GameError, GamePlayerInfo, GameState, GameType, PlayerHandle};

/// Commands sent to a game actor through its channel.
pub(crate) enum GameRequest {
    Join {
        player: PlayerHandle,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Leave {
        player: PlayerId,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Action {
        player: PlayerId,
        action: GameAction,
    },
    Info {
        reply: oneshot::Sender<GameInfo>,
    },
    Shutdown,
}

/// A snapshot of game metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub game_id: GameId,
    pub game_type: GameType,
    pub state: GameState,
    pub player_count: usize,
    /// Ticks fired since the actor started, running or not.
    pub ticks: u64,
}

// ---------------------------------------------------------------------------
// GameHandle
// ---------------------------------------------------------------------------

/// Handle to a running game actor.
///
/// Cheap to clone. The world keeps one per game and each bound player
/// keeps one to forward its actions.
#[derive(Debug, Clone)]
pub struct GameHandle {
    game_id: GameId,
    game_type: GameType,
    sender: mpsc::Sender<GameRequest>,
}

impl GameHandle {
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    /// Adds a player. On success the player has already been sent the
    /// full game state and every member has been told about them.
    pub async fn join(&self, player: PlayerHandle) -> Result<(), GameError> {
        let (reply, rx) = oneshot::channel();
        self.request(GameRequest::Join { player, reply }).await?;
        rx.await.map_err(|_| GameError::Unavailable(self.game_id))?
    }

    /// Removes a player, releasing everything they held.
    pub async fn leave(&self, player: PlayerId) -> Result<(), GameError> {
        let (reply, rx) = oneshot::channel();
        self.request(GameRequest::Leave { player, reply }).await?;
        rx.await.map_err(|_| GameError::Unavailable(self.game_id))?
    }

    /// Forwards a player's action (fire-and-forget).
    pub async fn action(&self, player: PlayerId, action: GameAction) -> Result<(), GameError> {
        self.request(GameRequest::Action { player, action }).await
    }

    pub async fn info(&self) -> Result<GameInfo, GameError> {
        let (reply, rx) = oneshot::channel();
        self.request(GameRequest::Info { reply }).await?;
        rx.await.map_err(|_| GameError::Unavailable(self.game_id))
    }

    /// Stops the actor. Remaining members are told to disconnect.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.request(GameRequest::Shutdown).await
    }

    async fn request(&self, request: GameRequest) -> Result<(), GameError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| GameError::Unavailable(self.game_id))
    }
}

/// Spawns a game actor task and returns a handle to it.
///
/// The game starts `Stopped`; the board is allocated on the first join.
pub fn spawn_game(game_id: GameId, game_type: GameType, config: GameConfig) -> GameHandle {
    let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
    let game = Game::new(game_id, game_type, config);
    tokio::spawn(game.run(inbox));
    GameHandle {
        game_id,
        game_type,
        sender,
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

struct Member {
    handle: PlayerHandle,
    info: GamePlayerInfo,
}

/// Exists only while the game is running.
struct Arena {
    board: Board,
    sim: Simulation,
}

/// The state of one match. Driven by [`Game::run`].
pub(crate) struct Game {
    id: GameId,
    game_type: GameType,
    config: GameConfig,
    state: GameState,
    arena: Option<Arena>,
    members: BTreeMap<PlayerId, Member>,
    /// Players whose delivery failed during the current handler.
    pending_removals: Vec<PlayerId>,
    ticks: u64,
}

impl Game {
    pub(crate) fn new(id: GameId, game_type: GameType, config: GameConfig) -> Self {
        Self {
            id,
            game_type,
            config,
            state: GameState::Stopped,
            arena: None,
            members: BTreeMap::new(),
            pending_removals: Vec::new(),
            ticks: 0,
        }
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<GameRequest>) {
        info!(game_id = %self.id, game_type = %self.game_type, "game actor started");
        let mut tick = GameTick::new(TickConfig::with_period(self.config.tick_period));

        loop {
            tokio::select! {
                request = inbox.recv() => match request {
                    Some(GameRequest::Shutdown) | None => break,
                    Some(request) => self.handle(request),
                },
                info = tick.wait() => {
                    if info.skipped > 0 {
                        warn!(
                            game_id = %self.id,
                            tick = info.tick,
                            skipped = info.skipped,
                            "game fell behind, skipping ticks"
                        );
                    }
                    self.on_tick(SystemTime::now());
                    tick.record_end();
                }
            }
        }

        self.shutdown();
        info!(
            game_id = %self.id,
            ticks = self.ticks,
            late_ticks = tick.metrics().total_late,
            "game actor stopped"
        );
    }

    fn handle(&mut self, request: GameRequest) {
        match request {
            GameRequest::Join { player, reply } => {
                let _ = reply.send(self.on_join(player));
            }
            GameRequest::Leave { player, reply } => {
                let _ = reply.send(self.on_leave(player));
            }
            GameRequest::Action { player, action } => self.on_action(player, action),
            GameRequest::Info { reply } => {
                let _ = reply.send(self.info());
            }
            GameRequest::Shutdown => {}
        }
    }

    fn info(&self) -> GameInfo {
        GameInfo {
            game_id: self.id,
            game_type: self.game_type,
            state: self.state,
            player_count: self.members.len(),
            ticks: self.ticks,
        }
    }

    // -- lifecycle ----------------------------------------------------------

    fn start(&mut self) {
        let sim_config = self.config.simulation.clone();
        let sim = match self.config.seed {
            Some(seed) => Simulation::seeded(sim_config, seed),
            None => Simulation::new(sim_config),
        };
        self.arena = Some(Arena {
            board: Board::new(self.game_type.rows, self.game_type.cols),
            sim,
        });
        self.state = GameState::Running;
        info!(game_id = %self.id, "game started");
    }

    fn stop(&mut self) {
        self.arena = None;
        self.state = GameState::Stopped;
        info!(game_id = %self.id, "game stopped");
    }

    fn shutdown(&mut self) {
        for member in self.members.values() {
            member.handle.disconnect();
        }
        self.members.clear();
        if self.state == GameState::Running {
            self.stop();
        }
    }

    // -- membership ---------------------------------------------------------

    fn on_join(&mut self, player: PlayerHandle) -> Result<(), GameError> {
        let player_id = player.id();
        if self.members.contains_key(&player_id) {
            return Err(GameError::AlreadyMember(player_id, self.id));
        }
        if self.members.len() >= self.game_type.players as usize {
            return Err(GameError::Full(self.id));
        }
        if self.state == GameState::Stopped {
            self.start();
        }

        // Private full sync: everything that existed before this player.
        let mut sync = GameUpdate::new();
        sync.set_game_type(self.game_type.view());
        sync.extend_players(self.members.values().map(|m| m.info.view()));
        if let Some(arena) = &self.arena {
            sync.extend_entities(arena.board.all().iter().map(Entity::view));
        }
        if let Err(e) = player.try_deliver(Arc::new(sync)) {
            if self.members.is_empty() {
                self.stop();
            }
            return Err(e);
        }

        let info = GamePlayerInfo::new(player_id);
        let mut delta = GameUpdate::new();
        delta.put_player(info.view(), None);
        self.members.insert(player_id, Member { handle: player, info });
        info!(
            game_id = %self.id,
            %player_id,
            players = self.members.len(),
            "player joined"
        );

        self.broadcast(delta);
        if let Some(member) = self.members.get_mut(&player_id) {
            member.info.state = PlayerState::Present;
        }
        self.flush_removals();
        Ok(())
    }

    fn on_leave(&mut self, player_id: PlayerId) -> Result<(), GameError> {
        if !self.members.contains_key(&player_id) {
            return Err(GameError::NotMember(player_id, self.id));
        }
        self.remove_member(player_id);
        self.flush_removals();
        Ok(())
    }

    /// Drops a member, hands their entities back to the board, and tells
    /// everyone else.
    fn remove_member(&mut self, player_id: PlayerId) {
        let Some(mut member) = self.members.remove(&player_id) else {
            return;
        };

        let mut update = GameUpdate::new();
        member.info.state = PlayerState::Removed;
        update.put_player(member.info.view(), None);

        let held = member.info.clear_selection();
        if let Some(arena) = self.arena.as_mut() {
            for id in &held {
                let Some(entity) = arena.board.get_mut(*id) else {
                    continue;
                };
                if entity.owner == Some(player_id) {
                    entity.release();
                    update.put_entity(entity.view(), None);
                }
            }
        }
        member.handle.disconnect();

        info!(
            game_id = %self.id,
            %player_id,
            released = update.entities.len(),
            players = self.members.len(),
            "player left"
        );

        self.broadcast(update);
        if self.members.is_empty() && self.state == GameState::Running {
            self.stop();
        }
    }

    // -- actions ------------------------------------------------------------

    fn on_action(&mut self, player_id: PlayerId, action: GameAction) {
        if !self.members.contains_key(&player_id) {
            debug!(game_id = %self.id, %player_id, "action from non-member, ignoring");
            return;
        }
        match action.command {
            GameCommand::SelectEntity => self.select_entity(player_id, action.entity),
        }
        self.flush_removals();
    }

    /// Toggles `entity_id` for `player_id`.
    ///
    /// A selected entity is always released, whoever asks. Otherwise the
    /// entity is selected if it matches the player's committed color, and
    /// forced back to present if it doesn't. Either way the result is
    /// broadcast.
    fn select_entity(&mut self, player_id: PlayerId, entity_id: EntityId) {
        let Some(arena) = self.arena.as_mut() else {
            return;
        };
        let Some(entity) = arena.board.get_mut(entity_id) else {
            debug!(game_id = %self.id, %player_id, %entity_id, "select on unknown entity");
            return;
        };

        let mut update = GameUpdate::new();
        if entity.state == EntityState::Selected {
            let prior = entity.owner;
            entity.release();
            let prior_owner = prior.and_then(|id| self.members.get_mut(&id));
            if let (Some(prior_id), Some(owner)) = (prior, prior_owner) {
                owner.info.deselect(entity_id);
                if prior_id != player_id {
                    owner.info.state = PlayerState::Updated;
                    update.put_player(owner.info.view(), None);
                    owner.info.state = PlayerState::Present;
                }
            }
        } else if let Some(actor) = self.members.get_mut(&player_id) {
            if actor.info.accepts(entity.color) {
                entity.select(player_id);
                actor.info.select(entity_id, entity.color);
            } else {
                debug!(
                    game_id = %self.id,
                    %player_id,
                    %entity_id,
                    wanted = ?actor.info.color(),
                    got = ?entity.color,
                    "color mismatch, selection rejected"
                );
                entity.release();
            }
        }

        let entity_view = entity.view();
        if let Some(actor) = self.members.get_mut(&player_id) {
            actor.info.state = PlayerState::Updated;
            update.put_player(actor.info.view(), None);
            actor.info.state = PlayerState::Present;
        }
        update.put_entity(entity_view, None);
        self.broadcast(update);
    }

    // -- simulation ---------------------------------------------------------

    /// Steps the simulation and broadcasts what changed. Expired entities
    /// that were owned count as a match for their owner.
    fn on_tick(&mut self, now: SystemTime) {
        self.ticks += 1;
        let Some(arena) = self.arena.as_mut() else {
            return;
        };
        let changed = arena.sim.step(&mut arena.board, now);
        if changed.is_empty() {
            return;
        }

        let mut update = GameUpdate::new();
        let mut scored: HashMap<PlayerId, usize> = HashMap::new();
        for entity in &changed {
            update.put_entity(entity.view(), None);
            if entity.state != EntityState::Removed {
                continue;
            }
            let Some(owner_id) = entity.owner else {
                continue;
            };
            let Some(owner) = self.members.get_mut(&owner_id) else {
                debug!(game_id = %self.id, entity_id = %entity.id, "expired entity owned by departed player");
                continue;
            };

            let held = owner.info.clear_selection();
            owner.info.credit(held.len());
            for id in held.into_iter().filter(|id| *id != entity.id) {
                let Some(other) = arena.board.get_mut(id) else {
                    continue;
                };
                if other.owner == Some(owner_id) {
                    other.release();
                    update.put_entity(other.view(), None);
                }
            }

            owner.info.state = PlayerState::Updated;
            let slot = update.put_player(owner.info.view(), scored.get(&owner_id).copied());
            scored.insert(owner_id, slot);
            debug!(game_id = %self.id, player_id = %owner_id, score = owner.info.score, "match scored");
        }
        for player_id in scored.keys() {
            if let Some(member) = self.members.get_mut(player_id) {
                member.info.state = PlayerState::Present;
            }
        }

        self.broadcast(update);
        self.flush_removals();
    }

    // -- delivery -----------------------------------------------------------

    /// Queues `update` for every member without waiting. A member whose
    /// queue refuses it is scheduled for removal.
    fn broadcast(&mut self, update: GameUpdate) {
        if self.members.is_empty() {
            return;
        }
        let update = Arc::new(update);
        for (player_id, member) in &self.members {
            if let Err(e) = member.handle.try_deliver(Arc::clone(&update)) {
                warn!(game_id = %self.id, %player_id, error = %e, "removing unreachable player");
                self.pending_removals.push(*player_id);
            }
        }
    }

    fn flush_removals(&mut self) {
        while let Some(player_id) = self.pending_removals.pop() {
            self.remove_member(player_id);
        }
    }
}
