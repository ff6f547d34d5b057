//! Player actor: bridges one connection to the world and its game.
//!
//! ```text
//!  Connection read pump ──frames──▶ Player ──PlayerAction──▶ Game / World
//!  Connection::send ◀──bytes── Player ◀──Arc<GameUpdate>── Game
//!                              Player ◀──PlayerControl──── Game / World
//! ```

use std::sync::Arc;

use apollo_protocol::{Codec, GameUpdate, JsonCodec, MessageIn, PlayerId};
use apollo_transport::Connection;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::{ActionKind, GameError, GameHandle, PlayerAction, PlayerConfig, WorldHandle};

/// Out-of-band instructions to a player actor.
#[derive(Debug)]
pub enum PlayerControl {
    /// Forward game actions to this game from now on.
    Bind(GameHandle),
    /// Close the connection and stop.
    Disconnect,
}

// ---------------------------------------------------------------------------
// PlayerHandle
// ---------------------------------------------------------------------------

/// The sending side of a player's queues. Held by the world and by the
/// player's game.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    id: PlayerId,
    outbound: mpsc::Sender<Arc<GameUpdate>>,
    control: mpsc::Sender<PlayerControl>,
}

/// The receiving side of a player's queues.
#[derive(Debug)]
pub struct PlayerMailbox {
    pub outbound: mpsc::Receiver<Arc<GameUpdate>>,
    pub control: mpsc::Receiver<PlayerControl>,
}

impl PlayerHandle {
    /// Creates the outbound and control queues of one player.
    pub fn channel(id: PlayerId, config: &PlayerConfig) -> (PlayerHandle, PlayerMailbox) {
        let (outbound, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
        let (control, control_rx) = mpsc::channel(config.control_capacity.max(1));
        let handle = PlayerHandle {
            id,
            outbound,
            control,
        };
        let mailbox = PlayerMailbox {
            outbound: outbound_rx,
            control: control_rx,
        };
        (handle, mailbox)
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Queues an update without waiting.
    ///
    /// # Errors
    /// [`GameError::Delivery`] when the queue is full or the player is
    /// gone. Callers treat both as a disconnect.
    pub fn try_deliver(&self, update: Arc<GameUpdate>) -> Result<(), GameError> {
        self.outbound
            .try_send(update)
            .map_err(|_| GameError::Delivery(self.id))
    }

    /// Points the player's game actions at `game`. Returns `false` if the
    /// player has already stopped.
    pub async fn bind(&self, game: GameHandle) -> bool {
        self.control.send(PlayerControl::Bind(game)).await.is_ok()
    }

    /// Asks the player to close its connection. Never waits.
    pub fn disconnect(&self) {
        match self.control.try_send(PlayerControl::Disconnect) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => {
                warn!(player_id = %self.id, "control queue full, disconnect dropped");
            }
        }
    }

    /// Whether the player actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// The per-connection actor.
///
/// Built before registration so its handle can be given to the world; the
/// world starts [`Player::run`] once the player has a game.
pub struct Player<C: Connection> {
    id: PlayerId,
    conn: Arc<C>,
    world: WorldHandle,
    handle: PlayerHandle,
    game: Option<GameHandle>,
    inbound: mpsc::Receiver<Vec<u8>>,
    mailbox: PlayerMailbox,
    codec: JsonCodec,
    closed: bool,
}

impl<C: Connection> Player<C> {
    /// Creates the actor and attaches it as the connection's reader.
    pub fn new(id: PlayerId, conn: Arc<C>, world: WorldHandle, config: &PlayerConfig) -> Self {
        let (reader, inbound) = mpsc::channel(config.inbound_capacity.max(1));
        conn.attach_reader(reader);
        let (handle, mailbox) = PlayerHandle::channel(id, config);
        Self {
            id,
            conn,
            world,
            handle,
            game: None,
            inbound,
            mailbox,
            codec: JsonCodec,
            closed: false,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    /// Runs until the connection's reader closes, a write fails, or the
    /// player is told to disconnect. Unregisters from the world on the way
    /// out.
    pub async fn run(mut self) {
        info!(player_id = %self.id, conn_id = %self.conn.id(), "player started");

        loop {
            // Control is polled first: a bind takes effect before any
            // frame that was queued after it.
            tokio::select! {
                biased;

                control = self.mailbox.control.recv() => match control {
                    Some(PlayerControl::Bind(game)) => {
                        debug!(player_id = %self.id, game_id = %game.game_id(), "bound to game");
                        self.game = Some(game);
                    }
                    Some(PlayerControl::Disconnect) | None => {
                        debug!(player_id = %self.id, "disconnect requested");
                        break;
                    }
                },
                update = self.mailbox.outbound.recv() => match update {
                    Some(update) => {
                        if !self.forward(&update).await {
                            break;
                        }
                    }
                    None => break,
                },
                frame = self.inbound.recv() => match frame {
                    Some(frame) => self.on_frame(&frame).await,
                    None => {
                        debug!(player_id = %self.id, "connection reader closed");
                        break;
                    }
                },
            }
        }

        self.close();
        self.world.unregister(self.id).await;
        info!(player_id = %self.id, "player stopped");
    }

    async fn on_frame(&mut self, frame: &[u8]) {
        let msg: MessageIn = match self.codec.decode(frame) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(player_id = %self.id, error = %e, "dropping undecodable message");
                return;
            }
        };

        for action in PlayerAction::from_message(self.id, msg) {
            match action.kind {
                ActionKind::Game(game_action) => {
                    let Some(game) = &self.game else {
                        debug!(player_id = %self.id, req_id = %action.req_id, "no game bound, dropping action");
                        continue;
                    };
                    if let Err(e) = game.action(self.id, game_action).await {
                        debug!(player_id = %self.id, error = %e, "game gone, unbinding");
                        self.game = None;
                    }
                }
                ActionKind::World(_) => {
                    if let Err(e) = self.world.action(action).await {
                        debug!(player_id = %self.id, error = %e, "world action not delivered");
                    }
                }
            }
        }
    }

    /// Writes one update to the connection. Returns `false` once the
    /// connection can no longer be written to.
    async fn forward(&self, update: &GameUpdate) -> bool {
        let bytes = match self.codec.encode(update) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(player_id = %self.id, error = %e, "could not encode update, skipping");
                return true;
            }
        };
        match self.conn.send(bytes).await {
            Ok(()) => true,
            Err(e) => {
                debug!(player_id = %self.id, error = %e, "connection send failed");
                false
            }
        }
    }

    /// Tears down the connection, then the outbound queue, then the
    /// control queue. Safe to call more than once.
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.conn.close();
        self.mailbox.outbound.close();
        self.mailbox.control.close();
        self.game = None;
    }
}
