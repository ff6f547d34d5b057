//! Internal action values built from inbound messages.

use apollo_protocol::{EntityId, GameCommand, MessageIn, PlayerId};

/// Something a player asked for, tagged with who asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerAction {
    /// The player the action came from. Replies and ownership are keyed
    /// on this.
    pub player: PlayerId,
    /// The client's request id, kept for logging.
    pub req_id: String,
    pub kind: ActionKind,
}

/// Where an action is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Handled by the world. Reserved.
    World(WorldAction),
    /// Handled by the game the player is bound to.
    Game(GameAction),
}

/// A world-scoped action. Carries nothing yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldAction;

/// A command aimed at one entity of the player's game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameAction {
    pub command: GameCommand,
    pub entity: EntityId,
}

impl PlayerAction {
    /// Splits an inbound message into its actions, world half first.
    ///
    /// A message with no `Act`, or with both halves null, yields nothing.
    pub fn from_message(player: PlayerId, msg: MessageIn) -> Vec<PlayerAction> {
        let Some(act) = msg.act else {
            return Vec::new();
        };

        let mut actions = Vec::with_capacity(2);
        if act.world.is_some() {
            actions.push(PlayerAction {
                player,
                req_id: msg.req_id.clone(),
                kind: ActionKind::World(WorldAction),
            });
        }
        if let Some(game) = act.game {
            actions.push(PlayerAction {
                player,
                req_id: msg.req_id,
                kind: ActionKind::Game(GameAction {
                    command: game.command,
                    entity: game.entity,
                }),
            });
        }
        actions
    }
}
