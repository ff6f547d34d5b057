//! Error types for the game layer.

use apollo_protocol::{GameId, PlayerId};

/// Errors returned by a game actor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The game already has as many members as its type allows.
    #[error("game {0} is full")]
    Full(GameId),

    /// The player is already a member of this game.
    #[error("player {0} already in game {1}")]
    AlreadyMember(PlayerId, GameId),

    /// The player is not a member of this game.
    #[error("player {0} not in game {1}")]
    NotMember(PlayerId, GameId),

    /// An update could not be queued for the player: their outbound queue
    /// is full or already torn down.
    #[error("delivery to player {0} failed")]
    Delivery(PlayerId),

    /// The game's command channel is closed.
    #[error("game {0} is unavailable")]
    Unavailable(GameId),
}

/// Errors returned by the world actor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The player is already registered.
    #[error("player {0} already registered")]
    AlreadyRegistered(PlayerId),

    /// Placing the player in a game failed.
    #[error("could not place player: {0}")]
    Placement(#[from] GameError),

    /// The world's command channel is closed.
    #[error("world is unavailable")]
    Unavailable,
}
