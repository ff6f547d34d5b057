//! Actors for Apollo: the world, its games, and their players.
//!
//! Every actor is an isolated Tokio task that owns its state and is
//! reached only through a handle wrapping a bounded channel.
//!
//! ```text
//!            ┌────────────┐ register / unregister
//!  accept ──▶│   World    │────────────────────────┐
//!            └────────────┘                        ▼
//!   Player ◀── updates (try_send) ──┐       ┌────────────┐
//!     │                             └───────│    Game    │◀── tick
//!     └──────── actions ───────────────────▶└────────────┘
//! ```
//!
//! # Key types
//!
//! - [`WorldHandle`]: admit and evict players ([`spawn_world`])
//! - [`GameHandle`]: join, leave, and act on one match ([`spawn_game`])
//! - [`Player`] / [`PlayerHandle`]: the per-connection actor and its
//!   queues
//! - [`GamePlayerInfo`]: a player's score, color, and selection
//! - [`GameType`], [`GameConfig`], [`WorldConfig`], [`PlayerConfig`]

mod action;
mod config;
mod error;
mod game;
mod info;
mod player;
mod world;

pub use action::{ActionKind, GameAction, PlayerAction, WorldAction};
pub use config::{GameConfig, GameState, GameType, PlayerConfig, WorldConfig};
pub use error::{GameError, WorldError};
pub use game::{GameHandle, GameInfo, spawn_game};
pub use info::GamePlayerInfo;
pub use player::{Player, PlayerControl, PlayerHandle, PlayerMailbox};
pub use world::{WorldHandle, WorldInfo, spawn_world};
