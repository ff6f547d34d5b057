//! Spatial state for one Apollo game.
//!
//! - [`Entity`]: a colored block on one grid cell, alive for a fixed TTL.
//! - [`Board`]: the entities of one game, keyed by id, inside a
//!   rows × cols grid.
//! - [`Simulation`]: the per-tick step: settle, expire, spawn.
//!
//! Nothing here is shared or locked. A board belongs to exactly one game
//! actor, which is the only code that ever touches it.

mod board;
mod entity;
mod simulation;

pub use board::Board;
pub use entity::Entity;
pub use simulation::{Simulation, SimulationConfig};
