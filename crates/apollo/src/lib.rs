//! # Apollo
//!
//! Server for a real-time, browser-connected color-matching game.
//!
//! Players connect over a WebSocket, are placed into a shared match by the
//! world, and select blocks that match the color they committed to. All
//! game state lives in actors from [`apollo_game`]; this crate accepts
//! connections and wires each one to a player actor.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apollo::ApolloServer;
//!
//! # async fn run() -> Result<(), apollo::ApolloError> {
//! let server = ApolloServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .root("/")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ApolloError;
pub use server::{ApolloServer, ApolloServerBuilder, ServerConfig, ws_path};
