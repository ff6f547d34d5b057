//! Unified error type for the Apollo server.

use apollo_game::WorldError;
use apollo_transport::TransportError;

/// Top-level error that wraps the errors of every layer.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ApolloError {
    /// A transport-level error (bind, accept, read, write).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The world refused or could not place a player.
    #[error(transparent)]
    World(#[from] WorldError),
}
