//! Per-connection handler.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Build the player actor, which attaches itself as the reader
//!   2. Start the write pump
//!   3. Register the player with the world, which places it in a game and
//!      starts it
//!   4. Run the read pump until the peer goes away, then close

use std::sync::Arc;

use apollo_game::{Player, PlayerConfig, WorldHandle};
use apollo_protocol::PlayerId;
use apollo_transport::{Connection, TransportError};
use tracing::{debug, info, warn};

use crate::ApolloError;

/// Drop guard that unregisters a player when the handler exits.
///
/// Covers early returns and panics. `Drop` is synchronous, so the
/// request is sent without waiting for the world.
struct RegistrationGuard {
    player_id: PlayerId,
    world: WorldHandle,
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.world.unregister_detached(self.player_id);
    }
}

/// Serves one connection from accept to close.
pub(crate) async fn serve_connection<C>(
    conn: C,
    world: WorldHandle,
    config: PlayerConfig,
) -> Result<(), ApolloError>
where
    C: Connection<Error = TransportError>,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    debug!(%conn_id, %player_id, "handling new connection");

    let player = Player::new(player_id, Arc::clone(&conn), world.clone(), &config);
    let writer = tokio::spawn({
        let conn = Arc::clone(&conn);
        async move { conn.write_pump().await }
    });
    let _guard = RegistrationGuard {
        player_id,
        world: world.clone(),
    };

    match world.register(player, None).await {
        Ok(game_id) => info!(%conn_id, %player_id, %game_id, "player connected"),
        Err(e) => {
            warn!(%conn_id, %player_id, error = %e, "registration failed, closing");
            conn.close();
            let _ = writer.await;
            return Err(e.into());
        }
    }

    let read_result = conn.read_pump().await;
    conn.close();
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(%conn_id, error = %e, "write pump ended with error"),
        Err(e) => warn!(%conn_id, error = %e, "write pump task failed"),
    }
    info!(%conn_id, %player_id, "connection closed");

    read_result.map_err(ApolloError::from)
}
