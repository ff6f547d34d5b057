//! `ApolloServer` builder and accept loop.
//!
//! Ties the layers together: the transport accepts upgrades, and each
//! connection gets a handler task that builds a player and registers it
//! with the world.

use std::net::SocketAddr;

use apollo_game::{PlayerConfig, WorldConfig, WorldHandle, spawn_world};
use apollo_transport::{ConnectionConfig, Transport, WebSocketTransport};
use tracing::{debug, error, info};

use crate::ApolloError;
use crate::handler::serve_connection;

/// Everything needed to start a server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,
    /// URL root the WebSocket endpoint is mounted under.
    pub root: String,
    pub connection: ConnectionConfig,
    pub world: WorldConfig,
    pub player: PlayerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            root: "/".to_string(),
            connection: ConnectionConfig::default(),
            world: WorldConfig::default(),
            player: PlayerConfig::default(),
        }
    }
}

/// The WebSocket endpoint path for a URL root: `/` gives `/ws`, `/game/`
/// gives `/game/ws`.
pub fn ws_path(root: &str) -> String {
    let root = root.trim_matches('/');
    if root.is_empty() {
        "/ws".to_string()
    } else {
        format!("/{root}/ws")
    }
}

/// Builder for configuring and starting an Apollo server.
///
/// # Example
///
/// ```rust,ignore
/// let server = ApolloServer::builder()
///     .bind("0.0.0.0:8080")
///     .tick_period(Duration::from_millis(250))
///     .build()
///     .await?;
/// server.run().await
/// ```
#[derive(Debug, Clone, Default)]
pub struct ApolloServerBuilder {
    config: ServerConfig,
}

impl ApolloServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the URL root the WebSocket endpoint lives under.
    pub fn root(mut self, root: &str) -> Self {
        self.config.root = root.to_string();
        self
    }

    /// Sets the game tick period.
    pub fn tick_period(mut self, period: std::time::Duration) -> Self {
        self.config.world.game.tick_period = period;
        self
    }

    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.config.connection = config;
        self
    }

    pub fn world_config(mut self, config: WorldConfig) -> Self {
        self.config.world = config;
        self
    }

    pub fn player_config(mut self, config: PlayerConfig) -> Self {
        self.config.player = config;
        self
    }

    /// Binds the listener and starts the world.
    pub async fn build(self) -> Result<ApolloServer, ApolloError> {
        let ServerConfig {
            bind_addr,
            root,
            connection,
            world,
            player,
        } = self.config;

        let transport = WebSocketTransport::bind(&bind_addr, &ws_path(&root), connection).await?;
        let world = spawn_world(world);

        Ok(ApolloServer {
            transport,
            world,
            player,
        })
    }
}

/// A bound Apollo server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ApolloServer {
    transport: WebSocketTransport,
    world: WorldHandle,
    player: PlayerConfig,
}

impl ApolloServer {
    /// Creates a new builder.
    pub fn builder() -> ApolloServerBuilder {
        ApolloServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the server's world, for introspection and shutdown.
    pub fn world(&self) -> WorldHandle {
        self.world.clone()
    }

    /// Runs the accept loop. Each connection is served on its own task.
    /// A failed accept only affects that one connection.
    pub async fn run(mut self) -> Result<(), ApolloError> {
        info!(addr = ?self.transport.local_addr().ok(), "Apollo server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let world = self.world.clone();
                    let player = self.player.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(conn, world, player).await {
                            debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                }
            }
        }
    }
}
