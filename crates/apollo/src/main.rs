//! The `apollo` game server binary.

use std::time::Duration;

use apollo::ApolloServer;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// IP address to bind to
    #[clap(short, long, default_value = "0.0.0.0")]
    addr: String,
    /// Port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// URL root path; the WebSocket endpoint is `<root>/ws`
    #[clap(short, long, default_value = "/")]
    root: String,
    /// Game tick period in milliseconds
    #[clap(long, default_value = "250")]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.addr, args.port);

    let server = ApolloServer::builder()
        .bind(&bind_addr)
        .root(&args.root)
        .tick_period(Duration::from_millis(args.tick_ms))
        .build()
        .await?;
    let world = server.world();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            world.shutdown().await?;
        }
    }

    Ok(())
}
