//! embedgate server binary
//!
//! Serves the embedding gateway over HTTP and WebSocket. Configuration comes
//! from `.env`, an optional `server.*` file and `EMBEDGATE_*` variables.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;

    server::start_server(config).await?;

    Ok(())
}
