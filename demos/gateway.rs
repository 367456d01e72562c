use anyhow::Context;
use mineserve::Mineserve;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    info!("Starting gateway example");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/mineserve.json".to_string());
    let app = Mineserve::from_config_file(&config_path)
        .with_context(|| format!("Failed to load {}", config_path))?;

    // Rebind the saved directory and resume automatic archives
    app.restore().await.context("Failed to restore saved settings")?;

    let Some(gateway_config) = app.config().gateway else {
        warn!("Gateway not configured in {}", config_path);
        warn!("Please add a gateway section to your config file");
        return Ok(());
    };

    let gateway = app.start_gateway().await.context("Failed to start gateway")?;
    let host = &gateway_config.address;
    let port = gateway_config.port;

    info!("Gateway started on {:?}", gateway.local_addrs());
    info!("Available HTTP endpoints:");
    info!(" - Event stream:        GET    http://{}:{}/events", host, port);
    info!(" - Status:              GET    http://{}:{}/status", host, port);
    info!(" - Bind directory:      POST   http://{}:{}/directory", host, port);
    info!(" - Start server:        POST   http://{}:{}/server/start", host, port);
    info!(" - Stop server:         POST   http://{}:{}/server/stop", host, port);
    info!(" - Console command:     POST   http://{}:{}/server/command", host, port);
    info!(" - Properties:          GET/PUT http://{}:{}/properties", host, port);
    info!(" - Archive now:         POST   http://{}:{}/archives", host, port);
    info!("");
    info!("Example with curl:");
    info!("curl -X POST http://{}:{}/directory \\", host, port);
    info!("  -H \"Content-Type: application/json\" \\");
    info!("  -d '{{\"path\":\"/srv/minecraft\"}}'");
    info!("curl -N http://{}:{}/events", host, port);
    info!("");
    info!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for Ctrl+C")?;

    info!("Shutting down");
    if let Err(e) = app.shutdown().await {
        warn!("Server did not shut down cleanly: {}", e);
    }
    gateway.shutdown().await?;

    info!("Example finished");
    Ok(())
}
