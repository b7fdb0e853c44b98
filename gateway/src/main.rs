use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;

use clap::Parser;
use tokio::net::TcpListener;

use anyhow::anyhow;

use relay_gateway::{ServerConfig, routes, state::AppState};

/// Relay Gateway - bridges telephony conversation relay calls to a chat completion API
#[derive(Parser, Debug)]
#[command(name = "relay-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Report the environment before validation so a missing key is visible in logs
    let key_status = match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => "[SET]",
        _ => "[MISSING]",
    };
    let env_domain = std::env::var("DOMAIN").unwrap_or_default();
    info!(
        openai_api_key = key_status,
        domain = %env_domain,
        "Environment"
    );

    // Missing or invalid configuration is fatal: returning the error exits non-zero
    let config = if let Some(config_path) = cli.config {
        info!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    info!(
        domain = %config.domain,
        model = %config.openai_model,
        "Configuration loaded"
    );

    let address = config.address();
    let ws_url = config.relay_ws_url();

    // Create application state
    let app_state = AppState::new(config)
        .await
        .map_err(|e| anyhow!("Failed to initialize completion provider: {}", e))?;

    let app = routes::create_router(app_state);

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    let listener = TcpListener::bind(&socket_addr).await?;
    info!(
        "Server listening on http://{} (relay endpoint {})",
        socket_addr, ws_url
    );

    axum::serve(listener, app).await?;

    Ok(())
}
