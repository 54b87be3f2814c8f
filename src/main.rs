use anyhow::Result;
use tracing::info;
use vxn_site::{config, server};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vxn_site=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!("Starting VXN site service");

    // Load configuration from environment
    let config = config::Config::from_env()?;
    info!(
        "Serving verification relay on port {} (dictionaries from {})",
        config.port, config.site_base_url
    );

    server::run(&config).await
}
