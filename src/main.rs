//! taskd server binary.

use tracing_subscriber::EnvFilter;

use taskd::api::routes;
use taskd::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        "Starting taskd on {}:{} (db: {})",
        config.host,
        config.port,
        config.database_path.display()
    );

    routes::serve(config).await
}
