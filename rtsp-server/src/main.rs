mod app;
mod media;
mod net;
mod runtime;
mod session;
mod source;

use std::env::args;
use std::error::Error;
use std::path::Path;

use app::config::AppConfig;
use app::App;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("LOG"))
        .init();

    let config_file = args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let config = AppConfig::from_file(Path::new(&config_file))?;
    tracing::debug!(?config, "read config file");

    let mut app = App::start(&config).await?;
    tracing::info!(local_addr = %app.server().local_addr(), "started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("stopping");
    app.stop().await;

    Ok(())
}
