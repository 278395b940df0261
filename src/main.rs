use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use dutchcards_lib::cards::CardStore;
use dutchcards_lib::config::AppConfig;
use dutchcards_lib::server::{self, ServerState};

#[derive(Parser)]
#[command(name = "dutchcards", about = "Serve the Dutch card database over HTTP", version)]
struct Args {
    /// Config file (default: ./dutchcards.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides BIND_ADDR and the config file)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let db_path = config.database_path().context("Invalid database setting")?;
    let store = CardStore::open(&db_path)
        .with_context(|| format!("Failed to open card database {:?}", db_path))?;
    log::info!("Using card database {:?}", db_path);

    let app = server::router(ServerState::new(store), &config.media_dir);
    let listener = TcpListener::bind(config.bind.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    server::serve(listener, app, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
        }
    })
    .await?;

    Ok(())
}
