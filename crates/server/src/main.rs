use anyhow::Context;
use ricette_blog::Store;
use ricette_server::{AppState, Config, service};
use salvo::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    if let Ok(path) = dotenv {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    let config = Config::from_env()?;
    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("cannot create media root {}", config.media_root.display()))?;
    let store = Store::connect(&config.database_url)
        .await
        .context("cannot open the database")?;

    let listen = config.listen.clone();
    let acceptor = TcpListener::new(listen.clone()).bind().await;
    tracing::info!(%listen, "ricette listening");
    Server::new(acceptor).serve(service(AppState::new(store, config))).await;
    Ok(())
}
