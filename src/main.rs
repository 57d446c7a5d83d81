use std::sync::Arc;

use salvo::conn::TcpListener;
use salvo::prelude::*;

use autoblog::ai::GeminiClient;
use autoblog::api::{self, AppState};
use autoblog::config::Config;
use autoblog::db::{self, Repository};
use autoblog::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = Config::load()?;
    let repo = Repository::open(&config.db_path).await?;

    // Seed a starter dataset and exit.
    if args.len() >= 2 && args[1] == "--seed" {
        db::seed::seed(&repo).await?;
        repo.close().await?;
        return Ok(());
    }

    let ai = match &config.gemini_api_key {
        Some(key) => Some(Arc::new(GeminiClient::new(
            key.clone(),
            config.gemini_model.clone(),
        ))),
        None => {
            tracing::warn!("GEMINI_API_KEY not configured, AI endpoints are disabled");
            None
        }
    };
    if config.admin_token.is_none() {
        tracing::warn!("no admin token configured, admin routes are open");
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        repo: repo.clone(),
        ai,
        config: Arc::new(config),
    };
    let router = api::router(state);

    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;
    tracing::info!("listening on http://{bind_addr}");

    let server = Server::new(acceptor);
    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            handle.stop_graceful(None);
        }
    });
    server.serve(router).await;

    // The server has drained; release the database handle last.
    repo.close().await?;

    Ok(())
}
