use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use patientdesk::config::{Config, Mode};
use patientdesk::password::BcryptVerifier;
use patientdesk::{import, logging, router, AppState, SqliteStore};
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    logging::initialize_logging();

    let config = Config::from_args()?;
    let store = SqliteStore::open(&config.database)?;
    info!("Using database {}", config.database.display());

    match &config.mode {
        Mode::Import(path) => {
            import::import_file(&store, path)?;
            Ok(())
        }
        Mode::Serve => serve(config, store).await,
    }
}

async fn serve(config: Config, store: SqliteStore) -> Result<()> {
    let state = AppState::new(
        Arc::new(store),
        Arc::new(BcryptVerifier::new(config.bcrypt_cost)),
        config.token_ttl,
    );
    let app = router(state);

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(
        "Listening on http://{} (tokens valid for {})",
        config.listen, config.token_ttl
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
}
