use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use liar_game::app::AppState;
use liar_game::config::{GameConfig, ServerConfig};
use liar_game::words::{WordBank, WordSource};
use liar_game::ws;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liar_game=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Liar Game server...");

    let server = ServerConfig::from_env();
    let game = GameConfig::from_env();
    tracing::info!(
        "Timers: reveal {:?}, turn {:?}, vote {:?}, guess {:?}, result {:?}, grace {:?}",
        game.role_reveal,
        game.turn,
        game.voting,
        game.guess,
        game.result_cooldown,
        game.disconnect_grace
    );

    let words = match &server.word_bank_path {
        Some(path) => {
            tracing::info!("Loading word bank from {}", path.display());
            WordBank::from_path(path)?
        }
        None => WordBank::builtin()?,
    };
    tracing::info!("Word bank ready with {} categories", words.categories().len());

    let state = Arc::new(AppState::new(game, Arc::new(words)));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .fallback_service(ServeDir::new(&server.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Listening on http://{}", server.addr);

    let listener = tokio::net::TcpListener::bind(server.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
