mod auth;
mod campaigns;
mod config;
mod contracts;
mod dashboard;
mod db;
mod email;
mod errors;
mod models;
mod pipeline;
mod render;
mod routes;
mod signing;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::email::postmark::PostmarkClient;
use crate::render::ChromiumRenderer;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging. The tracing target follows the binary
    // name, not the hyphenated package name.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("api={}", &config.rust_log))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PKWT API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs pending migrations)
    let db = create_pool(&config.database_url).await?;

    // Headless Chromium renderer for contract PDFs
    let renderer = Arc::new(ChromiumRenderer::new(config.chrome_executable.clone()));
    info!("PDF renderer initialized");

    // Postmark outbound mailer
    let mailer = Arc::new(PostmarkClient::new(
        config.postmark_server_token.clone(),
        config.email_from.clone(),
    ));
    info!("Mailer initialized (from: {})", config.email_from);

    let state = AppState {
        db,
        config: config.clone(),
        renderer,
        mailer,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
