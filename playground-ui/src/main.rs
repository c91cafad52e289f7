//! Playground UI server - pattern catalog, favorites and live code sessions.

mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use clap::Parser;
use playground::io::config::{DEFAULT_CONFIG_PATH, load_config};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::state::{AppState, SessionLimits};

#[derive(Parser)]
#[command(name = "playground-ui")]
#[command(about = "Web API for the design-pattern playground")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Playground config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory containing UI static files
    #[arg(long, default_value = "ui/dist")]
    ui_dir: PathBuf,

    /// Most editor sessions kept in memory
    #[arg(long, default_value = "256")]
    max_sessions: usize,

    /// Evict sessions untouched for this many seconds
    #[arg(long, default_value = "1800")]
    session_idle_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("playground_ui=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let cfg = load_config(&args.config)?;
    info!(config = %args.config.display(), run_delay_ms = cfg.run_delay_ms, "starting playground-ui");

    let limits = SessionLimits {
        max_sessions: args.max_sessions,
        idle_ttl: Duration::from_secs(args.session_idle_secs),
    };
    let state = AppState::from_config(&cfg, limits)?;

    let api_router = routes::api_router().layer(middleware::from_fn(routes::anonymous_identity));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let mut app = Router::new()
        .nest("/api", api_router)
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    if args.ui_dir.exists() {
        info!(ui_dir = %args.ui_dir.display(), "serving static UI files");
        app = app.fallback_service(
            ServeDir::new(args.ui_dir).append_index_html_on_directories(true),
        );
    } else {
        info!(ui_dir = %args.ui_dir.display(), "UI directory not found, API-only mode");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
