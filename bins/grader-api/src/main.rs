mod events;
mod handlers;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use axum::Router;
use events::VerdictEvent;
use grader_common::config::EngineConfig;
use grader_engine::Grader;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Buffered verdict events per subscriber before it starts lagging
const EVENT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub grader: Grader,
    pub events: broadcast::Sender<VerdictEvent>,
}

impl AppState {
    pub fn new(grader: Grader) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { grader, events }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("GRADER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Grader API booting...");

    let config = EngineConfig::load_default()?.with_env_overrides()?;
    info!(
        scratch_root = %config.scratch_root.display(),
        compiler = %config.compiler,
        runtime = %config.runtime,
        test_timeout_ms = config.test_timeout_ms,
        "Engine configuration loaded"
    );

    let state = Arc::new(AppState::new(Grader::new(config)));
    tokio::spawn(events::log_events(state.events.subscribe()));

    let app = Router::new().merge(routes::routes()).with_state(state);

    let addr = std::env::var("GRADER_API_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
