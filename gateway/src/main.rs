//! HTTP gateway binary. Adapts the core's turn handler to
//! `POST /configurator/message` and `GET /health`. Carries no business
//! logic of its own — every decision is made inside `configurator-core`.

mod state;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use configurator_core::{Config, TurnRequest};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "configurator-gateway")]
struct Cli {
    /// Overrides `BIND_ADDR` / `Config::bind_addr`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Path to a TOML overlay applied on top of the environment-derived config.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(path) = &cli.config {
        apply_toml_overlay(&mut config, path)?;
    }
    if let Some(bind_addr) = cli.bind_addr {
        config.bind_addr = bind_addr;
    }

    let bind_addr: SocketAddr = config.bind_addr.parse()?;
    let state = Arc::new(AppState::build(config)?);

    let app = Router::new()
        .route("/configurator/message", post(handle_message))
        .route("/health", get(handle_health))
        .with_state(state);

    tracing::info!(%bind_addr, "starting configurator-gateway");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn apply_toml_overlay(config: &mut Config, path: &PathBuf) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let overlay: ConfigOverlay = toml::from_str(&raw)?;
    overlay.apply(config);
    Ok(())
}

/// Every field optional: only the keys present in the overlay file are applied.
#[derive(Debug, Default, serde::Deserialize)]
struct ConfigOverlay {
    llm_model: Option<String>,
    bind_addr: Option<String>,
    minimum_real_components: Option<usize>,
    auto_commit_confidence: Option<f64>,
    direct_mention_enrichment: Option<bool>,
}

impl ConfigOverlay {
    fn apply(self, config: &mut Config) {
        if let Some(v) = self.llm_model {
            config.llm_model = v;
        }
        if let Some(v) = self.bind_addr {
            config.bind_addr = v;
        }
        if let Some(v) = self.minimum_real_components {
            config.minimum_real_components = v;
        }
        if let Some(v) = self.auto_commit_confidence {
            config.auto_commit_confidence = v;
        }
        if let Some(v) = self.direct_mention_enrichment {
            config.direct_mention_enrichment = v;
        }
    }
}

async fn handle_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MessageRequest>,
) -> Json<serde_json::Value> {
    let turn = TurnRequest {
        session_id: request.session_id,
        message: request.message,
        language: request.language,
        reset: request.reset.unwrap_or(false),
    };
    match state.orchestrator.handle_turn(turn).await {
        Ok(response) => Json(serde_json::to_value(response).unwrap_or_default()),
        Err(err) => {
            tracing::warn!(error = %err, "turn failed");
            Json(serde_json::json!({ "error": user_facing_message(&err) }))
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<configurator_core::ReadinessReport> {
    Json(state.orchestrator.health().await)
}

#[derive(Debug, serde::Deserialize)]
struct MessageRequest {
    session_id: Option<String>,
    message: String,
    language: Option<String>,
    reset: Option<bool>,
}

/// Maps every `OrchestratorError` to a fixed prompt string. No internal
/// trace — including `Display` output that could leak port internals —
/// ever reaches the HTTP client.
fn user_facing_message(err: &configurator_core::OrchestratorError) -> &'static str {
    use configurator_core::OrchestratorError::*;
    match err {
        Extraction(_) => "Sorry, I couldn't understand that. Could you restate it?",
        Repository(_) => "The catalogue is momentarily unavailable. Please try again shortly.",
        SessionStore(_) => "Your session could not be reached. Please try again.",
        SkipNotAllowed => "A power source is required before moving on.",
        ThresholdNotMet { .. } => "A few more selections are needed before finalizing.",
        IntegrityViolation(_) => "Something went wrong on our end. Please start over.",
        DeadlineExceeded => "That took longer than expected. Please try again.",
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
