use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use client_core::{GradioClient, SessionSlot};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod backend_bridge;
mod config;
mod controller;
mod ui;

use app_state::AppState;
use backend_bridge::{commands::FormValues, runtime::launch_connection};
use config::{load_settings, MarkdownMode};
use controller::{
    orchestration::{RecommendController, TriggerOutcome},
    reducer::PresentationState,
};
use ui::{
    markdown::renderer_for,
    page::{render_page, render_status_fragment, STATUS_FRAGMENT_PATH},
};

#[derive(Parser, Debug)]
#[command(about = "Web front-end for the Codeforces problem recommender Space")]
struct Args {
    /// TOML settings file (defaults to ./recommender.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<String>,
    /// Space id (`owner/name`) or base URL of the remote app.
    #[arg(long)]
    space: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(space) = args.space {
        settings.space = space;
    }

    let controller = RecommendController::new(
        SessionSlot::new(),
        settings.endpoint.as_str(),
        renderer_for(settings.markdown == MarkdownMode::CommonMark),
    );
    let client = GradioClient::new(settings.connect_options());
    let _connection_task = launch_connection(controller.clone(), Arc::new(client), settings.space.clone());

    let app = build_router(Arc::new(AppState { controller }), settings.max_form_bytes);

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.bind_addr))?;
    info!(%addr, space = %settings.space, endpoint = %settings.endpoint, "front-end listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_form_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/run", post(run))
        .route(STATUS_FRAGMENT_PATH, get(status_fragment))
        .route("/api/state", get(api_state))
        .route("/healthz", get(healthz))
        .layer(RequestBodyLimitLayer::new(max_form_bytes))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(&state.controller.snapshot()))
}

async fn status_fragment(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_status_fragment(&state.controller.snapshot()))
}

async fn run(State(state): State<Arc<AppState>>, body: Bytes) -> Html<String> {
    let form = FormValues::from_urlencoded(&body);
    if state.controller.trigger(form).await == TriggerOutcome::Ignored {
        debug!("submit ignored; an action is already running");
    }
    Html(render_page(&state.controller.snapshot()))
}

async fn api_state(State(state): State<Arc<AppState>>) -> Json<PresentationState> {
    Json(state.controller.snapshot())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
