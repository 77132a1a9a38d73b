use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::corrector::Corrector;
use crate::error::{Error, Result};
use crate::stats::{Insights, StatsStore};
use crate::templates::Pages;

/// Everything a request handler needs, shared behind an `Arc`
pub struct AppState {
    corrector: Corrector,
    store: StatsStore,
    pages: Pages,
}

#[derive(Serialize)]
struct CorrectResponse {
    original: String,
    corrected: String,
    corrections: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: String,
    message: String,
}

impl AppState {
    pub fn new(corrector: Corrector, store: StatsStore, pages: Pages) -> Self {
        Self {
            corrector,
            store,
            pages,
        }
    }

    /// Load the rule table, open the stats store and register page templates
    pub fn from_config(config: &Config) -> Result<Self> {
        let table = config.rule_table()?;
        let store = StatsStore::open(&config.data_file, table.tracked())?;
        let pages = Pages::new(config.templates_dir.as_deref())?;

        info!(
            "Loaded {} correction rules ({} tracked), stats at {}",
            table.rules().len(),
            table.tracked().len(),
            store.path().display()
        );

        Ok(Self::new(Corrector::new(table), store, pages))
    }

    pub fn store(&self) -> &StatsStore {
        &self.store
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = if self.is_client_error() {
            (StatusCode::BAD_REQUEST, self.to_string())
        } else {
            error!("Request failed: {}", self);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        };

        let body = Json(ErrorResponse {
            status: "error".to_string(),
            message,
        });
        (status, body).into_response()
    }
}

/// Build the application router
///
/// # Arguments
/// * `state` - Shared handler state
/// * `static_dir` - Directory served under `/static`
pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/", get(serve_home))
        .route("/insights", get(serve_insights))
        .route("/api/correct", post(correct_text))
        .route("/api/insights", get(get_insights))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the server and block until Ctrl-C
pub async fn run(config: Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_config(&config)?);
    let app = router(Arc::clone(&state), &config.static_dir);

    let listener = TcpListener::bind(&config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match Arc::try_unwrap(state) {
        Ok(state) => state.store.close(),
        Err(_) => warn!("Stats store still in use at shutdown"),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Pull `text` out of a JSON object body; a missing field means empty text
fn parse_text(body: &[u8]) -> Result<String> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidRequestBody(format!("body is not valid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidRequestBody("body must be a JSON object".to_string()))?;

    match object.get("text") {
        None => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(Error::InvalidRequestBody(
            "`text` must be a string".to_string(),
        )),
    }
}

/// Run a stats store job on the blocking thread pool
///
/// Store calls do synchronous file I/O under a lock and must stay off the
/// async worker threads.
async fn with_store<T, F>(state: &Arc<AppState>, job: F) -> Result<T>
where
    F: FnOnce(&StatsStore) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || job(&state.store))
        .await
        .map_err(|e| {
            Error::StorageUnavailable(io::Error::other(format!("Stats task failed: {}", e)))
        })?
}

async fn correct_text(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CorrectResponse>> {
    let text = parse_text(&body)?;
    let corrected = state.corrector.correct(&text);

    {
        let (text, corrected) = (text.clone(), corrected.clone());
        with_store(&state, move |store| store.record_correction(&text, &corrected)).await?;
    }

    let corrections = state.corrector.detect(&text);
    debug!("Corrected {} chars, found {:?}", text.len(), corrections);

    Ok(Json(CorrectResponse {
        original: text,
        corrected,
        corrections,
    }))
}

async fn get_insights(State(state): State<Arc<AppState>>) -> Result<Json<Insights>> {
    Ok(Json(with_store(&state, |store| store.insights()).await?))
}

async fn serve_home(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    Ok(Html(state.pages.render_home()?))
}

async fn serve_insights(State(state): State<Arc<AppState>>) -> Result<Html<String>> {
    let insights = with_store(&state, |store| store.insights()).await?;
    Ok(Html(state.pages.render_insights(&insights)?))
}
