//! Operator HTTP routes.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::server::AppState;

/// Body of `POST /admin/reload-datasets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadResponse {
    /// Whether the reload succeeded.
    pub ok: bool,
    /// Words per topic after the reload.
    pub sizes: BTreeMap<String, usize>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// Always `true` while the process serves requests.
    pub ok: bool,
    /// Active sessions.
    pub sessions: usize,
}

/// `GET /admin/datasets`: words per topic.
#[instrument(skip(state))]
pub async fn dataset_sizes(State(state): State<AppState>) -> Json<BTreeMap<String, usize>> {
    Json(state.words().sizes())
}

/// `POST /admin/reload-datasets`: re-reads every dataset from disk.
///
/// Running sessions switch to the new lists on their next validation.
#[instrument(skip(state))]
pub async fn reload_datasets(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, (StatusCode, String)> {
    let loader = state.loader().clone();
    let sets = tokio::task::spawn_blocking(move || loader.load_all())
        .await
        .map_err(|e| {
            error!(error = %e, "Dataset reload task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .map_err(|e| {
            error!(error = %e, "Dataset reload failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    state.words().replace(sets);
    let sizes = state.words().sizes();
    info!(sizes = ?sizes, "Datasets reloaded");
    Ok(Json(ReloadResponse { ok: true, sizes }))
}

/// `GET /health`: liveness plus the active session count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        sessions: state.registry().len().await,
    })
}
