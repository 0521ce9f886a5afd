//! HTTP endpoint handlers. These are thin wrappers over shared state.
//! Session-scoped operations flow over the WebSocket instead.

use std::sync::Arc;
use axum::{extract::State, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::protocol::{HealthOut, HistoryOut};
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// The persisted assessment history, oldest first.
#[instrument(level = "info", skip(state))]
pub async fn http_get_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let records = state.history.all().await;
  info!(target: "acuity_backend", records = records.len(), "HTTP history served");
  Json(HistoryOut { records })
}
