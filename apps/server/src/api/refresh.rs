use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;

use crate::{error::ApiResult, main_lib::AppState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshAccepted {
    symbols: Vec<String>,
}

/// Starts a refresh of every tracked symbol. Answers 409 while one is running.
async fn trigger_refresh(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<RefreshAccepted>)> {
    let handle = state.orchestrator.spawn_manual_refresh()?;
    tokio::spawn(async move {
        match handle.await {
            Ok(summary) => tracing::info!("Manual refresh finished: {:?}", summary),
            Err(e) => tracing::error!("Manual refresh task failed: {}", e),
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshAccepted {
            symbols: state.orchestrator.tracked(),
        }),
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/refresh", post(trigger_refresh))
}
