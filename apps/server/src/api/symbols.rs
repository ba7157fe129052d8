use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use stockpulse_core::SymbolView;

use crate::{error::ApiResult, main_lib::AppState};

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub symbol: String,
}

async fn list_symbols(State(state): State<Arc<AppState>>) -> Json<Vec<SymbolView>> {
    Json(state.orchestrator.views())
}

async fn get_symbol(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SymbolView>> {
    Ok(Json(state.orchestrator.view(&symbol)?))
}

/// Starts tracking a symbol and kicks off its first refresh in the background.
async fn track_symbol(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrackRequest>,
) -> ApiResult<(StatusCode, Json<SymbolView>)> {
    let orchestrator = &state.orchestrator;
    let already_tracked = orchestrator.is_tracked(&request.symbol);
    let canonical = orchestrator.track(&request.symbol)?;
    let view = orchestrator.view(&canonical)?;

    if already_tracked {
        return Ok((StatusCode::OK, Json(view)));
    }

    let background = orchestrator.clone();
    let symbol = canonical.clone();
    tokio::spawn(async move {
        if let Err(e) = background.refresh_symbol(&symbol).await {
            tracing::debug!("Initial refresh of {} not run: {}", symbol, e);
        }
    });

    Ok((StatusCode::CREATED, Json(view)))
}

async fn untrack_symbol(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.orchestrator.untrack(&symbol)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/symbols", get(list_symbols).post(track_symbol))
        .route("/symbols/{symbol}", get(get_symbol).delete(untrack_symbol))
}
