use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde_json::{Value, json};

use camara_types::api::{ConnectionStats, LiveStatusResponse};
use camara_types::models::ChamberId;

use crate::state::AppState;

/// Polling fallback for clients without a live socket.
pub async fn live_voting(
    State(state): State<AppState>,
    Path(chamber_id): Path<ChamberId>,
) -> Json<LiveStatusResponse> {
    let sessions = state.gateway.emitter.snapshots().live_for(chamber_id);
    Json(LiveStatusResponse {
        is_live: !sessions.is_empty(),
        sessions,
    })
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.gateway.hub.service_name(),
        "timestamp": Utc::now(),
    }))
}

pub async fn connections(State(state): State<AppState>) -> Json<ConnectionStats> {
    Json(state.gateway.registry.stats())
}
