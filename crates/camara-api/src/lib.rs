pub mod control;
pub mod error;
pub mod middleware;
pub mod relay;
pub mod state;
pub mod status;
pub mod votes;
pub mod ws;

use axum::{
    Router, middleware as layers,
    routing::{get, post, put},
};

use crate::middleware::require_session;
use crate::state::AppState;

/// Routes both processes serve: the socket, relay receivers and diagnostics.
fn common_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/health", get(status::health))
        .route("/api/connections", get(status::connections))
        .route("/api/relay/vote", post(relay::vote))
        .route("/api/relay/voting-started", post(relay::voting_started))
        .route("/api/relay/voting-ended", post(relay::voting_ended))
        .route("/api/relay/speech-started", post(relay::speech_started))
        .route("/api/relay/pauta-status", post(relay::pauta_status))
        .route("/api/relay/tally", post(relay::tally))
}

/// Admin/Web process: public hub, polling fallback and admin controls.
pub fn web_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/pautas/{pauta_id}/status", put(control::update_status))
        .route("/api/control/voting/{pauta_id}/start", post(control::start_voting))
        .route("/api/control/voting/{pauta_id}/end", post(control::end_voting))
        .route("/api/control/speech/{speaker_id}/start", post(control::start_speech))
        .layer(layers::from_fn_with_state(state.clone(), require_session));

    common_routes()
        .route("/api/live-voting/status/{chamber_id}", get(status::live_voting))
        .merge(protected)
        .with_state(state)
}

/// Tablet process: legislators' hub and vote casting.
pub fn tablet_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/votes", post(votes::cast_vote))
        .layer(layers::from_fn_with_state(state.clone(), require_session));

    common_routes().merge(protected).with_state(state)
}
