//! Receiving end of the cross-process relay. Payload ids are trusted: the
//! only caller is the peer process on the same host.

use axum::{Json, extract::State};
use tracing::debug;

use camara_types::relay::{
    RelayAck, SpeechRelay, StatusChange, TallyRelay, VoteRelay, VotingEndedRelay,
    VotingStartedRelay,
};

use crate::state::AppState;

fn ack() -> Json<RelayAck> {
    Json(RelayAck { success: true })
}

pub async fn vote(State(state): State<AppState>, Json(payload): Json<VoteRelay>) -> Json<RelayAck> {
    debug!("relay in: vote on pauta {}", payload.pauta_id);
    state.gateway.emitter.on_vote(&payload);
    ack()
}

pub async fn voting_started(
    State(state): State<AppState>,
    Json(payload): Json<VotingStartedRelay>,
) -> Json<RelayAck> {
    debug!("relay in: voting started on pauta {}", payload.pauta_id);
    state.gateway.emitter.on_voting_started(payload);
    ack()
}

pub async fn voting_ended(
    State(state): State<AppState>,
    Json(payload): Json<VotingEndedRelay>,
) -> Json<RelayAck> {
    debug!("relay in: voting ended on pauta {}", payload.pauta_id);
    state.gateway.emitter.on_voting_ended(payload);
    ack()
}

pub async fn speech_started(
    State(state): State<AppState>,
    Json(payload): Json<SpeechRelay>,
) -> Json<RelayAck> {
    debug!("relay in: speech by {} started", payload.speaker_id);
    state.gateway.emitter.on_speech_started(&payload);
    ack()
}

pub async fn pauta_status(
    State(state): State<AppState>,
    Json(payload): Json<StatusChange>,
) -> Json<RelayAck> {
    debug!("relay in: status of pauta {}", payload.pauta_id);
    state.gateway.emitter.on_pauta_status(&payload);
    ack()
}

pub async fn tally(State(state): State<AppState>, Json(payload): Json<TallyRelay>) -> Json<RelayAck> {
    debug!("relay in: tally for pauta {}", payload.pauta_id);
    state.gateway.emitter.on_tally(&payload);
    ack()
}
