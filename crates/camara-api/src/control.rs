//! Admin operations on the web process that start the fan-out pipelines.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::{info, warn};

use camara_gateway::auth::Principal;
use camara_gateway::blocking;
use camara_types::api::{ControlResponse, EndVotingRequest, UpdateStatusRequest};
use camara_types::models::{ChamberId, Pauta, PautaId, Role, SpeakerId, status};

use crate::error::ApiError;
use crate::state::AppState;

fn require_admin(principal: &Principal, chamber_id: ChamberId) -> Result<(), ApiError> {
    if principal.profile.role != Role::Admin {
        return Err(ApiError::Forbidden("Acesso restrito a administradores"));
    }
    if principal.profile.chamber_id != Some(chamber_id) {
        return Err(ApiError::Forbidden("Acesso negado - pauta de outra câmara"));
    }
    Ok(())
}

async fn load_pauta(state: &AppState, pauta_id: PautaId) -> Result<Pauta, ApiError> {
    let directory = state.directory.clone();
    blocking(move || directory.pauta(pauta_id))
        .await?
        .ok_or(ApiError::NotFound("Pauta não encontrada"))
}

async fn write_status(
    state: &AppState,
    pauta_id: PautaId,
    new_status: &str,
    result: Option<String>,
) -> Result<(), ApiError> {
    let directory = state.directory.clone();
    let new_status = new_status.to_string();
    blocking(move || directory.set_pauta_status(pauta_id, &new_status, result.as_deref())).await?;
    Ok(())
}

/// Emit the status change; failures are logged, never returned.
async fn announce_status(state: &AppState, pauta_id: PautaId, old_status: String) {
    if let Err(e) = state
        .gateway
        .emitter
        .pauta_status_changed(pauta_id, old_status)
        .await
    {
        warn!("status of pauta {} stored but not announced: {}", pauta_id, e);
    }
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(pauta_id): Path<PautaId>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    let pauta = load_pauta(&state, pauta_id).await?;
    require_admin(&principal, pauta.chamber_id)?;

    let new_status = req.status.trim();
    if new_status.is_empty() {
        return Err(ApiError::BadRequest("Status é obrigatório"));
    }

    write_status(&state, pauta_id, new_status, req.result).await?;
    info!("pauta {} status set to {}", pauta_id, new_status);
    announce_status(&state, pauta_id, pauta.status).await;

    Ok(Json(ControlResponse {
        message: "Status atualizado com sucesso".to_string(),
        chamber_id: pauta.chamber_id,
    }))
}

pub async fn start_voting(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(pauta_id): Path<PautaId>,
) -> Result<Json<ControlResponse>, ApiError> {
    let pauta = load_pauta(&state, pauta_id).await?;
    require_admin(&principal, pauta.chamber_id)?;

    if pauta.status != status::VOTING {
        write_status(&state, pauta_id, status::VOTING, None).await?;
        announce_status(&state, pauta_id, pauta.status).await;
    }

    if let Err(e) = state.gateway.emitter.begin_voting(pauta_id).await {
        warn!("voting start on pauta {} not announced: {}", pauta_id, e);
    }
    info!("voting started on pauta {} by {}", pauta_id, principal.profile.user_id);

    Ok(Json(ControlResponse {
        message: "Votação iniciada".to_string(),
        chamber_id: pauta.chamber_id,
    }))
}

pub async fn end_voting(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(pauta_id): Path<PautaId>,
    body: Option<Json<EndVotingRequest>>,
) -> Result<Json<ControlResponse>, ApiError> {
    let pauta = load_pauta(&state, pauta_id).await?;
    require_admin(&principal, pauta.chamber_id)?;

    // The result is optional, and so is the body carrying it
    let result = body.and_then(|Json(req)| req.result);
    write_status(&state, pauta_id, status::FINISHED, result.clone()).await?;
    announce_status(&state, pauta_id, pauta.status).await;

    if let Err(e) = state.gateway.emitter.end_voting(pauta_id, result).await {
        warn!("voting end on pauta {} not announced: {}", pauta_id, e);
    }
    info!("voting ended on pauta {} by {}", pauta_id, principal.profile.user_id);

    Ok(Json(ControlResponse {
        message: "Votação encerrada".to_string(),
        chamber_id: pauta.chamber_id,
    }))
}

pub async fn start_speech(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(speaker_id): Path<SpeakerId>,
) -> Result<Json<ControlResponse>, ApiError> {
    let directory = state.directory.clone();
    let speaker = blocking(move || directory.speaker(speaker_id))
        .await?
        .ok_or(ApiError::NotFound("Orador não encontrado"))?;
    require_admin(&principal, speaker.chamber_id)?;

    if let Err(e) = state.gateway.emitter.begin_speech(speaker_id).await {
        warn!("speech {} not announced: {}", speaker_id, e);
    }

    Ok(Json(ControlResponse {
        message: "Fala iniciada".to_string(),
        chamber_id: speaker.chamber_id,
    }))
}
