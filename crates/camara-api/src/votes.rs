use axum::{Extension, Json, extract::State, http::StatusCode};
use tracing::{info, warn};

use camara_db::VoteOutcome;
use camara_gateway::auth::Principal;
use camara_gateway::blocking;
use camara_types::api::{CastVoteRequest, CastVoteResponse};
use camara_types::events::VoterInfo;
use camara_types::models::{Role, status};

use crate::error::ApiError;
use crate::state::AppState;

/// Store a legislator's vote. Notification runs after the write and cannot
/// change the response.
pub async fn cast_vote(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CastVoteRequest>,
) -> Result<(StatusCode, Json<CastVoteResponse>), ApiError> {
    if principal.profile.role != Role::Legislator {
        return Err(ApiError::Forbidden("Apenas vereadores podem votar"));
    }

    let directory = state.directory.clone();
    let user_id = principal.profile.user_id;
    let legislator = blocking(move || directory.legislator_for_profile(user_id))
        .await?
        .ok_or(ApiError::Forbidden("Vereador não encontrado"))?;

    let directory = state.directory.clone();
    let pauta_id = req.pauta_id;
    let pauta = blocking(move || directory.pauta(pauta_id))
        .await?
        .ok_or(ApiError::NotFound("Pauta não encontrada"))?;

    if pauta.chamber_id != legislator.chamber_id {
        return Err(ApiError::Forbidden("Acesso negado - pauta de outra câmara"));
    }
    if pauta.status != status::VOTING {
        return Err(ApiError::BadRequest("Pauta não está em votação"));
    }

    let directory = state.directory.clone();
    let member = legislator.clone();
    let ballot = req.ballot;
    let outcome = blocking(move || directory.record_vote(pauta_id, &member, ballot)).await?;
    let is_update = outcome == VoteOutcome::Updated;

    info!(
        "legislator {} voted {} on pauta {}{}",
        legislator.id,
        ballot,
        pauta_id,
        if is_update { " (changed)" } else { "" }
    );

    let voter = VoterInfo {
        id: legislator.id,
        name: legislator.name,
        is_president: legislator.is_president,
    };
    if let Err(e) = state
        .gateway
        .emitter
        .vote_cast(pauta_id, voter, ballot, is_update)
        .await
    {
        warn!("vote on pauta {} stored but not announced: {}", pauta_id, e);
    }

    let (code, message) = if is_update {
        (StatusCode::OK, "Voto atualizado com sucesso")
    } else {
        (StatusCode::CREATED, "Voto registrado com sucesso")
    };
    Ok((
        code,
        Json(CastVoteResponse {
            message: message.to_string(),
            pauta_id,
            ballot,
            is_update,
        }),
    ))
}
