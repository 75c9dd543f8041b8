use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Ballot, ChamberId, PautaId};
use crate::relay::LiveVoting;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the WebSocket handshake.
/// `iat` is compared against the profile's `min_token_iat` watermark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: usize,
}

// -- Votes --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CastVoteRequest {
    pub pauta_id: PautaId,
    pub ballot: Ballot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteResponse {
    pub message: String,
    pub pauta_id: PautaId,
    pub ballot: Ballot,
    pub is_update: bool,
}

// -- Admin control --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndVotingRequest {
    #[serde(default)]
    pub result: Option<String>,
}

/// Reply to the admin control endpoints. Real-time fan-out happens after
/// the write and never changes this response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlResponse {
    pub message: String,
    pub chamber_id: ChamberId,
}

// -- Polling / diagnostics --

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatusResponse {
    pub is_live: bool,
    pub sessions: Vec<LiveVoting>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub chamber_connections: BTreeMap<ChamberId, usize>,
    pub legislators_online: BTreeMap<ChamberId, usize>,
    pub active_pautas: usize,
}
