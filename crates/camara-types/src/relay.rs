use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Ballot, ChamberId, LegislatorId, PautaId, SpeakerId, Tally};

/// A legislator's vote, as relayed between processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRelay {
    pub chamber_id: ChamberId,
    pub pauta_id: PautaId,
    pub legislator_id: LegislatorId,
    pub legislator_name: String,
    pub is_president: bool,
    pub ballot: Ballot,
    pub is_update: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingStartedRelay {
    pub chamber_id: ChamberId,
    pub pauta_id: PautaId,
    pub pauta_name: String,
    pub pauta_description: Option<String>,
    pub session_name: String,
    pub session_kind: String,
    pub session_starts_at: String,
    /// Filled in by the tablet process, which is the only one that can count.
    #[serde(default)]
    pub legislators_online: Option<usize>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingEndedRelay {
    pub chamber_id: ChamberId,
    pub pauta_id: PautaId,
    pub pauta_name: String,
    #[serde(default)]
    pub result: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRelay {
    pub chamber_id: ChamberId,
    pub speaker_id: SpeakerId,
    pub speaker_name: String,
    pub session_name: String,
    pub speaking_minutes: i64,
    pub timestamp: DateTime<Utc>,
}

/// Pauta status transition. Also the WebSocket payload of both status events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub chamber_id: ChamberId,
    pub pauta_id: PautaId,
    pub pauta_name: String,
    pub old_status: String,
    pub new_status: String,
    #[serde(default)]
    pub result: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyRelay {
    pub chamber_id: ChamberId,
    pub pauta_id: PautaId,
    pub tally: Tally,
    pub timestamp: DateTime<Utc>,
}

/// Everything one process can tell the other. The HTTP body is the inner
/// payload; the endpoint path identifies the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayEvent {
    Vote(VoteRelay),
    VotingStarted(VotingStartedRelay),
    VotingEnded(VotingEndedRelay),
    SpeechStarted(SpeechRelay),
    PautaStatus(StatusChange),
    Tally(TallyRelay),
}

impl RelayEvent {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Vote(_) => "/api/relay/vote",
            Self::VotingStarted(_) => "/api/relay/voting-started",
            Self::VotingEnded(_) => "/api/relay/voting-ended",
            Self::SpeechStarted(_) => "/api/relay/speech-started",
            Self::PautaStatus(_) => "/api/relay/pauta-status",
            Self::Tally(_) => "/api/relay/tally",
        }
    }

    pub fn chamber_id(&self) -> ChamberId {
        match self {
            Self::Vote(p) => p.chamber_id,
            Self::VotingStarted(p) => p.chamber_id,
            Self::VotingEnded(p) => p.chamber_id,
            Self::SpeechStarted(p) => p.chamber_id,
            Self::PautaStatus(p) => p.chamber_id,
            Self::Tally(p) => p.chamber_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayAck {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveStatus {
    Started,
    Ended,
}

/// Last known state of a vote session, as seen by the web process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveVoting {
    pub chamber_id: ChamberId,
    pub pauta_id: PautaId,
    pub pauta_name: String,
    pub pauta_description: Option<String>,
    pub session_name: Option<String>,
    pub session_kind: Option<String>,
    pub session_starts_at: Option<String>,
    pub legislators_online: usize,
    pub status: LiveStatus,
    pub is_live: bool,
    pub result: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&VotingStartedRelay> for LiveVoting {
    fn from(r: &VotingStartedRelay) -> Self {
        Self {
            chamber_id: r.chamber_id,
            pauta_id: r.pauta_id,
            pauta_name: r.pauta_name.clone(),
            pauta_description: r.pauta_description.clone(),
            session_name: Some(r.session_name.clone()),
            session_kind: Some(r.session_kind.clone()),
            session_starts_at: Some(r.session_starts_at.clone()),
            legislators_online: r.legislators_online.unwrap_or(0),
            status: LiveStatus::Started,
            is_live: true,
            result: None,
            timestamp: r.timestamp,
        }
    }
}

impl From<&VotingEndedRelay> for LiveVoting {
    fn from(r: &VotingEndedRelay) -> Self {
        Self {
            chamber_id: r.chamber_id,
            pauta_id: r.pauta_id,
            pauta_name: r.pauta_name.clone(),
            pauta_description: None,
            session_name: None,
            session_kind: None,
            session_starts_at: None,
            legislators_online: 0,
            status: LiveStatus::Ended,
            is_live: false,
            result: r.result.clone(),
            timestamp: r.timestamp,
        }
    }
}
