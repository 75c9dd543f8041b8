use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Ballot, ChamberId, LegislatorId, PautaId, SpeakerId, Tally};
use crate::relay::{LiveVoting, StatusChange};

/// Who cast a vote, as shown to other legislators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterInfo {
    pub id: LegislatorId,
    pub name: String,
    pub is_president: bool,
}

/// Events sent FROM server TO clients over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Sent once, right after the handshake is admitted
    ConnectionStatus {
        connected: bool,
        is_public: bool,
        chamber_id: Option<ChamberId>,
        connected_users: usize,
        legislators_online: usize,
        timestamp: DateTime<Utc>,
    },

    /// Another legislator of the same chamber connected
    PeerConnected {
        vereador_id: LegislatorId,
        name: String,
        is_president: bool,
        timestamp: DateTime<Utc>,
    },

    /// A legislator of the same chamber disconnected
    PeerDisconnected {
        vereador_id: LegislatorId,
        name: String,
        timestamp: DateTime<Utc>,
    },

    PautaJoined {
        pauta_id: PautaId,
        pauta_name: String,
        timestamp: DateTime<Utc>,
    },

    PautaLeft {
        pauta_id: PautaId,
        timestamp: DateTime<Utc>,
    },

    /// Joined a portal or TV room
    RoomJoined {
        room: String,
        timestamp: DateTime<Utc>,
    },

    RoomLeft {
        room: String,
        timestamp: DateTime<Utc>,
    },

    /// Fresh vote counts for a pauta
    PautaStatsUpdate {
        pauta_id: PautaId,
        tally: Tally,
        timestamp: DateTime<Utc>,
    },

    /// Full vote payload, for the legislators' chamber room
    VoteNotification {
        pauta_id: PautaId,
        vereador: VoterInfo,
        ballot: Ballot,
        is_update: bool,
        timestamp: DateTime<Utc>,
    },

    /// Vote payload for portals and TVs
    VoteNotificationPublic {
        pauta_id: PautaId,
        vereador_name: String,
        ballot: Ballot,
        is_update: bool,
        timestamp: DateTime<Utc>,
    },

    /// Status change, chamber-wide
    PautaStatusNotification(StatusChange),

    /// Status change, for viewers of that pauta
    PautaStatusUpdate(StatusChange),

    /// Tablets switch to the voting screen
    StartVoting {
        chamber_id: ChamberId,
        pauta_id: PautaId,
        pauta_name: String,
        legislators_online: Option<usize>,
        timestamp: DateTime<Utc>,
    },

    /// Tablets return to the dashboard
    EndVoting {
        chamber_id: ChamberId,
        pauta_id: PautaId,
        pauta_name: String,
        result: Option<String>,
        timestamp: DateTime<Utc>,
    },

    StartSpeech {
        chamber_id: ChamberId,
        speaker_id: SpeakerId,
        speaker_name: String,
        session_name: String,
        speaking_minutes: i64,
        timestamp: DateTime<Utc>,
    },

    /// Session state for the public portal
    LiveVotingUpdate(LiveVoting),

    Pong {
        timestamp: DateTime<Utc>,
    },

    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientCommand {
    /// Receive tally updates for a pauta
    JoinPauta { pauta_id: PautaId },

    LeavePauta { pauta_id: PautaId },

    /// Public portal room of a chamber
    JoinPortal { chamber_id: ChamberId },

    LeavePortal,

    /// TV room of a chamber; needs a TV credential
    JoinTv { chamber_id: ChamberId },

    LeaveTv,

    Ping,
}
