use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type ChamberId = i64;
pub type SessionId = i64;
pub type PautaId = i64;
pub type LegislatorId = i64;
pub type SpeakerId = i64;
pub type PartyId = i64;

/// Pauta status values written by the admin side.
pub mod status {
    pub const PENDING: &str = "Pendente";
    pub const VOTING: &str = "Em Votação";
    pub const FINISHED: &str = "Finalizada";
}

/// One of the three valid ballot values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ballot {
    #[serde(rename = "SIM", alias = "Sim")]
    Yes,
    #[serde(rename = "NÃO", alias = "Não")]
    No,
    #[serde(rename = "ABSTENÇÃO", alias = "Abstenção")]
    Abstain,
}

#[derive(Debug, Error)]
#[error("unknown ballot value '{0}'")]
pub struct UnknownBallot(pub String);

impl Ballot {
    /// Storage/wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "SIM",
            Self::No => "NÃO",
            Self::Abstain => "ABSTENÇÃO",
        }
    }
}

impl FromStr for Ballot {
    type Err = UnknownBallot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SIM" | "Sim" => Ok(Self::Yes),
            "NÃO" | "Não" => Ok(Self::No),
            "ABSTENÇÃO" | "Abstenção" => Ok(Self::Abstain),
            other => Err(UnknownBallot(other.to_string())),
        }
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated vote counts for one pauta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub total: usize,
    pub yes: usize,
    pub no: usize,
    pub abstain: usize,
}

impl Tally {
    pub fn record(&mut self, ballot: Ballot) {
        self.total += 1;
        match ballot {
            Ballot::Yes => self.yes += 1,
            Ballot::No => self.no += 1,
            Ballot::Abstain => self.abstain += 1,
        }
    }
}

impl FromIterator<Ballot> for Tally {
    fn from_iter<I: IntoIterator<Item = Ballot>>(iter: I) -> Self {
        let mut tally = Tally::default();
        for ballot in iter {
            tally.record(ballot);
        }
        tally
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Legislator,
    Admin,
    Tv,
    Other(String),
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "vereador" => Self::Legislator,
            "admin" => Self::Admin,
            "tv" => Self::Tv,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Legislator => "vereador",
            Self::Admin => "admin",
            Self::Tv => "tv",
            Self::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: Uuid,
    pub role: Role,
    pub chamber_id: Option<ChamberId>,
    pub display_name: String,
    /// Tokens issued before this instant (unix seconds) are superseded.
    pub min_token_iat: i64,
}

#[derive(Debug, Clone)]
pub struct Legislator {
    pub id: LegislatorId,
    pub profile_id: Uuid,
    pub chamber_id: ChamberId,
    pub name: String,
    pub is_president: bool,
    pub is_vice_president: bool,
    pub party_id: Option<PartyId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    pub name: String,
    pub kind: String,
    pub starts_at: String,
}

#[derive(Debug, Clone)]
pub struct Pauta {
    pub id: PautaId,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub result: Option<String>,
    pub chamber_id: ChamberId,
    pub session: SessionInfo,
}

#[derive(Debug, Clone)]
pub struct Speaker {
    pub id: SpeakerId,
    pub legislator_id: LegislatorId,
    pub name: String,
    pub chamber_id: ChamberId,
    pub session_name: String,
    pub speaking_minutes: i64,
}
