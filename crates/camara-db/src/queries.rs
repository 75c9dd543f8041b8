use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;
use uuid::Uuid;

use camara_types::models::{
    Ballot, ChamberId, Legislator, LegislatorId, PartyId, Pauta, PautaId, Profile, Role,
    SessionId, SessionInfo, Speaker, SpeakerId,
};

use crate::Database;
use crate::directory::{Directory, VoteOutcome};

impl Directory for Database {
    fn profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.with_conn(|conn| query_profile(conn, user_id))
    }

    fn legislator_for_profile(&self, user_id: Uuid) -> Result<Option<Legislator>> {
        self.with_conn(|conn| query_legislator(conn, user_id))
    }

    fn pauta(&self, pauta_id: PautaId) -> Result<Option<Pauta>> {
        self.with_conn(|conn| query_pauta(conn, pauta_id))
    }

    fn ballots(&self, pauta_id: PautaId) -> Result<Vec<Ballot>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT ballot FROM votes WHERE pauta_id = ?1")?;
            let raw = stmt
                .query_map([pauta_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(raw
                .into_iter()
                .filter_map(|value| match value.parse::<Ballot>() {
                    Ok(ballot) => Some(ballot),
                    Err(e) => {
                        warn!("Skipping vote on pauta {}: {}", pauta_id, e);
                        None
                    }
                })
                .collect())
        })
    }

    fn record_vote(
        &self,
        pauta_id: PautaId,
        legislator: &Legislator,
        ballot: Ballot,
    ) -> Result<VoteOutcome> {
        self.with_conn(|conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM votes WHERE pauta_id = ?1 AND legislator_id = ?2",
                    rusqlite::params![pauta_id, legislator.id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(vote_id) = existing {
                conn.execute(
                    "UPDATE votes
                     SET ballot = ?1, was_president = ?2, was_vice_president = ?3, party_id = ?4
                     WHERE id = ?5",
                    rusqlite::params![
                        ballot.as_str(),
                        legislator.is_president,
                        legislator.is_vice_president,
                        legislator.party_id,
                        vote_id
                    ],
                )?;
                Ok(VoteOutcome::Updated)
            } else {
                conn.execute(
                    "INSERT INTO votes (pauta_id, legislator_id, ballot, was_president, was_vice_president, party_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        pauta_id,
                        legislator.id,
                        ballot.as_str(),
                        legislator.is_president,
                        legislator.is_vice_president,
                        legislator.party_id
                    ],
                )?;
                Ok(VoteOutcome::Created)
            }
        })
    }

    fn set_pauta_status(
        &self,
        pauta_id: PautaId,
        status: &str,
        result: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE pautas SET status = ?1, result = COALESCE(?2, result) WHERE id = ?3",
                rusqlite::params![status, result, pauta_id],
            )?;
            Ok(())
        })
    }

    fn speaker(&self, speaker_id: SpeakerId) -> Result<Option<Speaker>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT sp.id, sp.legislator_id, l.parliamentary_name, s.chamber_id, s.name, sp.speaking_minutes
                     FROM speakers sp
                     JOIN legislators l ON l.id = sp.legislator_id
                     JOIN sessions s ON s.id = sp.session_id
                     WHERE sp.id = ?1",
                    [speaker_id],
                    |row| {
                        Ok(Speaker {
                            id: row.get(0)?,
                            legislator_id: row.get(1)?,
                            name: row.get(2)?,
                            chamber_id: row.get(3)?,
                            session_name: row.get(4)?,
                            speaking_minutes: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }
}

// -- Seeding --
//
// Chamber administration lives outside this system; these helpers exist so
// a fresh database (and every test) can be populated.

impl Database {
    pub fn create_chamber(&self, id: ChamberId, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chambers (id, name) VALUES (?1, ?2)",
                rusqlite::params![id, name],
            )?;
            Ok(())
        })
    }

    pub fn create_profile(
        &self,
        user_id: Uuid,
        role: &Role,
        chamber_id: Option<ChamberId>,
        display_name: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, role, chamber_id, display_name) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id.to_string(), role.as_str(), chamber_id, display_name],
            )?;
            Ok(())
        })
    }

    /// Invalidate every token issued before `iat` (a newer login happened).
    pub fn set_min_token_iat(&self, user_id: Uuid, iat: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE profiles SET min_token_iat = ?1 WHERE id = ?2",
                rusqlite::params![iat, user_id.to_string()],
            )?;
            Ok(())
        })
    }

    pub fn create_legislator(&self, legislator: &Legislator) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO legislators (id, profile_id, chamber_id, parliamentary_name, is_president, is_vice_president, party_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    legislator.id,
                    legislator.profile_id.to_string(),
                    legislator.chamber_id,
                    legislator.name,
                    legislator.is_president,
                    legislator.is_vice_president,
                    legislator.party_id
                ],
            )?;
            Ok(())
        })
    }

    pub fn create_session(
        &self,
        id: SessionId,
        chamber_id: ChamberId,
        name: &str,
        kind: &str,
        starts_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, chamber_id, name, kind, starts_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, chamber_id, name, kind, starts_at],
            )?;
            Ok(())
        })
    }

    pub fn create_pauta(
        &self,
        id: PautaId,
        session_id: SessionId,
        name: &str,
        status: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pautas (id, session_id, name, status) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, session_id, name, status],
            )?;
            Ok(())
        })
    }

    pub fn create_speaker(
        &self,
        id: SpeakerId,
        session_id: SessionId,
        legislator_id: LegislatorId,
        speaking_minutes: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO speakers (id, session_id, legislator_id, speaking_minutes) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, session_id, legislator_id, speaking_minutes],
            )?;
            Ok(())
        })
    }
}

fn query_profile(conn: &Connection, user_id: Uuid) -> Result<Option<Profile>> {
    let mut stmt = conn.prepare(
        "SELECT role, chamber_id, display_name, min_token_iat FROM profiles WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([user_id.to_string()], |row| {
            Ok(Profile {
                user_id,
                role: Role::parse(&row.get::<_, String>(0)?),
                chamber_id: row.get(1)?,
                display_name: row.get(2)?,
                min_token_iat: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_legislator(conn: &Connection, user_id: Uuid) -> Result<Option<Legislator>> {
    let mut stmt = conn.prepare(
        "SELECT id, chamber_id, parliamentary_name, is_president, is_vice_president, party_id
         FROM legislators WHERE profile_id = ?1",
    )?;

    let row = stmt
        .query_row([user_id.to_string()], |row| {
            Ok(Legislator {
                id: row.get(0)?,
                profile_id: user_id,
                chamber_id: row.get(1)?,
                name: row.get(2)?,
                is_president: row.get(3)?,
                is_vice_president: row.get(4)?,
                party_id: row.get::<_, Option<PartyId>>(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_pauta(conn: &Connection, pauta_id: PautaId) -> Result<Option<Pauta>> {
    // JOIN sessions: a pauta's chamber is the chamber of its session
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, p.description, p.status, p.result,
                s.chamber_id, s.id, s.name, s.kind, s.starts_at
         FROM pautas p
         JOIN sessions s ON s.id = p.session_id
         WHERE p.id = ?1",
    )?;

    let row = stmt
        .query_row([pauta_id], |row| {
            Ok(Pauta {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                status: row.get(3)?,
                result: row.get(4)?,
                chamber_id: row.get(5)?,
                session: SessionInfo {
                    id: row.get(6)?,
                    name: row.get(7)?,
                    kind: row.get(8)?,
                    starts_at: row.get(9)?,
                },
            })
        })
        .optional()?;

    Ok(row)
}
