use anyhow::Result;
use uuid::Uuid;

use camara_types::models::{Ballot, Legislator, Pauta, PautaId, Profile, Speaker, SpeakerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Created,
    Updated,
}

/// The narrow slice of the chamber data store the notification core reads
/// from, plus the writes performed by the triggering endpoints.
///
/// Calls are blocking; async callers run them on the blocking pool.
pub trait Directory: Send + Sync + 'static {
    fn profile(&self, user_id: Uuid) -> Result<Option<Profile>>;

    fn legislator_for_profile(&self, user_id: Uuid) -> Result<Option<Legislator>>;

    /// Pauta together with the chamber that owns its session.
    fn pauta(&self, pauta_id: PautaId) -> Result<Option<Pauta>>;

    /// Every ballot cast on a pauta.
    fn ballots(&self, pauta_id: PautaId) -> Result<Vec<Ballot>>;

    /// Insert or replace the legislator's vote on a pauta.
    fn record_vote(
        &self,
        pauta_id: PautaId,
        legislator: &Legislator,
        ballot: Ballot,
    ) -> Result<VoteOutcome>;

    fn set_pauta_status(&self, pauta_id: PautaId, status: &str, result: Option<&str>)
    -> Result<()>;

    fn speaker(&self, speaker_id: SpeakerId) -> Result<Option<Speaker>>;
}
