use std::sync::Arc;

use camara_db::Directory;
use camara_types::models::{PautaId, Tally};

use crate::blocking;

/// Fresh vote counts straight from the store. Nothing is cached.
#[derive(Clone)]
pub struct TallyReader {
    directory: Arc<dyn Directory>,
}

impl TallyReader {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    pub async fn read(&self, pauta_id: PautaId) -> anyhow::Result<Tally> {
        let directory = self.directory.clone();
        let ballots = blocking(move || directory.ballots(pauta_id)).await?;
        Ok(ballots.into_iter().collect())
    }
}
