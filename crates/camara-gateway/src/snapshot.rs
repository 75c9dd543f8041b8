use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use camara_types::models::{ChamberId, PautaId};
use camara_types::relay::{LiveStatus, LiveVoting};

/// How long an ended session keeps out late `started` relays.
const TOMBSTONE_TTL: Duration = Duration::from_secs(600);

enum Entry {
    Live(LiveVoting),
    /// Session ended at `at` (relay timestamp); `recorded` drives expiry.
    Ended { at: DateTime<Utc>, recorded: Instant },
}

/// Last relayed session state per `(chamber, pauta)`, read by the polling
/// endpoint. Last writer wins, except that a `started` stamped no later than
/// a known end is stale and ignored. End markers expire after a while.
#[derive(Default)]
pub struct SnapshotCache {
    entries: Mutex<HashMap<(ChamberId, PautaId), Entry>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(ChamberId, PautaId), Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `false` when the snapshot was stale and dropped.
    pub fn record(&self, snapshot: LiveVoting) -> bool {
        self.record_at(snapshot, Instant::now())
    }

    fn record_at(&self, snapshot: LiveVoting, now: Instant) -> bool {
        let key = (snapshot.chamber_id, snapshot.pauta_id);
        let mut entries = self.lock();
        entries.retain(|_, entry| match entry {
            Entry::Live(_) => true,
            Entry::Ended { recorded, .. } => now.duration_since(*recorded) < TOMBSTONE_TTL,
        });

        match snapshot.status {
            LiveStatus::Started => {
                if let Some(Entry::Ended { at, .. }) = entries.get(&key) {
                    if snapshot.timestamp <= *at {
                        debug!(
                            "stale start for pauta {} ignored (ended at {})",
                            snapshot.pauta_id, at
                        );
                        return false;
                    }
                }
                entries.insert(key, Entry::Live(snapshot));
            }
            LiveStatus::Ended => {
                entries.insert(
                    key,
                    Entry::Ended {
                        at: snapshot.timestamp,
                        recorded: now,
                    },
                );
            }
        }
        true
    }

    /// Sessions currently live in a chamber, oldest first.
    pub fn live_for(&self, chamber_id: ChamberId) -> Vec<LiveVoting> {
        let mut live: Vec<LiveVoting> = self
            .lock()
            .values()
            .filter_map(|entry| match entry {
                Entry::Live(s) if s.chamber_id == chamber_id => Some(s.clone()),
                _ => None,
            })
            .collect();
        live.sort_by_key(|s| (s.timestamp, s.pauta_id));
        live
    }

    /// Entries held, end markers included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use camara_types::relay::{VotingEndedRelay, VotingStartedRelay};
    use chrono::Utc;

    fn started(chamber_id: ChamberId, pauta_id: PautaId, online: usize) -> LiveVoting {
        LiveVoting::from(&VotingStartedRelay {
            chamber_id,
            pauta_id,
            pauta_name: format!("PL {}", pauta_id),
            pauta_description: None,
            session_name: "Ordinária".into(),
            session_kind: "ordinaria".into(),
            session_starts_at: "2025-03-01T19:00:00Z".into(),
            legislators_online: Some(online),
            timestamp: Utc::now(),
        })
    }

    fn ended(chamber_id: ChamberId, pauta_id: PautaId) -> LiveVoting {
        LiveVoting::from(&VotingEndedRelay {
            chamber_id,
            pauta_id,
            pauta_name: format!("PL {}", pauta_id),
            result: Some("Aprovada".into()),
            timestamp: Utc::now(),
        })
    }

    fn stamped(mut snapshot: LiveVoting, offset_secs: i64) -> LiveVoting {
        snapshot.timestamp += chrono::Duration::seconds(offset_secs);
        snapshot
    }

    #[test]
    fn latest_write_wins() {
        let cache = SnapshotCache::new();
        cache.record(started(7, 42, 3));
        cache.record(started(7, 42, 9));

        let live = cache.live_for(7);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].legislators_online, 9);
    }

    #[test]
    fn ended_session_leaves_polling() {
        let cache = SnapshotCache::new();
        cache.record(started(7, 42, 3));
        cache.record(ended(7, 42));

        assert!(cache.live_for(7).is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn late_start_after_end_is_ignored() {
        let cache = SnapshotCache::new();
        let start = started(7, 42, 3);
        assert!(cache.record(stamped(ended(7, 42), 60)));

        assert!(!cache.record(start));
        assert!(cache.live_for(7).is_empty());
    }

    #[test]
    fn newer_start_reopens_an_ended_pauta() {
        let cache = SnapshotCache::new();
        cache.record(ended(7, 42));

        assert!(cache.record(stamped(started(7, 42, 4), 60)));
        assert_eq!(cache.live_for(7)[0].legislators_online, 4);
    }

    #[test]
    fn end_markers_expire() {
        let cache = SnapshotCache::new();
        let t0 = Instant::now();
        cache.record_at(ended(7, 42), t0);
        cache.record_at(started(8, 50, 1), t0 + TOMBSTONE_TTL);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.live_for(8).len(), 1);
    }

    #[test]
    fn chambers_do_not_leak_into_each_other() {
        let cache = SnapshotCache::new();
        cache.record(started(7, 42, 3));
        cache.record(started(8, 50, 5));

        assert_eq!(cache.live_for(7).len(), 1);
        assert_eq!(cache.live_for(8)[0].pauta_id, 50);
        assert!(cache.live_for(9).is_empty());
        assert_eq!(cache.len(), 2);
    }
}
