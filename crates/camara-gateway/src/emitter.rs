use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use camara_db::Directory;
use camara_types::events::{ServerEvent, VoterInfo};
use camara_types::models::{Ballot, ChamberId, Pauta, PautaId, Role, Speaker, SpeakerId};
use camara_types::relay::{
    LiveVoting, RelayEvent, SpeechRelay, StatusChange, TallyRelay, VoteRelay, VotingEndedRelay,
    VotingStartedRelay,
};

use crate::registry::{ConnectionId, Identity, Room, RoomError, RoomRegistry};
use crate::relay::RelayPublisher;
use crate::snapshot::SnapshotCache;
use crate::tally::TallyReader;
use crate::{HubKind, blocking};

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("pauta {0} not found")]
    PautaNotFound(PautaId),
    #[error("speaker {0} not found")]
    SpeakerNotFound(SpeakerId),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Turns domain events into room emissions on this process's hub and
/// relay publications to the other process.
///
/// Methods named after an action (`vote_cast`, `begin_voting`, ...) are for
/// events that originate here and always re-read the pauta or speaker to
/// find its chamber. `on_*` methods take payloads from the peer process and
/// trust the ids they carry.
#[derive(Clone)]
pub struct Emitter {
    hub: HubKind,
    registry: Arc<RoomRegistry>,
    directory: Arc<dyn Directory>,
    tally: TallyReader,
    relay: Arc<dyn RelayPublisher>,
    snapshots: Arc<SnapshotCache>,
}

impl Emitter {
    pub fn new(
        hub: HubKind,
        registry: Arc<RoomRegistry>,
        directory: Arc<dyn Directory>,
        relay: Arc<dyn RelayPublisher>,
    ) -> Self {
        Self {
            hub,
            registry,
            tally: TallyReader::new(directory.clone()),
            directory,
            relay,
            snapshots: Arc::new(SnapshotCache::new()),
        }
    }

    pub fn snapshots(&self) -> &SnapshotCache {
        &self.snapshots
    }

    async fn lookup_pauta(&self, pauta_id: PautaId) -> Result<Pauta, EmitError> {
        let directory = self.directory.clone();
        blocking(move || directory.pauta(pauta_id))
            .await?
            .ok_or(EmitError::PautaNotFound(pauta_id))
    }

    async fn lookup_speaker(&self, speaker_id: SpeakerId) -> Result<Speaker, EmitError> {
        let directory = self.directory.clone();
        blocking(move || directory.speaker(speaker_id))
            .await?
            .ok_or(EmitError::SpeakerNotFound(speaker_id))
    }

    // -- Originating events --

    /// A vote was stored. Notifies locally, relays, then pushes a fresh tally.
    pub async fn vote_cast(
        &self,
        pauta_id: PautaId,
        voter: VoterInfo,
        ballot: Ballot,
        is_update: bool,
    ) -> Result<(), EmitError> {
        let pauta = self.lookup_pauta(pauta_id).await?;

        let vote = VoteRelay {
            chamber_id: pauta.chamber_id,
            pauta_id,
            legislator_id: voter.id,
            legislator_name: voter.name,
            is_president: voter.is_president,
            ballot,
            is_update,
            timestamp: Utc::now(),
        };
        self.on_vote(&vote);
        self.relay.publish(RelayEvent::Vote(vote));

        self.push_tally(pauta.chamber_id, pauta_id).await;
        Ok(())
    }

    async fn push_tally(&self, chamber_id: ChamberId, pauta_id: PautaId) {
        match self.tally.read(pauta_id).await {
            Ok(tally) => {
                let update = TallyRelay {
                    chamber_id,
                    pauta_id,
                    tally,
                    timestamp: Utc::now(),
                };
                self.on_tally(&update);
                self.relay.publish(RelayEvent::Tally(update));
            }
            Err(e) => {
                warn!("tally read for pauta {} failed: {}", pauta_id, e);
                self.registry.send_to_room(
                    Room::Pauta(pauta_id),
                    &ServerEvent::error("Erro ao atualizar contagem de votos"),
                );
            }
        }
    }

    /// The pauta's status was written. The new status, result and chamber
    /// come from a fresh read.
    pub async fn pauta_status_changed(
        &self,
        pauta_id: PautaId,
        old_status: String,
    ) -> Result<StatusChange, EmitError> {
        let pauta = self.lookup_pauta(pauta_id).await?;

        let change = StatusChange {
            chamber_id: pauta.chamber_id,
            pauta_id,
            pauta_name: pauta.name,
            old_status,
            new_status: pauta.status,
            result: pauta.result,
            timestamp: Utc::now(),
        };
        self.on_pauta_status(&change);
        self.relay.publish(RelayEvent::PautaStatus(change.clone()));
        Ok(change)
    }

    /// Only the tablet process can count legislators, so the start is
    /// handled there and the web process hears about it on the way back.
    pub async fn begin_voting(&self, pauta_id: PautaId) -> Result<VotingStartedRelay, EmitError> {
        let pauta = self.lookup_pauta(pauta_id).await?;

        let started = VotingStartedRelay {
            chamber_id: pauta.chamber_id,
            pauta_id,
            pauta_name: pauta.name,
            pauta_description: pauta.description,
            session_name: pauta.session.name,
            session_kind: pauta.session.kind,
            session_starts_at: pauta.session.starts_at,
            legislators_online: None,
            timestamp: Utc::now(),
        };
        match self.hub {
            HubKind::Tablet => self.on_voting_started(started.clone()),
            HubKind::Public => self.relay.publish(RelayEvent::VotingStarted(started.clone())),
        }
        Ok(started)
    }

    pub async fn end_voting(
        &self,
        pauta_id: PautaId,
        result: Option<String>,
    ) -> Result<VotingEndedRelay, EmitError> {
        let pauta = self.lookup_pauta(pauta_id).await?;

        let ended = VotingEndedRelay {
            chamber_id: pauta.chamber_id,
            pauta_id,
            pauta_name: pauta.name,
            result: result.or(pauta.result),
            timestamp: Utc::now(),
        };
        match self.hub {
            HubKind::Tablet => self.on_voting_ended(ended.clone()),
            HubKind::Public => self.relay.publish(RelayEvent::VotingEnded(ended.clone())),
        }
        Ok(ended)
    }

    pub async fn begin_speech(&self, speaker_id: SpeakerId) -> Result<SpeechRelay, EmitError> {
        let speaker = self.lookup_speaker(speaker_id).await?;

        let speech = SpeechRelay {
            chamber_id: speaker.chamber_id,
            speaker_id,
            speaker_name: speaker.name,
            session_name: speaker.session_name,
            speaking_minutes: speaker.speaking_minutes,
            timestamp: Utc::now(),
        };
        self.on_speech_started(&speech);
        self.relay.publish(RelayEvent::SpeechStarted(speech.clone()));
        Ok(speech)
    }

    // -- Relayed events --

    pub fn on_vote(&self, vote: &VoteRelay) {
        match self.hub {
            HubKind::Tablet => {
                let event = ServerEvent::VoteNotification {
                    pauta_id: vote.pauta_id,
                    vereador: VoterInfo {
                        id: vote.legislator_id,
                        name: vote.legislator_name.clone(),
                        is_president: vote.is_president,
                    },
                    ballot: vote.ballot,
                    is_update: vote.is_update,
                    timestamp: vote.timestamp,
                };
                self.registry
                    .send_to_room(Room::Chamber(vote.chamber_id), &event);
            }
            HubKind::Public => {
                let event = ServerEvent::VoteNotificationPublic {
                    pauta_id: vote.pauta_id,
                    vereador_name: vote.legislator_name.clone(),
                    ballot: vote.ballot,
                    is_update: vote.is_update,
                    timestamp: vote.timestamp,
                };
                self.registry.send_to_rooms(
                    &[Room::Pauta(vote.pauta_id), Room::Tv(vote.chamber_id)],
                    &event,
                );
            }
        }
        debug!(
            "vote on pauta {} by {} fanned out",
            vote.pauta_id, vote.legislator_id
        );
    }

    pub fn on_tally(&self, update: &TallyRelay) {
        let event = ServerEvent::PautaStatsUpdate {
            pauta_id: update.pauta_id,
            tally: update.tally,
            timestamp: update.timestamp,
        };
        let rooms = match self.hub {
            HubKind::Tablet => vec![Room::Pauta(update.pauta_id)],
            HubKind::Public => vec![
                Room::Pauta(update.pauta_id),
                Room::Tv(update.chamber_id),
                Room::Portal(update.chamber_id),
            ],
        };
        self.registry.send_to_rooms(&rooms, &event);
    }

    pub fn on_pauta_status(&self, change: &StatusChange) {
        let notification = ServerEvent::PautaStatusNotification(change.clone());
        match self.hub {
            HubKind::Tablet => {
                self.registry
                    .send_to_room(Room::Chamber(change.chamber_id), &notification);
            }
            HubKind::Public => {
                self.registry.send_to_rooms(
                    &[Room::Portal(change.chamber_id), Room::Tv(change.chamber_id)],
                    &notification,
                );
            }
        }
        self.registry.send_to_room(
            Room::Pauta(change.pauta_id),
            &ServerEvent::PautaStatusUpdate(change.clone()),
        );
        info!(
            "pauta {} status {} -> {}",
            change.pauta_id, change.old_status, change.new_status
        );
    }

    /// Tablet: open the voting screen, count who is present and report back.
    /// Web: remember the session, tell everyone and the TV.
    pub fn on_voting_started(&self, mut started: VotingStartedRelay) {
        match self.hub {
            HubKind::Tablet => {
                let online = self.registry.count_legislators_online(started.chamber_id);
                started.legislators_online = Some(online);
                self.registry.send_to_room(
                    Room::Chamber(started.chamber_id),
                    &ServerEvent::StartVoting {
                        chamber_id: started.chamber_id,
                        pauta_id: started.pauta_id,
                        pauta_name: started.pauta_name.clone(),
                        legislators_online: Some(online),
                        timestamp: started.timestamp,
                    },
                );
                info!(
                    "voting opened on pauta {} with {} legislators online",
                    started.pauta_id, online
                );
                self.relay.publish(RelayEvent::VotingStarted(started));
            }
            HubKind::Public => {
                let snapshot = LiveVoting::from(&started);
                if !self.snapshots.record(snapshot.clone()) {
                    return;
                }
                self.registry
                    .broadcast(&ServerEvent::LiveVotingUpdate(snapshot));
                self.registry.send_to_room(
                    Room::Tv(started.chamber_id),
                    &ServerEvent::StartVoting {
                        chamber_id: started.chamber_id,
                        pauta_id: started.pauta_id,
                        pauta_name: started.pauta_name,
                        legislators_online: started.legislators_online,
                        timestamp: started.timestamp,
                    },
                );
            }
        }
    }

    pub fn on_voting_ended(&self, ended: VotingEndedRelay) {
        let event = ServerEvent::EndVoting {
            chamber_id: ended.chamber_id,
            pauta_id: ended.pauta_id,
            pauta_name: ended.pauta_name.clone(),
            result: ended.result.clone(),
            timestamp: ended.timestamp,
        };
        match self.hub {
            HubKind::Tablet => {
                self.registry
                    .send_to_room(Room::Chamber(ended.chamber_id), &event);
                info!("voting closed on pauta {}", ended.pauta_id);
                self.relay.publish(RelayEvent::VotingEnded(ended));
            }
            HubKind::Public => {
                let snapshot = LiveVoting::from(&ended);
                self.snapshots.record(snapshot.clone());
                self.registry
                    .broadcast(&ServerEvent::LiveVotingUpdate(snapshot));
                self.registry.send_to_room(Room::Tv(ended.chamber_id), &event);
            }
        }
    }

    pub fn on_speech_started(&self, speech: &SpeechRelay) {
        let event = ServerEvent::StartSpeech {
            chamber_id: speech.chamber_id,
            speaker_id: speech.speaker_id,
            speaker_name: speech.speaker_name.clone(),
            session_name: speech.session_name.clone(),
            speaking_minutes: speech.speaking_minutes,
            timestamp: speech.timestamp,
        };
        let rooms = match self.hub {
            HubKind::Tablet => vec![Room::Chamber(speech.chamber_id)],
            HubKind::Public => vec![Room::Tv(speech.chamber_id), Room::Portal(speech.chamber_id)],
        };
        self.registry.send_to_rooms(&rooms, &event);
    }

    // -- Client requests --

    /// Validate the pauta against the connection's chamber, join its room
    /// and push the current tally to the caller only.
    pub async fn join_pauta(&self, conn: ConnectionId, pauta_id: PautaId) {
        let Some(chamber_id) = self.registry.context_chamber(conn) else {
            self.registry.send_to(
                conn,
                ServerEvent::error("Acesso negado - nenhuma câmara selecionada"),
            );
            return;
        };

        let pauta = match self.lookup_pauta(pauta_id).await {
            Ok(pauta) => pauta,
            Err(EmitError::PautaNotFound(_)) => {
                self.registry
                    .send_to(conn, ServerEvent::error("Pauta não encontrada"));
                return;
            }
            Err(e) => {
                warn!("join-pauta {} lookup failed: {}", pauta_id, e);
                self.registry
                    .send_to(conn, ServerEvent::error("Erro ao entrar na pauta"));
                return;
            }
        };

        if pauta.chamber_id != chamber_id {
            warn!(
                "connection {} (chamber {}) tried to join pauta {} of chamber {}",
                conn, chamber_id, pauta_id, pauta.chamber_id
            );
            self.registry.send_to(
                conn,
                ServerEvent::error("Acesso negado - pauta de outra câmara"),
            );
            return;
        }

        if self.registry.join_pauta(conn, pauta_id).is_err() {
            debug!("connection {} left before joining pauta {}", conn, pauta_id);
            return;
        }
        self.registry.send_to(
            conn,
            ServerEvent::PautaJoined {
                pauta_id,
                pauta_name: pauta.name,
                timestamp: Utc::now(),
            },
        );

        match self.tally.read(pauta_id).await {
            Ok(tally) => {
                self.registry.send_to(
                    conn,
                    ServerEvent::PautaStatsUpdate {
                        pauta_id,
                        tally,
                        timestamp: Utc::now(),
                    },
                );
            }
            Err(e) => {
                warn!("tally read for pauta {} failed: {}", pauta_id, e);
                self.registry.send_to(
                    conn,
                    ServerEvent::error("Erro ao carregar contagem de votos"),
                );
            }
        }
    }

    pub fn leave_pauta(&self, conn: ConnectionId, pauta_id: PautaId) {
        self.registry.leave_pauta(conn, pauta_id);
        self.registry.send_to(
            conn,
            ServerEvent::PautaLeft {
                pauta_id,
                timestamp: Utc::now(),
            },
        );
    }

    pub fn join_portal(&self, conn: ConnectionId, chamber_id: ChamberId) {
        self.enter_room(conn, Room::Portal(chamber_id));
    }

    /// TV rooms need a TV credential bound to the same chamber.
    pub fn join_tv(&self, conn: ConnectionId, chamber_id: ChamberId) {
        let allowed = match self.registry.identity(conn) {
            Some(Identity::Viewer(cred)) => {
                cred.role == Role::Tv && cred.chamber_id == Some(chamber_id)
            }
            _ => false,
        };
        if !allowed {
            warn!("connection {} refused TV room of chamber {}", conn, chamber_id);
            self.registry.send_to(
                conn,
                ServerEvent::error("Acesso negado - credencial de TV inválida"),
            );
            return;
        }
        self.enter_room(conn, Room::Tv(chamber_id));
    }

    fn enter_room(&self, conn: ConnectionId, room: Room) {
        if self.hub != HubKind::Public {
            self.registry
                .send_to(conn, ServerEvent::error("Sala indisponível neste servidor"));
            return;
        }
        match self.registry.enter_scope(conn, room) {
            Ok(previous) => {
                let now = Utc::now();
                if let Some(old) = previous {
                    self.registry.send_to(
                        conn,
                        ServerEvent::RoomLeft {
                            room: old.name(),
                            timestamp: now,
                        },
                    );
                }
                self.registry.send_to(
                    conn,
                    ServerEvent::RoomJoined {
                        room: room.name(),
                        timestamp: now,
                    },
                );
            }
            Err(RoomError::Gone) => {}
            Err(e) => {
                debug!("connection {} cannot enter {}: {}", conn, room.name(), e);
                self.registry.send_to(
                    conn,
                    ServerEvent::error("Acesso negado - vereadores ficam na sala da câmara"),
                );
            }
        }
    }

    pub fn leave_portal(&self, conn: ConnectionId) {
        self.leave_room(conn, |room| matches!(room, Room::Portal(_)));
    }

    pub fn leave_tv(&self, conn: ConnectionId) {
        self.leave_room(conn, |room| matches!(room, Room::Tv(_)));
    }

    fn leave_room(&self, conn: ConnectionId, kind: impl Fn(&Room) -> bool) {
        let Some(room) = self.registry.scope_of(conn).filter(|r| kind(r)) else {
            return;
        };
        if self.registry.leave_scope(conn, room) {
            self.registry.send_to(
                conn,
                ServerEvent::RoomLeft {
                    room: room.name(),
                    timestamp: Utc::now(),
                },
            );
        }
    }

    pub fn pong(&self, conn: ConnectionId) {
        self.registry.send_to(
            conn,
            ServerEvent::Pong {
                timestamp: Utc::now(),
            },
        );
    }
}
