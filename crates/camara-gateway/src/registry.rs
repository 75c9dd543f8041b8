use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use camara_types::api::ConnectionStats;
use camara_types::events::ServerEvent;
use camara_types::models::{ChamberId, LegislatorId, PartyId, PautaId, Role};

pub type ConnectionId = Uuid;

/// A named broadcast group within one process's hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Legislators' room, bound at handshake
    Chamber(ChamberId),
    /// Public portal viewers of a chamber
    Portal(ChamberId),
    /// Chamber TV displays
    Tv(ChamberId),
    /// Opted-in viewers of one pauta's tallies
    Pauta(PautaId),
}

impl Room {
    pub fn name(&self) -> String {
        match self {
            Self::Chamber(id) => format!("camara_{}", id),
            Self::Portal(id) => format!("portal-camara-{}", id),
            Self::Tv(id) => format!("tv-camara-{}", id),
            Self::Pauta(id) => format!("pauta_{}", id),
        }
    }

    /// Chamber the room is scoped to. `None` for pauta rooms.
    pub fn chamber_id(&self) -> Option<ChamberId> {
        match self {
            Self::Chamber(id) | Self::Portal(id) | Self::Tv(id) => Some(*id),
            Self::Pauta(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustTier {
    Public,
    Legislator,
}

/// Legislator data resolved once at handshake.
#[derive(Debug, Clone)]
pub struct Seat {
    pub legislator_id: LegislatorId,
    pub user_id: Uuid,
    pub chamber_id: ChamberId,
    pub name: String,
    pub is_president: bool,
    pub is_vice_president: bool,
    pub party_id: Option<PartyId>,
}

/// A signed-in non-legislator on the public hub (TV display, admin preview).
#[derive(Debug, Clone)]
pub struct ViewerCredential {
    pub user_id: Uuid,
    pub role: Role,
    pub chamber_id: Option<ChamberId>,
}

#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Viewer(ViewerCredential),
    Legislator(Seat),
}

impl Identity {
    pub fn tier(&self) -> TrustTier {
        match self {
            Self::Legislator(_) => TrustTier::Legislator,
            _ => TrustTier::Public,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("connection is no longer registered")]
    Gone,
    #[error("legislator chamber binding is fixed at handshake")]
    BindingFixed,
    #[error("{0:?} is not a chamber-scoped room")]
    NotChamberScoped(Room),
}

struct Member {
    identity: Identity,
    /// At most one chamber-scoped room (chamber, portal or TV)
    scope: Option<Room>,
    pautas: HashSet<PautaId>,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

#[derive(Default)]
struct Rooms {
    members: HashMap<ConnectionId, Member>,
    rooms: HashMap<Room, HashSet<ConnectionId>>,
}

impl Rooms {
    fn enter(&mut self, id: ConnectionId, room: Room) {
        self.rooms.entry(room).or_default().insert(id);
    }

    fn exit(&mut self, id: ConnectionId, room: Room) {
        if let Some(set) = self.rooms.get_mut(&room) {
            set.remove(&id);
            if set.is_empty() {
                self.rooms.remove(&room);
            }
        }
    }

    fn room_size(&self, room: Room) -> usize {
        self.rooms.get(&room).map_or(0, |set| set.len())
    }

    fn legislators_in(&self, chamber_id: ChamberId) -> usize {
        let Some(set) = self.rooms.get(&Room::Chamber(chamber_id)) else {
            return 0;
        };
        set.iter()
            .filter_map(|id| self.members.get(id))
            .filter(|m| match &m.identity {
                Identity::Legislator(seat) => seat.chamber_id == chamber_id,
                _ => false,
            })
            .count()
    }

    fn send(&self, id: ConnectionId, event: ServerEvent) -> bool {
        self.members
            .get(&id)
            .is_some_and(|m| m.tx.send(event).is_ok())
    }

    fn send_room(&self, room: Room, except: Option<ConnectionId>, event: &ServerEvent) -> usize {
        let Some(set) = self.rooms.get(&room) else {
            return 0;
        };
        set.iter()
            .filter(|id| Some(**id) != except)
            .filter(|id| self.send(**id, event.clone()))
            .count()
    }
}

/// Process-local connection and room state.
///
/// Every operation takes the lock, mutates, queues outbound events on the
/// members' channels and releases it. Nothing here awaits, so each call is
/// atomic with respect to the others.
#[derive(Default)]
pub struct RoomRegistry {
    state: Mutex<Rooms>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Rooms> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an authenticated connection. Legislators enter their chamber
    /// room and are announced to the rest of it. The caller's first event is
    /// always `connection-status`.
    pub fn admit(&self, identity: Identity) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let now = Utc::now();

        let mut state = self.lock();
        let seat = match &identity {
            Identity::Legislator(seat) => Some(seat.clone()),
            _ => None,
        };
        let scope = seat.as_ref().map(|s| Room::Chamber(s.chamber_id));

        if let Some(room) = scope {
            state.enter(id, room);
        }
        state.members.insert(
            id,
            Member {
                identity,
                scope,
                pautas: HashSet::new(),
                tx,
            },
        );

        let status = match seat {
            Some(seat) => {
                let room = Room::Chamber(seat.chamber_id);
                state.send_room(
                    room,
                    Some(id),
                    &ServerEvent::PeerConnected {
                        vereador_id: seat.legislator_id,
                        name: seat.name.clone(),
                        is_president: seat.is_president,
                        timestamp: now,
                    },
                );
                ServerEvent::ConnectionStatus {
                    connected: true,
                    is_public: false,
                    chamber_id: Some(seat.chamber_id),
                    connected_users: state.room_size(room),
                    legislators_online: state.legislators_in(seat.chamber_id),
                    timestamp: now,
                }
            }
            None => ServerEvent::ConnectionStatus {
                connected: true,
                is_public: true,
                chamber_id: None,
                connected_users: state.members.len(),
                legislators_online: 0,
                timestamp: now,
            },
        };
        state.send(id, status);

        (id, rx)
    }

    /// Drop a connection and every membership it holds. Unknown ids are a
    /// no-op. Returns whether anything was removed.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let mut state = self.lock();
        let Some(member) = state.members.remove(&id) else {
            return false;
        };

        if let Some(room) = member.scope {
            state.exit(id, room);
        }
        for pauta_id in &member.pautas {
            state.exit(id, Room::Pauta(*pauta_id));
        }

        if let Identity::Legislator(seat) = &member.identity {
            state.send_room(
                Room::Chamber(seat.chamber_id),
                None,
                &ServerEvent::PeerDisconnected {
                    vereador_id: seat.legislator_id,
                    name: seat.name.clone(),
                    timestamp: Utc::now(),
                },
            );
        }

        true
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().members.contains_key(&id)
    }

    pub fn identity(&self, id: ConnectionId) -> Option<Identity> {
        self.lock().members.get(&id).map(|m| m.identity.clone())
    }

    /// The connection's chamber-scoped room, if any.
    pub fn scope_of(&self, id: ConnectionId) -> Option<Room> {
        self.lock().members.get(&id).and_then(|m| m.scope)
    }

    /// Chamber in context: the legislator's own, or the portal/TV room joined.
    pub fn context_chamber(&self, id: ConnectionId) -> Option<ChamberId> {
        self.lock()
            .members
            .get(&id)
            .and_then(|m| m.scope)
            .and_then(|room| room.chamber_id())
    }

    /// Move a viewer into a portal or TV room, leaving the previous one.
    /// Returns the room that was replaced, if any.
    pub fn enter_scope(&self, id: ConnectionId, room: Room) -> Result<Option<Room>, RoomError> {
        if !matches!(room, Room::Portal(_) | Room::Tv(_)) {
            return Err(RoomError::NotChamberScoped(room));
        }

        let mut state = self.lock();
        let member = state.members.get_mut(&id).ok_or(RoomError::Gone)?;
        if member.identity.tier() == TrustTier::Legislator {
            return Err(RoomError::BindingFixed);
        }

        let previous = member.scope.replace(room);
        if let Some(old) = previous {
            state.exit(id, old);
        }
        state.enter(id, room);
        Ok(previous.filter(|old| *old != room))
    }

    /// Leave `room` if it is the connection's current portal/TV room.
    pub fn leave_scope(&self, id: ConnectionId, room: Room) -> bool {
        let mut state = self.lock();
        let Some(member) = state.members.get_mut(&id) else {
            return false;
        };
        if member.scope != Some(room) || member.identity.tier() == TrustTier::Legislator {
            return false;
        }
        member.scope = None;
        state.exit(id, room);
        true
    }

    /// Commit a pauta membership. Fails if the connection went away while
    /// the caller was validating.
    pub fn join_pauta(&self, id: ConnectionId, pauta_id: PautaId) -> Result<(), RoomError> {
        let mut state = self.lock();
        let member = state.members.get_mut(&id).ok_or(RoomError::Gone)?;
        member.pautas.insert(pauta_id);
        state.enter(id, Room::Pauta(pauta_id));
        Ok(())
    }

    /// Always succeeds. Returns whether the connection was a member.
    pub fn leave_pauta(&self, id: ConnectionId, pauta_id: PautaId) -> bool {
        let mut state = self.lock();
        let was_member = state
            .members
            .get_mut(&id)
            .is_some_and(|m| m.pautas.remove(&pauta_id));
        if was_member {
            state.exit(id, Room::Pauta(pauta_id));
        }
        was_member
    }

    /// Authenticated legislators bound to the chamber. Viewers never count.
    pub fn count_legislators_online(&self, chamber_id: ChamberId) -> usize {
        self.lock().legislators_in(chamber_id)
    }

    pub fn room_size(&self, room: Room) -> usize {
        self.lock().room_size(room)
    }

    pub fn has_room(&self, room: Room) -> bool {
        self.lock().rooms.contains_key(&room)
    }

    /// Rooms the connection currently belongs to.
    pub fn rooms_of(&self, id: ConnectionId) -> Vec<Room> {
        let state = self.lock();
        state
            .rooms
            .iter()
            .filter(|(_, set)| set.contains(&id))
            .map(|(room, _)| *room)
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().members.len()
    }

    pub fn send_to(&self, id: ConnectionId, event: ServerEvent) -> bool {
        self.lock().send(id, event)
    }

    /// Returns the number of recipients.
    pub fn send_to_room(&self, room: Room, event: &ServerEvent) -> usize {
        self.lock().send_room(room, None, event)
    }

    /// Union of several rooms; a connection in more than one of them gets
    /// the event once.
    pub fn send_to_rooms(&self, rooms: &[Room], event: &ServerEvent) -> usize {
        let state = self.lock();
        let recipients: HashSet<ConnectionId> = rooms
            .iter()
            .filter_map(|room| state.rooms.get(room))
            .flatten()
            .copied()
            .collect();
        recipients
            .into_iter()
            .filter(|id| state.send(*id, event.clone()))
            .count()
    }

    /// Every connection on this hub.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let state = self.lock();
        state
            .members
            .values()
            .filter(|m| m.tx.send(event.clone()).is_ok())
            .count()
    }

    pub fn stats(&self) -> ConnectionStats {
        let state = self.lock();
        let mut stats = ConnectionStats {
            total_connections: state.members.len(),
            ..Default::default()
        };
        for (room, set) in &state.rooms {
            match room {
                Room::Chamber(chamber_id) => {
                    stats.chamber_connections.insert(*chamber_id, set.len());
                    stats
                        .legislators_online
                        .insert(*chamber_id, state.legislators_in(*chamber_id));
                }
                Room::Pauta(_) => stats.active_pautas += 1,
                Room::Portal(_) | Room::Tv(_) => {}
            }
        }
        stats
    }
}
