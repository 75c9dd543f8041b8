use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use camara_types::events::{ClientCommand, ServerEvent};

use crate::Gateway;
use crate::registry::{ConnectionId, Identity};

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Serve an upgraded socket whose handshake was already authenticated.
/// Admission, the command loop and cleanup all happen here.
pub async fn handle_connection(socket: WebSocket, gateway: Gateway, identity: Identity) {
    let (mut sender, mut receiver) = socket.split();

    let label = describe(&identity);
    let (conn_id, mut events) = gateway.registry.admit(identity);
    info!("{} connected to {:?} hub as {}", label, gateway.hub, conn_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Queued events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("could not encode event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Client commands
    let gateway_recv = gateway.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(cmd) => handle_command(&gateway_recv, conn_id, cmd).await,
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            conn_id,
                            e,
                            text.chars().take(200).collect::<String>()
                        );
                        gateway_recv
                            .registry
                            .send_to(conn_id, ServerEvent::error("Comando inválido"));
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    gateway.registry.remove(conn_id);
    info!("{} ({}) disconnected from {:?} hub", label, conn_id, gateway.hub);
}

pub async fn handle_command(gateway: &Gateway, conn_id: ConnectionId, cmd: ClientCommand) {
    debug!("{} -> {:?}", conn_id, cmd);
    let emitter = &gateway.emitter;
    match cmd {
        ClientCommand::JoinPauta { pauta_id } => emitter.join_pauta(conn_id, pauta_id).await,
        ClientCommand::LeavePauta { pauta_id } => emitter.leave_pauta(conn_id, pauta_id),
        ClientCommand::JoinPortal { chamber_id } => emitter.join_portal(conn_id, chamber_id),
        ClientCommand::LeavePortal => emitter.leave_portal(conn_id),
        ClientCommand::JoinTv { chamber_id } => emitter.join_tv(conn_id, chamber_id),
        ClientCommand::LeaveTv => emitter.leave_tv(conn_id),
        ClientCommand::Ping => emitter.pong(conn_id),
    }
}

fn describe(identity: &Identity) -> String {
    match identity {
        Identity::Anonymous => "public viewer".to_string(),
        Identity::Viewer(cred) => format!("{} viewer {}", cred.role.as_str(), cred.user_id),
        Identity::Legislator(seat) => {
            format!("legislator {} (chamber {})", seat.name, seat.chamber_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use camara_db::Database;
    use camara_types::models::status;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use crate::HubKind;
    use crate::registry::{Room, Seat};
    use crate::relay::ChannelRelay;

    fn gateway() -> Gateway {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.create_chamber(7, "Câmara").unwrap();
        db.create_session(1, 7, "Ordinária", "ordinaria", "2025-03-01T19:00:00Z")
            .unwrap();
        db.create_pauta(42, 1, "PL 12/2025", status::PENDING).unwrap();
        let (relay, _rx) = ChannelRelay::new();
        Gateway::new(HubKind::Tablet, db, Arc::new(relay), "secret")
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn legislator() -> Identity {
        Identity::Legislator(Seat {
            legislator_id: 1,
            user_id: Uuid::new_v4(),
            chamber_id: 7,
            name: "Ana".into(),
            is_president: false,
            is_vice_president: false,
            party_id: None,
        })
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let gw = gateway();
        let (conn, mut rx) = gw.registry.admit(Identity::Anonymous);
        drain(&mut rx);

        handle_command(&gw, conn, ClientCommand::Ping).await;

        assert!(matches!(drain(&mut rx).as_slice(), [ServerEvent::Pong { .. }]));
    }

    #[tokio::test]
    async fn join_then_leave_pauta() {
        let gw = gateway();
        let (conn, mut rx) = gw.registry.admit(legislator());
        drain(&mut rx);

        handle_command(&gw, conn, ClientCommand::JoinPauta { pauta_id: 42 }).await;
        assert!(gw.registry.has_room(Room::Pauta(42)));

        handle_command(&gw, conn, ClientCommand::LeavePauta { pauta_id: 42 }).await;
        assert!(!gw.registry.has_room(Room::Pauta(42)));
        assert!(matches!(
            drain(&mut rx).last(),
            Some(ServerEvent::PautaLeft { pauta_id: 42, .. })
        ));
    }

    #[tokio::test]
    async fn portal_rooms_are_not_served_by_the_tablet_hub() {
        let gw = gateway();
        let (conn, mut rx) = gw.registry.admit(Identity::Anonymous);
        drain(&mut rx);

        handle_command(&gw, conn, ClientCommand::JoinPortal { chamber_id: 7 }).await;

        assert!(matches!(drain(&mut rx).as_slice(), [ServerEvent::Error { .. }]));
        assert!(gw.registry.rooms_of(conn).is_empty());
    }
}
