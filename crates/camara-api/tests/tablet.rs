mod common;

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use camara_api::tablet_router;
use camara_gateway::HubKind;
use camara_gateway::registry::{Identity, Seat};
use camara_types::events::ServerEvent;
use camara_types::relay::RelayEvent;

use common::*;

fn seat_for(fx: &Fixture) -> Identity {
    Identity::Legislator(Seat {
        legislator_id: 1,
        user_id: fx.legislator,
        chamber_id: 7,
        name: "Ana".into(),
        is_president: true,
        is_vice_president: false,
        party_id: Some(10),
    })
}

#[tokio::test]
async fn first_vote_is_created_then_updated() {
    let fx = fixture();
    let (state, _relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let app = tablet_router(state);
    let bearer = token(fx.legislator);

    let (status, body) = call(
        &app,
        "POST",
        "/api/votes",
        Some(&bearer),
        Some(json!({ "pautaId": 42, "ballot": "SIM" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isUpdate"], false);
    assert_eq!(body["ballot"], "SIM");

    let (status, body) = call(
        &app,
        "POST",
        "/api/votes",
        Some(&bearer),
        Some(json!({ "pautaId": 42, "ballot": "Não" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isUpdate"], true);
    assert_eq!(body["ballot"], "NÃO");
}

#[tokio::test]
async fn dead_relay_peer_does_not_change_the_response() {
    let fx = fixture();
    let state = state_with(HubKind::Tablet, fx.db.clone(), dead_relay());
    let app = tablet_router(state);

    let started = Instant::now();
    let (status, _) = call(
        &app,
        "POST",
        "/api/votes",
        Some(&token(fx.legislator)),
        Some(json!({ "pautaId": 42, "ballot": "ABSTENÇÃO" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn vote_reaches_the_chamber_room_and_the_relay() {
    let fx = fixture();
    let (state, mut relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let (peer, mut peer_rx) = state.gateway.registry.admit(seat_for(&fx));
    state.gateway.registry.join_pauta(peer, 42).unwrap();
    drain(&mut peer_rx);
    let app = tablet_router(state);

    let (status, _) = call(
        &app,
        "POST",
        "/api/votes",
        Some(&token(fx.legislator)),
        Some(json!({ "pautaId": 42, "ballot": "SIM" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let events = drain(&mut peer_rx);
    assert!(matches!(
        &events[0],
        ServerEvent::VoteNotification { pauta_id: 42, vereador, .. } if vereador.is_president
    ));
    assert!(matches!(
        &events[1],
        ServerEvent::PautaStatsUpdate { tally, .. } if tally.total == 1 && tally.yes == 1
    ));

    let relayed = drain_relay(&mut relayed);
    assert!(matches!(relayed.as_slice(), [RelayEvent::Vote(_), RelayEvent::Tally(_)]));
}

#[tokio::test]
async fn vote_rejections() {
    let fx = fixture();
    let (state, mut relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let app = tablet_router(state);
    let bearer = token(fx.legislator);

    let (status, _) = call(
        &app,
        "POST",
        "/api/votes",
        None,
        Some(json!({ "pautaId": 42, "ballot": "SIM" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        "POST",
        "/api/votes",
        Some(&bearer),
        Some(json!({ "pautaId": 1234, "ballot": "SIM" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Pauta não encontrada");

    let (status, _) = call(
        &app,
        "POST",
        "/api/votes",
        Some(&bearer),
        Some(json!({ "pautaId": 43, "ballot": "SIM" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        "POST",
        "/api/votes",
        Some(&bearer),
        Some(json!({ "pautaId": 99, "ballot": "SIM" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "POST",
        "/api/votes",
        Some(&token(fx.admin)),
        Some(json!({ "pautaId": 42, "ballot": "SIM" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(drain_relay(&mut relayed).is_empty());
}

#[tokio::test]
async fn superseded_token_is_refused() {
    let fx = fixture();
    let (state, _relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let app = tablet_router(state);
    let old = token(fx.legislator);
    fx.db
        .set_min_token_iat(fx.legislator, chrono::Utc::now().timestamp() + 60)
        .unwrap();

    let (status, _) = call(
        &app,
        "POST",
        "/api/votes",
        Some(&old),
        Some(json!({ "pautaId": 42, "ballot": "SIM" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejected_handshakes_leave_no_trace() {
    let fx = fixture();
    let (state, _relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let registry = state.gateway.registry.clone();
    let app = tablet_router(state);

    let (status, _) = call(&app, "GET", "/ws?token=garbage", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/ws", Some(&token(fx.tv)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "GET", "/ws", Some(&token(Uuid::new_v4())), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(registry.connection_count(), 0);
}

#[tokio::test]
async fn relayed_start_opens_tablets_and_reports_back() {
    let fx = fixture();
    let (state, mut relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let (_seat, mut seat_rx) = state.gateway.registry.admit(seat_for(&fx));
    let (_viewer, _viewer_rx) = state.gateway.registry.admit(Identity::Anonymous);
    drain(&mut seat_rx);
    let app = tablet_router(state);

    let (status, body) = call(
        &app,
        "POST",
        "/api/relay/voting-started",
        None,
        Some(json!({
            "chamberId": 7,
            "pautaId": 42,
            "pautaName": "PL 12/2025",
            "pautaDescription": null,
            "sessionName": "Sessão Ordinária",
            "sessionKind": "ordinaria",
            "sessionStartsAt": "2025-03-01T19:00:00Z",
            "timestamp": "2025-03-01T19:05:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    assert!(matches!(
        drain(&mut seat_rx).as_slice(),
        [ServerEvent::StartVoting { legislators_online: Some(1), .. }]
    ));
    assert!(matches!(
        drain_relay(&mut relayed).as_slice(),
        [RelayEvent::VotingStarted(s)] if s.legislators_online == Some(1)
    ));
}

#[tokio::test]
async fn relayed_end_closes_tablets_and_reports_back() {
    let fx = fixture();
    let (state, mut relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let (_seat, mut seat_rx) = state.gateway.registry.admit(seat_for(&fx));
    drain(&mut seat_rx);
    let app = tablet_router(state);

    let (status, _) = call(
        &app,
        "POST",
        "/api/relay/voting-ended",
        None,
        Some(json!({
            "chamberId": 7,
            "pautaId": 42,
            "pautaName": "PL 12/2025",
            "result": "Aprovada",
            "timestamp": "2025-03-01T19:30:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(matches!(
        drain(&mut seat_rx).as_slice(),
        [ServerEvent::EndVoting { pauta_id: 42, result: Some(result), .. }] if result == "Aprovada"
    ));
    assert!(matches!(
        drain_relay(&mut relayed).as_slice(),
        [RelayEvent::VotingEnded(e)] if e.chamber_id == 7 && e.result.as_deref() == Some("Aprovada")
    ));
}

#[tokio::test]
async fn relayed_speech_reaches_the_chamber_room() {
    let fx = fixture();
    let (state, mut relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let (_seat, mut seat_rx) = state.gateway.registry.admit(seat_for(&fx));
    drain(&mut seat_rx);
    let app = tablet_router(state);

    let (status, _) = call(
        &app,
        "POST",
        "/api/relay/speech-started",
        None,
        Some(json!({
            "chamberId": 7,
            "speakerId": 5,
            "speakerName": "Ana",
            "sessionName": "Sessão Ordinária",
            "speakingMinutes": 10,
            "timestamp": "2025-03-01T19:40:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(matches!(
        drain(&mut seat_rx).as_slice(),
        [ServerEvent::StartSpeech { speaker_id: 5, speaking_minutes: 10, .. }]
    ));
    assert!(drain_relay(&mut relayed).is_empty());
}

#[tokio::test]
async fn relayed_status_reaches_chamber_and_pauta_rooms() {
    let fx = fixture();
    let (state, mut relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let (seat, mut seat_rx) = state.gateway.registry.admit(seat_for(&fx));
    state.gateway.registry.join_pauta(seat, 42).unwrap();
    drain(&mut seat_rx);
    let app = tablet_router(state);

    let (status, _) = call(
        &app,
        "POST",
        "/api/relay/pauta-status",
        None,
        Some(json!({
            "chamberId": 7,
            "pautaId": 42,
            "pautaName": "PL 12/2025",
            "oldStatus": "Em Votação",
            "newStatus": "Finalizada",
            "result": "Aprovada",
            "timestamp": "2025-03-01T19:31:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let events = drain(&mut seat_rx);
    assert_eq!(events.len(), 2);
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::PautaStatusNotification(c) if c.new_status == "Finalizada"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::PautaStatusUpdate(c) if c.pauta_id == 42
    )));
    assert!(drain_relay(&mut relayed).is_empty());
}

#[tokio::test]
async fn malformed_relay_body_is_rejected() {
    let fx = fixture();
    let (state, _relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let app = tablet_router(state);

    let (status, _) = call(
        &app,
        "POST",
        "/api/relay/vote",
        None,
        Some(json!({ "pautaId": "not-a-number" })),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn health_and_connection_stats() {
    let fx = fixture();
    let (state, _relayed) = channel_state(HubKind::Tablet, fx.db.clone());
    let (_seat, _rx) = state.gateway.registry.admit(seat_for(&fx));
    let app = tablet_router(state);

    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "camara-tablet");

    let (status, body) = call(&app, "GET", "/api/connections", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalConnections"], 1);
    assert_eq!(body["legislatorsOnline"]["7"], 1);
}
