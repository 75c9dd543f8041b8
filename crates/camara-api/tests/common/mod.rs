#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use camara_api::state::{AppState, AppStateInner};
use camara_db::Database;
use camara_gateway::relay::{ChannelRelay, HttpRelay, RelayPublisher};
use camara_gateway::{Gateway, HubKind};
use camara_types::api::Claims;
use camara_types::events::ServerEvent;
use camara_types::models::{Legislator, Role, status};
use camara_types::relay::RelayEvent;

pub const SECRET: &str = "integration-secret";

/// Chamber 7 owns session 1 with pautas 42 (voting) and 43 (pending).
/// Chamber 8 owns session 2 with pauta 99 (voting).
pub struct Fixture {
    pub db: Arc<Database>,
    pub legislator: Uuid,
    pub other_legislator: Uuid,
    pub admin: Uuid,
    pub foreign_admin: Uuid,
    pub tv: Uuid,
}

pub fn fixture() -> Fixture {
    let db = Arc::new(Database::open_in_memory().unwrap());
    db.create_chamber(7, "Câmara Sete").unwrap();
    db.create_chamber(8, "Câmara Oito").unwrap();
    db.create_session(1, 7, "Sessão Ordinária", "ordinaria", "2025-03-01T19:00:00Z")
        .unwrap();
    db.create_session(2, 8, "Sessão Ordinária", "ordinaria", "2025-03-01T19:00:00Z")
        .unwrap();
    db.create_pauta(42, 1, "PL 12/2025", status::VOTING).unwrap();
    db.create_pauta(43, 1, "PL 13/2025", status::PENDING).unwrap();
    db.create_pauta(99, 2, "PL 3/2025", status::VOTING).unwrap();

    let fx = Fixture {
        db: db.clone(),
        legislator: Uuid::new_v4(),
        other_legislator: Uuid::new_v4(),
        admin: Uuid::new_v4(),
        foreign_admin: Uuid::new_v4(),
        tv: Uuid::new_v4(),
    };

    for (user, id, chamber, name) in [
        (fx.legislator, 1, 7, "Ana"),
        (fx.other_legislator, 2, 8, "Bruno"),
    ] {
        db.create_profile(user, &Role::Legislator, Some(chamber), name)
            .unwrap();
        db.create_legislator(&Legislator {
            id,
            profile_id: user,
            chamber_id: chamber,
            name: name.to_string(),
            is_president: id == 1,
            is_vice_president: false,
            party_id: Some(10),
        })
        .unwrap();
    }
    db.create_profile(fx.admin, &Role::Admin, Some(7), "Secretaria")
        .unwrap();
    db.create_profile(fx.foreign_admin, &Role::Admin, Some(8), "Secretaria Oito")
        .unwrap();
    db.create_profile(fx.tv, &Role::Tv, Some(7), "TV Plenário")
        .unwrap();
    db.create_speaker(5, 1, 1, 10).unwrap();

    fx
}

pub fn token(sub: Uuid) -> String {
    let claims = Claims {
        sub,
        email: None,
        iat: chrono::Utc::now().timestamp(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn state_with(hub: HubKind, db: Arc<Database>, relay: Arc<dyn RelayPublisher>) -> AppState {
    let gateway = Gateway::new(hub, db.clone(), relay, SECRET);
    AppStateInner::new(db, gateway)
}

pub fn channel_state(
    hub: HubKind,
    db: Arc<Database>,
) -> (AppState, mpsc::UnboundedReceiver<RelayEvent>) {
    let (relay, rx) = ChannelRelay::new();
    (state_with(hub, db, Arc::new(relay)), rx)
}

/// Relay whose peer never answers.
pub fn dead_relay() -> Arc<dyn RelayPublisher> {
    Arc::new(HttpRelay::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap())
}

pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

pub fn drain_relay(rx: &mut mpsc::UnboundedReceiver<RelayEvent>) -> Vec<RelayEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}
