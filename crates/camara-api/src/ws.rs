use axum::{
    extract::{Query, State, WebSocketUpgrade, ws::rejection::WebSocketUpgradeRejection},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use serde::Deserialize;

use camara_gateway::connection;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// The handshake is authenticated before the upgrade so a rejected client
/// never gets a socket and never touches room state.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let token = bearer
        .map(|TypedHeader(Authorization(b))| b.token().to_string())
        .or(query.token);

    let gateway = state.gateway.clone();
    let identity = gateway
        .authenticator
        .admit_handshake(gateway.hub, token.as_deref())
        .await?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    Ok(ws.on_upgrade(move |socket| connection::handle_connection(socket, gateway, identity)))
}
