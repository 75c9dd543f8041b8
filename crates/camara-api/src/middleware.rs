use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};

use crate::error::ApiError;
use crate::state::AppState;

/// Validate the bearer token, check it against the profile's watermark and
/// attach the resulting `Principal` to the request.
pub async fn require_session(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;

    let principal = state.gateway.authenticator.principal(bearer.token()).await?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
