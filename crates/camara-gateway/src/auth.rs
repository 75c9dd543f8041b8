use std::sync::Arc;

use jsonwebtoken::{DecodingKey, Validation, decode};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use camara_db::Directory;
use camara_types::api::Claims;
use camara_types::models::{Profile, Role};

use crate::registry::{Identity, Seat, ViewerCredential};
use crate::{HubKind, blocking};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("session superseded by a newer login")]
    Superseded,
    #[error("profile not found")]
    ProfileNotFound,
    #[error("no legislator linked to this profile")]
    LegislatorNotFound,
    #[error("role '{0}' is not allowed here")]
    RoleNotAllowed(String),
    #[error(transparent)]
    Directory(#[from] anyhow::Error),
}

impl AuthError {
    /// Role and linkage problems are authorization failures; everything else
    /// means the credential itself is unusable.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::RoleNotAllowed(_) | Self::LegislatorNotFound)
    }
}

/// A validated token plus the profile it belongs to.
#[derive(Debug, Clone)]
pub struct Principal {
    pub claims: Claims,
    pub profile: Profile,
}

/// Handshake and REST credential gate, shared by both hubs.
#[derive(Clone)]
pub struct Authenticator {
    secret: Arc<str>,
    directory: Arc<dyn Directory>,
}

impl Authenticator {
    pub fn new(secret: impl Into<Arc<str>>, directory: Arc<dyn Directory>) -> Self {
        Self {
            secret: secret.into(),
            directory,
        }
    }

    /// Signature and expiry only.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("token rejected: {}", e);
            AuthError::InvalidToken
        })
    }

    /// Validate the token and load its profile, rejecting tokens issued
    /// before the profile's watermark.
    pub async fn principal(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.validate(token)?;

        let directory = self.directory.clone();
        let user_id = claims.sub;
        let profile = blocking(move || directory.profile(user_id))
            .await?
            .ok_or(AuthError::ProfileNotFound)?;

        if claims.iat < profile.min_token_iat {
            return Err(AuthError::Superseded);
        }

        Ok(Principal { claims, profile })
    }

    /// Decide who a WebSocket handshake is. No token is always a public
    /// viewer. A token that is present must be valid on either hub.
    pub async fn admit_handshake(
        &self,
        hub: HubKind,
        token: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Identity::Anonymous);
        };

        let principal = self.principal(token).await.inspect_err(|e| {
            warn!("handshake rejected on {:?} hub: {}", hub, e);
        })?;
        let Principal { profile, .. } = principal;

        match hub {
            HubKind::Tablet => {
                if profile.role != Role::Legislator {
                    warn!(
                        "handshake rejected on tablet hub: role '{}' for {}",
                        profile.role.as_str(),
                        profile.user_id
                    );
                    return Err(AuthError::RoleNotAllowed(profile.role.as_str().to_string()));
                }
                self.seat(profile.user_id).await.map(Identity::Legislator)
            }
            HubKind::Public => Ok(Identity::Viewer(ViewerCredential {
                user_id: profile.user_id,
                role: profile.role,
                chamber_id: profile.chamber_id,
            })),
        }
    }

    async fn seat(&self, user_id: Uuid) -> Result<Seat, AuthError> {
        let directory = self.directory.clone();
        let legislator = blocking(move || directory.legislator_for_profile(user_id))
            .await?
            .ok_or(AuthError::LegislatorNotFound)?;

        Ok(Seat {
            legislator_id: legislator.id,
            user_id,
            chamber_id: legislator.chamber_id,
            name: legislator.name,
            is_president: legislator.is_president,
            is_vice_president: legislator.is_vice_president,
            party_id: legislator.party_id,
        })
    }
}
