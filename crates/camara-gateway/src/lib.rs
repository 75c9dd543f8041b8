pub mod auth;
pub mod connection;
pub mod emitter;
pub mod registry;
pub mod relay;
pub mod snapshot;
pub mod tally;

use std::sync::Arc;

use camara_db::Directory;

use crate::auth::Authenticator;
use crate::emitter::Emitter;
use crate::registry::RoomRegistry;
use crate::relay::RelayPublisher;

/// Which of the two WebSocket hubs a process hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubKind {
    /// Legislators' tablets; the only hub with a privileged tier
    Tablet,
    /// Portal viewers and chamber TVs on the web process
    Public,
}

impl HubKind {
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::Tablet => "camara-tablet",
            Self::Public => "camara-web",
        }
    }
}

/// Everything one process's hub needs, wired once at startup.
#[derive(Clone)]
pub struct Gateway {
    pub hub: HubKind,
    pub registry: Arc<RoomRegistry>,
    pub authenticator: Authenticator,
    pub emitter: Emitter,
}

impl Gateway {
    pub fn new(
        hub: HubKind,
        directory: Arc<dyn Directory>,
        relay: Arc<dyn RelayPublisher>,
        jwt_secret: impl Into<Arc<str>>,
    ) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        Self {
            hub,
            authenticator: Authenticator::new(jwt_secret, directory.clone()),
            emitter: Emitter::new(hub, registry.clone(), directory, relay),
            registry,
        }
    }
}

/// Run a blocking store call off the async workers.
pub async fn blocking<F, T>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
