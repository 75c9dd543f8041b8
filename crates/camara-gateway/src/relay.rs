use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use camara_types::relay::RelayEvent;

/// Outbound half of the cross-process relay.
///
/// `publish` never blocks and reports nothing back. There is no retry and
/// no acknowledgement; a lost event stays lost.
pub trait RelayPublisher: Send + Sync + 'static {
    fn publish(&self, event: RelayEvent);
}

/// POSTs each event as JSON to the peer process.
pub struct HttpRelay {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRelay {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl RelayPublisher for HttpRelay {
    fn publish(&self, event: RelayEvent) {
        let Ok(handle) = Handle::try_current() else {
            warn!("relay {} dropped: no runtime", event.path());
            return;
        };

        let url = format!("{}{}", self.base_url, event.path());
        let request = self.client.post(&url).json(&event);

        handle.spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("relay {} delivered (chamber {})", url, event.chamber_id());
                }
                Ok(resp) => {
                    warn!("relay {} refused: {}", url, resp.status());
                }
                Err(e) => {
                    warn!("relay {} failed: {}", url, e);
                }
            }
        });
    }
}

/// In-process transport: events land on a channel instead of the network.
pub struct ChannelRelay {
    tx: mpsc::UnboundedSender<RelayEvent>,
}

impl ChannelRelay {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RelayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RelayPublisher for ChannelRelay {
    fn publish(&self, event: RelayEvent) {
        if self.tx.send(event).is_err() {
            debug!("relay channel closed, event dropped");
        }
    }
}

/// Relay for a process with no peer.
pub struct NoRelay;

impl RelayPublisher for NoRelay {
    fn publish(&self, event: RelayEvent) {
        debug!("no relay peer, {} dropped", event.path());
    }
}
