use std::sync::Arc;

use camara_db::Directory;
use camara_gateway::Gateway;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub directory: Arc<dyn Directory>,
    pub gateway: Gateway,
}

impl AppStateInner {
    pub fn new(directory: Arc<dyn Directory>, gateway: Gateway) -> AppState {
        Arc::new(Self { directory, gateway })
    }
}
