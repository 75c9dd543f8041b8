use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;

use camara_gateway::HubKind;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub hub: HubKind,
    pub addr: SocketAddr,
    /// Base URL of the other process's relay endpoints
    pub peer_url: String,
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub relay_timeout: Duration,
}

impl Config {
    pub fn from_env(hub: HubKind) -> anyhow::Result<Self> {
        let (host_key, port_key, default_port, peer_key, default_peer) = match hub {
            HubKind::Public => (
                "CAMARA_WEB_HOST",
                "CAMARA_WEB_PORT",
                "3000",
                "CAMARA_TABLET_URL",
                "http://127.0.0.1:3003",
            ),
            HubKind::Tablet => (
                "CAMARA_TABLET_HOST",
                "CAMARA_TABLET_PORT",
                "3003",
                "CAMARA_WEB_URL",
                "http://127.0.0.1:3000",
            ),
        };

        let jwt_secret = std::env::var("CAMARA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            eprintln!("FATAL: CAMARA_JWT_SECRET is unset or still a placeholder.");
            eprintln!("       Both processes must share the platform's signing secret.");
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }

        let host = std::env::var(host_key).unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = setting(port_key, std::env::var(port_key).ok(), default_port)?;
        let peer_url = std::env::var(peer_key).unwrap_or_else(|_| default_peer.into());
        let db_path: PathBuf = std::env::var("CAMARA_DB_PATH")
            .unwrap_or_else(|_| "camara.db".into())
            .into();
        let relay_timeout_ms: u64 = setting(
            "CAMARA_RELAY_TIMEOUT_MS",
            std::env::var("CAMARA_RELAY_TIMEOUT_MS").ok(),
            "3000",
        )?;

        Ok(Self {
            hub,
            addr: format!("{}:{}", host, port).parse()?,
            peer_url,
            jwt_secret,
            db_path,
            relay_timeout: Duration::from_millis(relay_timeout_ms),
        })
    }
}

/// Parse a numeric setting, falling back to `default` only when it is unset.
fn setting<T>(key: &str, raw: Option<String>, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value = raw.unwrap_or_else(|| default.to_string());
    value
        .trim()
        .parse()
        .map_err(|e| anyhow!("invalid {key} value {value:?}: {e}"))
}
