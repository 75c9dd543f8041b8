//! Admin/Web process: public hub, polling fallback and admin controls.

mod config;
mod serve;

use camara_gateway::HubKind;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    serve::init_tracing();

    serve::run(config::Config::from_env(HubKind::Public)?).await
}
