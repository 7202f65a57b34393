use fleetdesk::config::MockConfig;
use fleetdesk::mock::{self, MockState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up FLEETDESK_MOCK_PORT and friends
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let config = MockConfig::from_env();
    let state = MockState::from_config(&config).with_demo_data();
    tracing::info!(port = config.port, "starting fleetdesk development backend");

    mock::serve(&config, state).await
}
