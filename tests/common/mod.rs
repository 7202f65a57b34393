#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::StatusCode;
use serde_json::{json, Value};

use fleetdesk::api::ApiClient;
use fleetdesk::auth::AuthSession;
use fleetdesk::collection::{EndpointDescriptor, FieldMap, FieldSpec, RemoteCollection};
use fleetdesk::config::ClientConfig;
use fleetdesk::mock::{router, EnvelopeStyle, MockState};

/// Mock backend served on its own port inside the test's runtime
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub state: MockState,
}

impl TestServer {
    pub async fn start(state: MockState) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", base_url))?;
        let app = router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self { port, base_url, state };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    self.state.clear_requests();
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("mock backend did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::for_base_url(&self.base_url)
    }

    pub fn client(&self, session: AuthSession) -> Result<ApiClient> {
        Ok(ApiClient::new(&self.config(), session)?)
    }

    pub fn collection(&self, endpoint: EndpointDescriptor) -> Result<RemoteCollection> {
        Ok(RemoteCollection::new(self.client(AuthSession::anonymous())?, endpoint))
    }

    /// Requests received on `path` so far
    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.state
            .requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

/// Backend with an extra `items` collection in the given envelope style
pub async fn start_with_items(style: EnvelopeStyle, items: Vec<Value>) -> Result<TestServer> {
    let state = MockState::new();
    state.register("items", style);
    state.seed("items", items);
    TestServer::start(state).await
}

pub fn items_map() -> FieldMap {
    FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id"]),
            FieldSpec::text("name", &["name", "title"]).required().searchable(),
            FieldSpec::number("qty", &["qty", "quantity"]),
            FieldSpec::text("status", &["status"]).searchable(),
        ],
    )
    .expect("items field map is valid")
}

pub fn items_endpoint() -> EndpointDescriptor {
    EndpointDescriptor::conventional("items", items_map())
}

/// Unsigned token with the given claims; enough for client-side user id decoding
pub fn unsigned_token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "none", "typ": "JWT" }).to_string());
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.sig", header, payload)
}

/// Base URL nothing listens on
pub fn dead_base_url() -> Result<String> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    Ok(format!("http://127.0.0.1:{}", port))
}
