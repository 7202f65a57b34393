mod common;

use anyhow::Result;
use serde_json::json;

use fleetdesk::auth::{AuthSession, MemoryTokenStore, TokenStore};
use fleetdesk::collection::{AssumeYes, Draft, RemoteCollection};
use fleetdesk::error::ClientError;
use fleetdesk::mock::auth::{issue_token, Claims};
use fleetdesk::mock::MockState;
use fleetdesk::resources;

fn scoped_orders(server: &common::TestServer, token: &str) -> Result<RemoteCollection> {
    let config = server.config();
    let session = AuthSession::from_token(token, &config.auth);
    let resource = resources::find("restaurant-orders")?.expect("catalogue entry");
    Ok(RemoteCollection::new(server.client(session)?, resource.endpoint))
}

#[tokio::test]
async fn bearer_token_is_sent_on_every_request() -> Result<()> {
    let server = common::start_with_items(fleetdesk::mock::EnvelopeStyle::Success, vec![]).await?;
    let config = server.config();
    let store = MemoryTokenStore::with_entry("token", "Bearer abc.def.ghi");
    let items = RemoteCollection::open(&config, &store, common::items_endpoint())?;

    items.reload().await?;
    items.create(&Draft::new().with("name", "A")).await?;

    let requests = server.state.requests();
    assert!(requests.len() >= 3);
    assert!(requests.iter().all(|r| r.authorization.as_deref() == Some("Bearer abc.def.ghi")));
    Ok(())
}

#[tokio::test]
async fn scoped_collection_uses_the_token_user_id() -> Result<()> {
    let state = MockState::new();
    state.seed_owned("restaurant-orders", "42", vec![json!({ "id": 1, "customer_name": "Olim", "status": "cooking" })]);
    state.seed_owned("restaurant-orders", "43", vec![json!({ "id": 2, "customer_name": "Other" })]);
    let server = common::TestServer::start(state).await?;

    let orders = scoped_orders(&server, &common::unsigned_token(json!({ "userId": 42, "role": "restaurant" })))?;
    orders.reload().await?;

    assert_eq!(orders.rows().len(), 1);
    assert_eq!(orders.rows()[0].text("customer"), "Olim");
    assert_eq!(server.hits("GET", "/api/restaurant/42/orders"), 1);

    orders.remove("1", &AssumeYes).await?;
    assert_eq!(server.hits("DELETE", "/api/restaurant/42/orders/1"), 1);
    assert!(orders.rows().is_empty());
    Ok(())
}

#[tokio::test]
async fn scoped_collection_without_user_id_sends_nothing() -> Result<()> {
    let server = common::TestServer::start(MockState::new()).await?;
    let orders = scoped_orders(&server, &common::unsigned_token(json!({ "role": "restaurant" })))?;

    let err = orders.reload().await.unwrap_err();

    assert!(matches!(err, ClientError::Config(_)));
    assert!(orders.last_error().is_some());
    assert!(server.state.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn signed_tokens_pass_the_backend_check() -> Result<()> {
    let server = common::TestServer::start(MockState::with_jwt_secret("s3cret")).await?;
    let token = issue_token("s3cret", &Claims::new("42", "restaurant", chrono::Duration::hours(1)))?;

    let orders = scoped_orders(&server, &token)?;
    orders
        .create(&Draft::new()
            .with("customer", "Bekzod")
            .with("pickup", "Kitchen 42")
            .with("dropoff", "Navoi 12")
            .with("payment", "cash"))
        .await?;
    assert_eq!(orders.rows().len(), 1);
    assert_eq!(orders.rows()[0].text("dropoff"), "Navoi 12");

    let stranger = issue_token("s3cret", &Claims::new("7", "restaurant", chrono::Duration::hours(1)))?;
    let session = AuthSession::from_token(stranger, &server.config().auth);
    let client = server.client(session)?;
    let response = client.get("/restaurant/42/orders").await?;
    assert_eq!(response.status, 403);
    Ok(())
}

#[tokio::test]
async fn missing_token_is_reported_by_the_backend() -> Result<()> {
    let server = common::TestServer::start(MockState::with_jwt_secret("s3cret")).await?;
    let items = server.collection(resources::find("couriers")?.expect("catalogue entry").endpoint)?;

    let err = items.reload().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(items.last_error().as_deref(), Some("Missing Authorization header"));
    Ok(())
}

#[tokio::test]
async fn stored_token_survives_round_trip_through_the_store() -> Result<()> {
    let server = common::TestServer::start(MockState::new()).await?;
    let config = server.config();
    let store = MemoryTokenStore::new();
    let session = AuthSession::load(&store, &config.auth);
    assert!(!session.is_authenticated());

    store.set("auth_token", &common::unsigned_token(json!({ "sub": "dealer-9" })))?;
    let session = AuthSession::load(&store, &config.auth);
    assert_eq!(session.user_id(), Some("dealer-9"));
    Ok(())
}
