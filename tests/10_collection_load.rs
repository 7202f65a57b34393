mod common;

use std::time::Duration;

use anyhow::Result;
use serde_json::json;

use fleetdesk::api::ApiClient;
use fleetdesk::auth::AuthSession;
use fleetdesk::collection::{load, RemoteCollection};
use fleetdesk::config::ClientConfig;
use fleetdesk::error::UNREACHABLE_MESSAGE;
use fleetdesk::mock::{EnvelopeStyle, Op};
use fleetdesk::view::ViewQuery;

#[tokio::test]
async fn success_envelope_yields_rows() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![json!({ "id": "1", "name": "A" })]).await?;
    let items = server.collection(common::items_endpoint())?;

    items.reload().await?;

    let rows = items.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "1");
    assert_eq!(rows[0].text("name"), "A");
    assert!(items.last_error().is_none());
    assert!(!items.is_loading());
    Ok(())
}

#[tokio::test]
async fn every_envelope_style_normalizes_the_same() -> Result<()> {
    for style in [EnvelopeStyle::BareArray, EnvelopeStyle::Data, EnvelopeStyle::Success] {
        let server = common::start_with_items(
            style,
            vec![json!({ "_id": 7, "title": "Crate", "quantity": "3" }), json!({ "id": "8", "name": "Box" })],
        )
        .await?;
        let items = server.collection(common::items_endpoint())?;
        items.reload().await?;

        let rows = items.rows();
        assert_eq!(rows.len(), 2, "{:?}", style);
        assert_eq!(rows[0].id, "7");
        assert_eq!(rows[0].text("name"), "Crate");
        assert_eq!(rows[0].number("qty"), Some(3.0));
        assert_eq!(rows[1].text("status"), "", "missing text falls back to empty");
    }
    Ok(())
}

#[tokio::test]
async fn empty_list_is_not_an_error() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::BareArray, vec![]).await?;
    let items = server.collection(common::items_endpoint())?;

    items.reload().await?;

    let snapshot = items.snapshot();
    assert!(snapshot.rows.is_empty());
    assert!(snapshot.loaded);
    assert!(snapshot.error.is_none());
    Ok(())
}

#[tokio::test]
async fn repeated_loads_are_idempotent() -> Result<()> {
    let server = common::start_with_items(
        EnvelopeStyle::Data,
        vec![json!({ "id": "1", "name": "A" }), json!({ "id": "2", "name": "B" })],
    )
    .await?;
    let items = server.collection(common::items_endpoint())?;

    items.reload().await?;
    let first = items.rows();
    items.reload().await?;
    assert_eq!(items.rows(), first);
    assert_eq!(server.hits("GET", "/api/items/list"), 2);
    Ok(())
}

#[tokio::test]
async fn list_requests_bypass_caches() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![]).await?;
    server.collection(common::items_endpoint())?.reload().await?;

    let requests = server.state.requests();
    let list = requests.iter().find(|r| r.path == "/api/items/list").expect("list request recorded");
    assert_eq!(list.cache_control.as_deref(), Some("no-cache"));
    assert!(list.authorization.is_none(), "anonymous sessions send no Authorization header");
    Ok(())
}

#[tokio::test]
async fn server_error_message_is_surfaced() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![json!({ "id": "1", "name": "A" })]).await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;

    server.state.fail_next("items", Op::List, 503, json!({ "detail": "maintenance window" }));
    let err = items.reload().await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(items.last_error().as_deref(), Some("maintenance window"));
    assert_eq!(items.rows().len(), 1, "a failed reload keeps the previous rows");
    Ok(())
}

#[tokio::test]
async fn rejected_envelope_counts_as_failure() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![]).await?;
    server
        .state
        .fail_next("items", Op::List, 200, json!({ "success": false, "message": "token expired" }));

    let outcome = load(&server.client(AuthSession::anonymous())?, &common::items_endpoint()).await;

    assert!(!outcome.is_ok());
    assert!(outcome.rows.is_empty());
    assert_eq!(outcome.error.as_deref(), Some("token expired"));
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_reports_generic_message() -> Result<()> {
    let config = ClientConfig::for_base_url(common::dead_base_url()?);
    let items = RemoteCollection::new(ApiClient::new(&config, AuthSession::anonymous())?, common::items_endpoint());

    assert!(items.reload().await.is_err());
    assert_eq!(items.last_error().as_deref(), Some(UNREACHABLE_MESSAGE));
    assert!(!items.is_loading(), "loading flag cleared on failure");
    Ok(())
}

#[tokio::test]
async fn stale_load_does_not_overwrite_newer_one() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![json!({ "id": "1", "name": "old" })]).await?;
    let items = server.collection(common::items_endpoint())?;

    server.state.delay_next("items", Op::List, Duration::from_millis(400));
    let slow = {
        let items = items.clone();
        tokio::spawn(async move { items.reload().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    server.state.seed("items", vec![json!({ "id": "1", "name": "new" }), json!({ "id": "2", "name": "extra" })]);
    items.reload().await?;
    assert_eq!(items.rows().len(), 2);

    slow.await??;
    assert_eq!(items.rows().len(), 2, "older response arrived last and was discarded");
    assert_eq!(items.row("1").map(|r| r.text("name")).as_deref(), Some("new"));
    Ok(())
}

#[tokio::test]
async fn view_filters_sorts_and_pages_loaded_rows() -> Result<()> {
    let rows = (1..=12)
        .map(|i| json!({ "id": i.to_string(), "name": format!("item {:02}", i), "status": if i % 3 == 0 { "late" } else { "ok" } }))
        .collect();
    let server = common::start_with_items(EnvelopeStyle::Data, rows).await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;

    let page = items.view(&ViewQuery {
        query: "LATE".into(),
        sort_key: Some("name".into()),
        sort_asc: false,
        page: 1,
        page_size: 3,
    });
    assert_eq!(page.total, 4);
    assert_eq!(page.page_count, 2);
    let ids: Vec<&str> = page.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["12", "9", "6"]);

    assert_eq!(items.rows().len(), 12, "viewing never mutates the collection");
    Ok(())
}
