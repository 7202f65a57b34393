mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use serde_json::json;

use fleetdesk::collection::{AssumeYes, Draft, RemoveOutcome};
use fleetdesk::error::ClientError;
use fleetdesk::mock::{EnvelopeStyle, Op};

#[tokio::test]
async fn created_record_appears_after_reload() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![]).await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;

    items
        .create(&Draft::new().with("name", "Pallet").with("qty", "12").with("unknown", true))
        .await?;

    let rows = items.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].text("name"), "Pallet");
    assert_eq!(rows[0].number("qty"), Some(12.0));

    let stored = server.state.records("items");
    assert_eq!(stored[0]["qty"], json!(12), "numbers are sent as numbers");
    assert!(stored[0].get("unknown").is_none(), "fields outside the map are not sent");
    assert!(!items.is_creating());
    Ok(())
}

#[tokio::test]
async fn missing_required_field_sends_nothing() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![]).await?;
    let items = server.collection(common::items_endpoint())?;

    let err = items.create(&Draft::new().with("qty", "abc")).await.unwrap_err();

    assert_eq!(err, ClientError::validation("name is required\nqty has an invalid value"));
    assert_eq!(items.last_error().as_deref(), Some("name is required\nqty has an invalid value"));
    assert_eq!(server.hits("POST", "/api/items/create"), 0);
    Ok(())
}

#[tokio::test]
async fn server_validation_errors_are_folded_into_one_message() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![]).await?;
    server.state.require_fields("items", &["name", "status"]);
    let items = server.collection(common::items_endpoint())?;

    let err = items.create(&Draft::new().with("name", "Crate")).await.unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert_eq!(items.last_error().as_deref(), Some("status: field required"));
    assert!(server.state.records("items").is_empty());
    Ok(())
}

#[tokio::test]
async fn update_merges_changes() -> Result<()> {
    let server = common::start_with_items(
        EnvelopeStyle::Data,
        vec![json!({ "id": "5", "name": "Crate", "qty": 1, "status": "new" })],
    )
    .await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;

    let mut draft = items.row("5").expect("row loaded").edit();
    draft.set("status", "shipped");
    items.update("5", &draft).await?;

    assert_eq!(items.row("5").map(|r| r.text("status")).as_deref(), Some("shipped"));
    assert_eq!(server.hits("PATCH", "/api/items/update/5"), 1);
    assert!(!items.is_saving("5"));
    Ok(())
}

#[tokio::test]
async fn update_of_missing_record_reports_not_found() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![]).await?;
    let items = server.collection(common::items_endpoint())?;

    let err = items.update("404", &Draft::new().with("name", "Ghost")).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(items.last_error().as_deref(), Some("items 404 not found"));
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_row() -> Result<()> {
    let server = common::start_with_items(
        EnvelopeStyle::Success,
        vec![json!({ "id": "1", "name": "A" }), json!({ "id": "2", "name": "B" })],
    )
    .await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;

    let outcome = items.remove("1", &AssumeYes).await?;

    assert_eq!(outcome, RemoveOutcome::Deleted);
    assert!(items.row("1").is_none());
    assert_eq!(items.rows().len(), 1);
    assert_eq!(server.state.records("items").len(), 1);
    assert!(!items.is_deleting("1"));
    Ok(())
}

#[tokio::test]
async fn failed_delete_restores_row_and_surfaces_message() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![json!({ "id": "1", "name": "A" })]).await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;
    server.state.fail_next("items", Op::Delete, 500, json!({ "message": "db locked" }));

    let result = items.remove("1", &AssumeYes).await;

    assert!(matches!(result, Err(ClientError::Http { status: 500, .. })));
    assert!(items.row("1").is_some(), "row is back after the failed delete");
    assert_eq!(items.last_error().as_deref(), Some("db locked"));
    assert!(!items.is_deleting("1"));
    Ok(())
}

#[tokio::test]
async fn failed_reload_after_delete_shows_the_row_again() -> Result<()> {
    let server = common::start_with_items(
        EnvelopeStyle::Success,
        vec![json!({ "id": "1", "name": "A" }), json!({ "id": "2", "name": "B" })],
    )
    .await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;
    server.state.fail_next("items", Op::List, 503, json!({ "message": "replica lag" }));

    let outcome = items.remove("1", &AssumeYes).await?;

    assert_eq!(outcome, RemoveOutcome::Deleted, "the server did delete it");
    assert!(server.state.records("items").iter().all(|r| r["id"] != "1"));
    assert!(items.row("1").is_some(), "provisional hide rolled back");
    assert_eq!(items.rows().len(), 2);
    assert_eq!(items.last_error().as_deref(), Some("replica lag"));
    assert!(!items.is_deleting("1"));

    items.reload().await?;
    assert!(items.row("1").is_none());
    assert!(items.last_error().is_none());
    Ok(())
}

#[tokio::test]
async fn row_is_hidden_while_delete_is_in_flight() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![json!({ "id": "1", "name": "A" })]).await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;
    server.state.delay_next("items", Op::Delete, Duration::from_millis(300));

    let pending = {
        let items = items.clone();
        tokio::spawn(async move { items.remove("1", &AssumeYes).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(items.row("1").is_none(), "optimistically hidden");
    assert!(items.is_deleting("1"));

    assert_eq!(pending.await??, RemoveOutcome::Deleted);
    assert!(items.row("1").is_none());
    Ok(())
}

#[tokio::test]
async fn declined_confirmation_sends_no_request() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![json!({ "id": "1", "name": "A" })]).await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;

    let asked = AtomicUsize::new(0);
    let decline = |prompt: &str| {
        assert!(prompt.contains("'1'"));
        asked.fetch_add(1, Ordering::SeqCst);
        false
    };
    let outcome = items.remove("1", &decline).await?;

    assert_eq!(outcome, RemoveOutcome::Declined);
    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert_eq!(server.hits("DELETE", "/api/items/delete/1"), 0);
    assert!(items.row("1").is_some());
    Ok(())
}

#[tokio::test]
async fn invalid_id_is_rejected_before_sending() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![]).await?;
    let items = server.collection(common::items_endpoint())?;

    for id in ["a/b", ".", ".."] {
        let err = items.remove(id, &AssumeYes).await.unwrap_err();
        assert!(matches!(err, ClientError::Config(_)), "id {:?}", id);
    }
    assert!(server.state.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn reload_failure_after_write_keeps_the_write() -> Result<()> {
    let server = common::start_with_items(EnvelopeStyle::Success, vec![]).await?;
    let items = server.collection(common::items_endpoint())?;
    server.state.fail_next("items", Op::List, 500, json!({ "message": "replica lag" }));

    items.create(&Draft::new().with("name", "Crate")).await?;

    assert_eq!(server.state.records("items").len(), 1);
    assert_eq!(items.last_error().as_deref(), Some("replica lag"));

    items.reload().await?;
    assert_eq!(items.rows().len(), 1);
    assert!(items.last_error().is_none());
    Ok(())
}

#[tokio::test]
async fn concurrent_mutations_settle_consistently() -> Result<()> {
    let server = common::start_with_items(
        EnvelopeStyle::Success,
        vec![json!({ "id": "1", "name": "A" }), json!({ "id": "2", "name": "B" })],
    )
    .await?;
    let items = server.collection(common::items_endpoint())?;
    items.reload().await?;

    let a = Draft::new().with("name", "C");
    let b = Draft::new().with("name", "D");
    let (created_c, created_d, deleted) = futures::join!(items.create(&a), items.create(&b), items.remove("1", &AssumeYes));
    created_c?;
    created_d?;
    assert_eq!(deleted?, RemoveOutcome::Deleted);

    items.reload().await?;
    let mut names: Vec<String> = items.rows().iter().map(|r| r.text("name")).collect();
    names.sort();
    assert_eq!(names, vec!["B", "C", "D"]);
    assert!(!items.is_loading() && !items.is_creating() && !items.is_deleting("1"));
    Ok(())
}
