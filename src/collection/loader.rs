use serde::Serialize;

use super::endpoint::EndpointDescriptor;
use super::field_map::ViewRow;
use crate::api::envelope::collection_items;
use crate::api::ApiClient;
use crate::error::ClientResult;

/// Result of one list load: rows on success, the display message on failure
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadOutcome {
    pub rows: Vec<ViewRow>,
    pub error: Option<String>,
}

impl LoadOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Fetches and normalizes a collection, propagating the error
pub async fn fetch_rows(client: &ApiClient, endpoint: &EndpointDescriptor) -> ClientResult<Vec<ViewRow>> {
    let path = endpoint.list_url(client.session())?;
    let response = client.get(&path).await?.into_result()?;
    let items = collection_items(response.body.as_ref());
    let rows = endpoint.field_map.map_records(&items);
    tracing::debug!(collection = %endpoint.name, received = items.len(), rows = rows.len(), "collection loaded");
    Ok(rows)
}

/// Never-failing form of [`fetch_rows`]
pub async fn load(client: &ApiClient, endpoint: &EndpointDescriptor) -> LoadOutcome {
    match fetch_rows(client, endpoint).await {
        Ok(rows) => LoadOutcome { rows, error: None },
        Err(err) => {
            tracing::warn!(collection = %endpoint.name, error = %err, "collection load failed");
            LoadOutcome {
                rows: Vec::new(),
                error: Some(err.user_message()),
            }
        }
    }
}
