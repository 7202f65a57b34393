use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::Method;
use serde::Serialize;

use super::endpoint::EndpointDescriptor;
use super::field_map::{Draft, ViewRow};
use super::loader::fetch_rows;
use crate::api::{ApiClient, ApiResponse};
use crate::auth::{AuthSession, TokenStore};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::view::{transform, ViewPage, ViewQuery, ViewSpec};

/// Asked before a delete request is issued
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Confirmation already given out of band (e.g. `--yes`)
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoveOutcome {
    Deleted,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatchState {
    /// Delete request still in flight
    Unconfirmed,
    /// Server accepted; dropped once a load issued after `after` lands
    Confirmed { after: u64 },
}

#[derive(Debug, Clone)]
struct PendingRemoval {
    id: String,
    state: PatchState,
}

#[derive(Debug, Default)]
struct CollectionState {
    rows: Vec<ViewRow>,
    removals: Vec<PendingRemoval>,
    loads_in_flight: usize,
    creates_in_flight: usize,
    saving: BTreeMap<String, usize>,
    deleting: BTreeMap<String, usize>,
    load_error: Option<String>,
    mutation_error: Option<String>,
    issued: u64,
    applied: u64,
    loaded: bool,
}

impl CollectionState {
    fn visible_rows(&self) -> Vec<ViewRow> {
        self.rows
            .iter()
            .filter(|row| !self.removals.iter().any(|p| p.id == row.id))
            .cloned()
            .collect()
    }
}

/// What a page renders: visible rows plus its inline status
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSnapshot {
    pub rows: Vec<ViewRow>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<String>,
}

enum Flag {
    Load,
    Create,
    Save(String),
    Delete(String),
}

/// Raises a loading flag and clears it on every exit path
struct FlagGuard {
    state: Arc<Mutex<CollectionState>>,
    flag: Flag,
}

impl FlagGuard {
    fn raise(state: &Arc<Mutex<CollectionState>>, flag: Flag) -> Self {
        {
            let mut s = lock(state);
            match &flag {
                Flag::Load => s.loads_in_flight += 1,
                Flag::Create => s.creates_in_flight += 1,
                Flag::Save(id) => *s.saving.entry(id.clone()).or_default() += 1,
                Flag::Delete(id) => *s.deleting.entry(id.clone()).or_default() += 1,
            }
        }
        Self { state: Arc::clone(state), flag }
    }
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        let mut s = lock(&self.state);
        match &self.flag {
            Flag::Load => s.loads_in_flight = s.loads_in_flight.saturating_sub(1),
            Flag::Create => s.creates_in_flight = s.creates_in_flight.saturating_sub(1),
            Flag::Save(id) => release(&mut s.saving, id),
            Flag::Delete(id) => release(&mut s.deleting, id),
        }
    }
}

fn release(counts: &mut BTreeMap<String, usize>, id: &str) {
    if let Some(count) = counts.get_mut(id) {
        *count -= 1;
        if *count == 0 {
            counts.remove(id);
        }
    }
}

fn lock(state: &Arc<Mutex<CollectionState>>) -> MutexGuard<'_, CollectionState> {
    // State stays consistent between statements, so a poisoned lock is still usable
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One dashboard page's collection: load, view, create, update, delete.
///
/// Cheap to clone; clones share state so concurrent calls see each other's flags.
#[derive(Clone)]
pub struct RemoteCollection {
    client: ApiClient,
    endpoint: Arc<EndpointDescriptor>,
    view_spec: Arc<ViewSpec>,
    state: Arc<Mutex<CollectionState>>,
}

impl RemoteCollection {
    pub fn new(client: ApiClient, endpoint: EndpointDescriptor) -> Self {
        let view_spec = ViewSpec::from_field_map(&endpoint.field_map);
        Self {
            client,
            endpoint: Arc::new(endpoint),
            view_spec: Arc::new(view_spec),
            state: Arc::new(Mutex::new(CollectionState::default())),
        }
    }

    /// Reads the session from storage now, the way a page does on mount
    pub fn open(config: &ClientConfig, store: &dyn TokenStore, endpoint: EndpointDescriptor) -> ClientResult<Self> {
        let session = AuthSession::load(store, &config.auth);
        let client = ApiClient::new(config, session)?;
        Ok(Self::new(client, endpoint))
    }

    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    pub fn view_spec(&self) -> &ViewSpec {
        &self.view_spec
    }

    pub fn rows(&self) -> Vec<ViewRow> {
        lock(&self.state).visible_rows()
    }

    pub fn row(&self, id: &str) -> Option<ViewRow> {
        self.rows().into_iter().find(|row| row.id == id)
    }

    pub fn view(&self, query: &ViewQuery) -> ViewPage<ViewRow> {
        transform(&self.rows(), self.view_spec.as_ref(), query)
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        let s = lock(&self.state);
        CollectionSnapshot {
            rows: s.visible_rows(),
            loading: s.loads_in_flight > 0,
            loaded: s.loaded,
            error: s.mutation_error.clone().or_else(|| s.load_error.clone()),
        }
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).loads_in_flight > 0
    }

    pub fn is_creating(&self) -> bool {
        lock(&self.state).creates_in_flight > 0
    }

    pub fn is_saving(&self, id: &str) -> bool {
        lock(&self.state).saving.contains_key(id)
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        lock(&self.state).deleting.contains_key(id)
    }

    /// Inline message for the page: last mutation failure, else last load failure
    pub fn last_error(&self) -> Option<String> {
        let s = lock(&self.state);
        s.mutation_error.clone().or_else(|| s.load_error.clone())
    }

    /// Full reload. Responses older than one already applied are discarded.
    pub async fn reload(&self) -> ClientResult<()> {
        let generation = {
            let mut s = lock(&self.state);
            s.issued += 1;
            s.issued
        };
        let _loading = FlagGuard::raise(&self.state, Flag::Load);

        let result = fetch_rows(&self.client, &self.endpoint).await;

        let mut s = lock(&self.state);
        if generation <= s.applied {
            tracing::debug!(collection = %self.endpoint.name, generation, applied = s.applied, "discarding superseded load");
            return Ok(());
        }
        match result {
            Ok(rows) => {
                s.rows = rows;
                s.applied = generation;
                s.loaded = true;
                s.load_error = None;
                s.removals.retain(|p| match p.state {
                    PatchState::Unconfirmed => true,
                    PatchState::Confirmed { after } => generation <= after,
                });
                Ok(())
            }
            Err(err) => {
                tracing::warn!(collection = %self.endpoint.name, error = %err, "reload failed");
                s.load_error = Some(err.user_message());
                Err(err)
            }
        }
    }

    pub async fn create(&self, draft: &Draft) -> ClientResult<()> {
        self.begin_mutation();
        let payload = self
            .endpoint
            .field_map
            .shape_payload(draft, &self.endpoint.payload_map)
            .map_err(|e| self.fail("create", e))?;
        let path = self
            .endpoint
            .create_url(self.client.session())
            .map_err(|e| self.fail("create", e))?;

        let result = {
            let _creating = FlagGuard::raise(&self.state, Flag::Create);
            self.client
                .send_json(Method::POST, &path, Some(&payload))
                .await
                .and_then(ApiResponse::into_result)
        };
        result.map_err(|e| self.fail("create", e))?;

        tracing::info!(collection = %self.endpoint.name, "record created");
        self.refresh_after_mutation().await;
        Ok(())
    }

    pub async fn update(&self, id: &str, draft: &Draft) -> ClientResult<()> {
        self.begin_mutation();
        let payload = self
            .endpoint
            .field_map
            .shape_payload(draft, &self.endpoint.payload_map)
            .map_err(|e| self.fail("update", e))?;
        let path = self
            .endpoint
            .update_url(id, self.client.session())
            .map_err(|e| self.fail("update", e))?;

        let result = {
            let _saving = FlagGuard::raise(&self.state, Flag::Save(id.to_string()));
            self.client
                .send_json(self.endpoint.update_method.clone(), &path, Some(&payload))
                .await
                .and_then(ApiResponse::into_result)
        };
        result.map_err(|e| self.fail("update", e))?;

        tracing::info!(collection = %self.endpoint.name, id, "record updated");
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Deletes after confirmation, hiding the row until the server answers.
    ///
    /// The row comes back if the delete fails or the follow-up reload fails.
    pub async fn remove(&self, id: &str, confirm: &dyn Confirm) -> ClientResult<RemoveOutcome> {
        let prompt = format!("Delete {} '{}'?", self.endpoint.name, id);
        if !confirm.confirm(&prompt) {
            return Ok(RemoveOutcome::Declined);
        }

        self.begin_mutation();
        let path = self
            .endpoint
            .delete_url(id, self.client.session())
            .map_err(|e| self.fail("delete", e))?;

        lock(&self.state).removals.push(PendingRemoval {
            id: id.to_string(),
            state: PatchState::Unconfirmed,
        });

        let result = {
            let _deleting = FlagGuard::raise(&self.state, Flag::Delete(id.to_string()));
            self.client
                .send_json(Method::DELETE, &path, None)
                .await
                .and_then(ApiResponse::into_result)
        };
        if let Err(err) = result {
            self.roll_back(id);
            return Err(self.fail("delete", err));
        }

        {
            let mut s = lock(&self.state);
            let after = s.issued;
            if let Some(patch) = s
                .removals
                .iter_mut()
                .find(|p| p.id == id && p.state == PatchState::Unconfirmed)
            {
                patch.state = PatchState::Confirmed { after };
            }
        }

        tracing::info!(collection = %self.endpoint.name, id, "record deleted");
        if self.reload().await.is_err() {
            self.roll_back(id);
        }
        Ok(RemoveOutcome::Deleted)
    }

    fn begin_mutation(&self) {
        lock(&self.state).mutation_error = None;
    }

    fn fail(&self, operation: &str, err: ClientError) -> ClientError {
        tracing::warn!(collection = %self.endpoint.name, operation, error = %err, "mutation failed");
        lock(&self.state).mutation_error = Some(err.user_message());
        err
    }

    fn roll_back(&self, id: &str) {
        let mut s = lock(&self.state);
        if let Some(pos) = s.removals.iter().position(|p| p.id == id) {
            s.removals.remove(pos);
        }
    }

    async fn refresh_after_mutation(&self) {
        // A failed reload is surfaced through `last_error`; the write itself succeeded
        if let Err(err) = self.reload().await {
            tracing::debug!(collection = %self.endpoint.name, error = %err, "reload after mutation failed");
        }
    }
}
