//! Country → state → city selector where each level depends on its parent.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::api::envelope::collection_items;
use crate::api::ApiClient;
use crate::collection::{segment, FieldMap, FieldSpec};
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoLevel {
    Country,
    State,
    City,
}

/// Path templates per level; `{country_id}` and `{state_id}` are substituted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoEndpoints {
    pub countries: String,
    pub states: String,
    pub cities: String,
}

impl Default for GeoEndpoints {
    fn default() -> Self {
        Self {
            countries: "/location/countries".to_string(),
            states: "/location/states/{country_id}".to_string(),
            cities: "/location/cities/{state_id}".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LevelState {
    pub options: Vec<GeoOption>,
    pub selected: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    generation: u64,
}

impl LevelState {
    /// Drops options and selection; bumping the generation orphans in-flight fetches
    fn reset(&mut self) {
        self.options.clear();
        self.selected = None;
        self.loading = false;
        self.error = None;
        self.generation += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoState {
    pub country: LevelState,
    pub state: LevelState,
    pub city: LevelState,
}

impl GeoState {
    fn level_mut(&mut self, level: GeoLevel) -> &mut LevelState {
        match level {
            GeoLevel::Country => &mut self.country,
            GeoLevel::State => &mut self.state,
            GeoLevel::City => &mut self.city,
        }
    }

    pub fn level(&self, level: GeoLevel) -> &LevelState {
        match level {
            GeoLevel::Country => &self.country,
            GeoLevel::State => &self.state,
            GeoLevel::City => &self.city,
        }
    }
}

#[derive(Clone)]
pub struct GeoSelector {
    client: ApiClient,
    endpoints: GeoEndpoints,
    maps: Arc<[FieldMap; 3]>,
    state: Arc<Mutex<GeoState>>,
}

// Level-specific keys only; a state row's `country_id` is its parent, not its id
fn options_map(level: GeoLevel) -> ClientResult<FieldMap> {
    let (id_key, name_key) = match level {
        GeoLevel::Country => ("country_id", "country_name"),
        GeoLevel::State => ("state_id", "state_name"),
        GeoLevel::City => ("city_id", "city_name"),
    };
    FieldMap::new(
        1,
        vec![
            FieldSpec::id(&["id", "_id", id_key, "code"]),
            FieldSpec::text("name", &["name", name_key, "title", "label"]),
        ],
    )
}

impl GeoSelector {
    pub fn new(client: ApiClient, endpoints: GeoEndpoints) -> ClientResult<Self> {
        Ok(Self {
            client,
            endpoints,
            maps: Arc::new([
                options_map(GeoLevel::Country)?,
                options_map(GeoLevel::State)?,
                options_map(GeoLevel::City)?,
            ]),
            state: Arc::new(Mutex::new(GeoState::default())),
        })
    }

    fn lock(&self) -> MutexGuard<'_, GeoState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> GeoState {
        self.lock().clone()
    }

    /// A level is usable once its parent has a selection and its own list is idle
    pub fn is_enabled(&self, level: GeoLevel) -> bool {
        let s = self.lock();
        match level {
            GeoLevel::Country => !s.country.loading,
            GeoLevel::State => s.country.selected.is_some() && !s.state.loading,
            GeoLevel::City => s.state.selected.is_some() && !s.city.loading,
        }
    }

    pub async fn load_countries(&self) -> ClientResult<()> {
        let path = self.endpoints.countries.clone();
        self.fetch_level(GeoLevel::Country, path).await
    }

    /// Clears state and city, then loads the states of `country_id`
    pub async fn select_country(&self, country_id: &str) -> ClientResult<()> {
        let path = self.endpoints.states.replace("{country_id}", &segment(country_id)?);
        {
            let mut s = self.lock();
            s.country.selected = Some(country_id.to_string());
            s.state.reset();
            s.city.reset();
        }
        self.fetch_level(GeoLevel::State, path).await
    }

    /// Clears the city, then loads the cities of `state_id`
    pub async fn select_state(&self, state_id: &str) -> ClientResult<()> {
        let path = self.endpoints.cities.replace("{state_id}", &segment(state_id)?);
        {
            let mut s = self.lock();
            if s.country.selected.is_none() {
                return Err(ClientError::validation("select a country first"));
            }
            s.state.selected = Some(state_id.to_string());
            s.city.reset();
        }
        self.fetch_level(GeoLevel::City, path).await
    }

    pub fn select_city(&self, city_id: &str) -> ClientResult<()> {
        let mut s = self.lock();
        if s.state.selected.is_none() {
            return Err(ClientError::validation("select a state first"));
        }
        s.city.selected = Some(city_id.to_string());
        Ok(())
    }

    pub fn clear(&self) {
        let mut s = self.lock();
        s.country.selected = None;
        s.state.reset();
        s.city.reset();
    }

    async fn fetch_level(&self, level: GeoLevel, path: String) -> ClientResult<()> {
        let generation = {
            let mut s = self.lock();
            let slot = s.level_mut(level);
            slot.generation += 1;
            slot.loading = true;
            slot.error = None;
            slot.generation
        };

        let result = self.fetch_options(level, &path).await;

        let mut s = self.lock();
        let slot = s.level_mut(level);
        if slot.generation != generation {
            tracing::debug!(?level, "discarding options for a superseded selection");
            return Ok(());
        }
        slot.loading = false;
        match result {
            Ok(options) => {
                slot.options = options;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(?level, error = %err, "failed to load options");
                slot.options.clear();
                slot.error = Some(err.user_message());
                Err(err)
            }
        }
    }

    async fn fetch_options(&self, level: GeoLevel, path: &str) -> ClientResult<Vec<GeoOption>> {
        let response = self.client.get(path).await?.into_result()?;
        let items = collection_items(response.body.as_ref());
        let map = &self.maps[level as usize];
        Ok(map
            .map_records(&items)
            .into_iter()
            .map(|row| GeoOption { name: row.text("name"), id: row.id })
            .collect())
    }
}
