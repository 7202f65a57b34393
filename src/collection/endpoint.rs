use std::collections::BTreeMap;

use reqwest::Method;

use super::field_map::FieldMap;
use crate::auth::AuthSession;
use crate::error::{ClientError, ClientResult};

/// Where a collection lives and how its records are shaped.
///
/// Paths are templates: `{id}` is the record id and `{user_id}` the id
/// derived from the session token (role-scoped collections).
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    pub name: String,
    pub list_path: String,
    pub create_path: String,
    pub update_path: String,
    pub delete_path: String,
    pub update_method: Method,
    pub field_map: FieldMap,
    /// View field name -> backend key, where the field map's primary alias is not what writes expect
    pub payload_map: BTreeMap<String, String>,
}

impl EndpointDescriptor {
    /// Conventional `/{resource}/list|create|update/{id}|delete/{id}` layout
    pub fn conventional(resource: &str, field_map: FieldMap) -> Self {
        Self {
            name: resource.to_string(),
            list_path: format!("/{}/list", resource),
            create_path: format!("/{}/create", resource),
            update_path: format!("/{}/update/{{id}}", resource),
            delete_path: format!("/{}/delete/{{id}}", resource),
            update_method: Method::PATCH,
            field_map,
            payload_map: BTreeMap::new(),
        }
    }

    /// REST layout on a single base: `GET|POST base`, `PUT|DELETE base/{id}`
    pub fn restful(name: &str, base: &str, field_map: FieldMap) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            name: name.to_string(),
            list_path: base.to_string(),
            create_path: base.to_string(),
            update_path: format!("{}/{{id}}", base),
            delete_path: format!("{}/{{id}}", base),
            update_method: Method::PUT,
            field_map,
            payload_map: BTreeMap::new(),
        }
    }

    pub fn with_payload_key(mut self, field: &str, backend_key: &str) -> Self {
        self.payload_map.insert(field.to_string(), backend_key.to_string());
        self
    }

    pub fn with_update_method(mut self, method: Method) -> Self {
        self.update_method = method;
        self
    }

    pub fn list_url(&self, session: &AuthSession) -> ClientResult<String> {
        render(&self.list_path, None, session)
    }

    pub fn create_url(&self, session: &AuthSession) -> ClientResult<String> {
        render(&self.create_path, None, session)
    }

    pub fn update_url(&self, id: &str, session: &AuthSession) -> ClientResult<String> {
        render(&self.update_path, Some(id), session)
    }

    pub fn delete_url(&self, id: &str, session: &AuthSession) -> ClientResult<String> {
        render(&self.delete_path, Some(id), session)
    }

    pub fn is_scoped(&self) -> bool {
        [&self.list_path, &self.create_path, &self.update_path, &self.delete_path]
            .iter()
            .any(|p| p.contains("{user_id}"))
    }
}

fn render(template: &str, id: Option<&str>, session: &AuthSession) -> ClientResult<String> {
    let mut path = template.to_string();

    if path.contains("{user_id}") {
        let user_id = session
            .user_id()
            .ok_or_else(|| ClientError::config(format!("'{}' needs a signed-in user id", template)))?;
        path = path.replace("{user_id}", &segment(user_id)?);
    }

    if path.contains("{id}") {
        let id = id.ok_or_else(|| ClientError::config(format!("'{}' needs a record id", template)))?;
        path = path.replace("{id}", &segment(id)?);
    }

    Ok(path)
}

/// Percent-encodes one path segment.
///
/// Separators and the dot segments `.`/`..` are refused outright since the
/// URL parser would resolve them against the parent path.
pub fn segment(value: &str) -> ClientResult<String> {
    let value = value.trim();
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\', '?', '#']) {
        return Err(ClientError::config(format!("'{}' is not a valid path segment", value)));
    }
    Ok(urlencoding::encode(value).into_owned())
}
