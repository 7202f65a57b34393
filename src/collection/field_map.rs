use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{ClientError, ClientResult};

/// How a mapped value is normalized, compared and shaped back into payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Date,
    Json,
}

impl FieldKind {
    pub fn default_value(&self) -> Value {
        match self {
            FieldKind::Text => Value::String(String::new()),
            FieldKind::Bool => Value::Bool(false),
            FieldKind::Number | FieldKind::Date | FieldKind::Json => Value::Null,
        }
    }

    /// Normalizes a raw value; `None` means the value is unusable for this kind
    pub fn coerce(&self, raw: &Value) -> Option<Value> {
        match self {
            FieldKind::Text => match raw {
                Value::String(s) => Some(Value::String(s.clone())),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
            FieldKind::Number => to_number(raw),
            FieldKind::Bool => match raw {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Number(n) => match n.as_f64() {
                    Some(v) if v == 0.0 => Some(Value::Bool(false)),
                    Some(v) if v == 1.0 => Some(Value::Bool(true)),
                    _ => None,
                },
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Some(Value::Bool(true)),
                    "false" | "0" | "no" => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            FieldKind::Date => match raw {
                Value::String(s) if !s.trim().is_empty() => Some(Value::String(s.trim().to_string())),
                Value::Number(_) => Some(raw.clone()),
                _ => None,
            },
            FieldKind::Json => Some(raw.clone()),
        }
    }
}

/// Finite numbers only; integral values stay integers
fn to_number(raw: &Value) -> Option<Value> {
    match raw {
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some(Value::Number(n.clone()))
            } else {
                n.as_f64().filter(|v| v.is_finite()).and_then(Number::from_f64).map(Value::Number)
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(i) = trimmed.parse::<i64>() {
                return Some(Value::from(i));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .and_then(Number::from_f64)
                .map(Value::Number)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Stable view-model name
    pub name: String,
    /// Server keys tried in priority order; the first is the payload key
    pub aliases: Vec<String>,
    pub kind: FieldKind,
    pub default: Value,
    pub identity: bool,
    pub required: bool,
    pub read_only: bool,
    pub searchable: bool,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, aliases: &[&str]) -> Self {
        let aliases = if aliases.is_empty() {
            vec![name.to_string()]
        } else {
            aliases.iter().map(|a| a.to_string()).collect()
        };
        Self {
            name: name.to_string(),
            aliases,
            kind,
            default: kind.default_value(),
            identity: false,
            required: false,
            read_only: false,
            searchable: false,
        }
    }

    /// Identity field; always normalized to a non-empty string
    pub fn id(aliases: &[&str]) -> Self {
        let mut spec = Self::new("id", FieldKind::Text, aliases);
        spec.identity = true;
        spec.read_only = true;
        spec.default = Value::Null;
        spec
    }

    pub fn text(name: &str, aliases: &[&str]) -> Self {
        Self::new(name, FieldKind::Text, aliases)
    }

    pub fn number(name: &str, aliases: &[&str]) -> Self {
        Self::new(name, FieldKind::Number, aliases)
    }

    pub fn boolean(name: &str, aliases: &[&str]) -> Self {
        Self::new(name, FieldKind::Bool, aliases)
    }

    pub fn date(name: &str, aliases: &[&str]) -> Self {
        Self::new(name, FieldKind::Date, aliases)
    }

    pub fn json(name: &str, aliases: &[&str]) -> Self {
        Self::new(name, FieldKind::Json, aliases)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    /// Key used when shaping a payload for the backend
    pub fn payload_key(&self) -> &str {
        self.aliases.first().map(String::as_str).unwrap_or(&self.name)
    }

    /// First alias that is present, non-null and coercible wins
    fn extract(&self, raw: &Map<String, Value>) -> Value {
        self.aliases
            .iter()
            .filter_map(|alias| raw.get(alias))
            .filter(|v| !v.is_null())
            .find_map(|v| self.kind.coerce(v))
            .unwrap_or_else(|| self.default.clone())
    }
}

/// A normalized record, keyed by view-model field names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    pub id: String,
    pub fields: BTreeMap<String, Value>,
}

impl ViewRow {
    pub fn get(&self, name: &str) -> Option<&Value> {
        if name == "id" {
            return None;
        }
        self.fields.get(name)
    }

    /// Display text; ids and nulls render as plain strings
    pub fn text(&self, name: &str) -> String {
        if name == "id" {
            return self.id.clone();
        }
        match self.fields.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    /// Opens a draft for editing; the row itself is never touched
    pub fn edit(&self) -> Draft {
        Draft {
            id: Some(self.id.clone()),
            fields: self.fields.clone(),
        }
    }
}

/// Pending edit of a row (or a new record when `id` is `None`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub id: Option<String>,
    pub fields: BTreeMap<String, Value>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Builds a draft from JSON object input keyed by view field names
    pub fn from_json(value: &Value) -> ClientResult<Self> {
        let Value::Object(obj) = value else {
            return Err(ClientError::validation("record input must be a JSON object"));
        };
        let mut draft = Draft::new();
        for (key, v) in obj {
            if key == "id" {
                draft.id = v.as_str().map(str::to_string).or_else(|| v.as_i64().map(|i| i.to_string()));
            } else {
                draft.fields.insert(key.clone(), v.clone());
            }
        }
        Ok(draft)
    }
}

/// Versioned table from server keys to view-model fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMap {
    pub version: u32,
    fields: Vec<FieldSpec>,
}

impl FieldMap {
    /// Validates the table once; every mapping afterwards can rely on it
    pub fn new(version: u32, fields: Vec<FieldSpec>) -> ClientResult<Self> {
        let identities = fields.iter().filter(|f| f.identity).count();
        if identities != 1 {
            return Err(ClientError::config(format!(
                "field map v{} must have exactly one identity field, found {}",
                version, identities
            )));
        }

        let mut names = BTreeSet::new();
        let mut aliases: BTreeMap<&str, &str> = BTreeMap::new();
        for field in &fields {
            if field.name.trim().is_empty() {
                return Err(ClientError::config("field name must not be empty"));
            }
            if !names.insert(field.name.as_str()) {
                return Err(ClientError::config(format!("duplicate field '{}'", field.name)));
            }
            if field.aliases.is_empty() {
                return Err(ClientError::config(format!("field '{}' has no source keys", field.name)));
            }
            for alias in &field.aliases {
                if let Some(owner) = aliases.insert(alias.as_str(), field.name.as_str()) {
                    if owner != field.name {
                        return Err(ClientError::config(format!(
                            "source key '{}' claimed by both '{}' and '{}'",
                            alias, owner, field.name
                        )));
                    }
                }
            }
        }

        Ok(Self { version, fields })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn searchable_fields(&self) -> Vec<String> {
        self.fields.iter().filter(|f| f.searchable).map(|f| f.name.clone()).collect()
    }

    fn identity(&self) -> &FieldSpec {
        // FieldMap::new guarantees exactly one
        self.fields.iter().find(|f| f.identity).unwrap_or(&self.fields[0])
    }

    /// Maps a raw server record; `None` when it carries no usable id
    pub fn map_record(&self, raw: &Value) -> Option<ViewRow> {
        let Value::Object(obj) = raw else {
            return None;
        };
        let id = match self.identity().extract(obj) {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return None,
        };
        let fields = self
            .fields
            .iter()
            .filter(|f| !f.identity)
            .map(|f| (f.name.clone(), f.extract(obj)))
            .collect();
        Some(ViewRow { id, fields })
    }

    /// Maps a collection, dropping rows without an id and repeated ids
    pub fn map_records(&self, raw: &[Value]) -> Vec<ViewRow> {
        let mut seen = BTreeSet::new();
        let mut rows = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;
        for record in raw {
            match self.map_record(record) {
                Some(row) if seen.insert(row.id.clone()) => rows.push(row),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            tracing::debug!(dropped, kept = rows.len(), "skipped records without a unique id");
        }
        rows
    }

    /// Checks required fields and renames the draft into backend keys
    pub fn shape_payload(&self, draft: &Draft, overrides: &BTreeMap<String, String>) -> ClientResult<Value> {
        let mut problems = Vec::new();
        let mut payload = Map::new();

        for field in self.fields.iter().filter(|f| !f.identity) {
            let value = draft.get(&field.name).filter(|v| !v.is_null());

            if field.required && value.map_or(true, is_blank) {
                problems.push(format!("{} is required", field.name));
                continue;
            }
            if field.read_only {
                continue;
            }
            let Some(value) = value else { continue };

            let shaped = match (field.kind, value) {
                (FieldKind::Text, Value::String(_)) | (FieldKind::Json, _) => Some(value.clone()),
                // An emptied optional number is cleared, not rejected
                (FieldKind::Number, Value::String(s)) if s.trim().is_empty() => Some(Value::Null),
                _ => field.kind.coerce(value),
            };
            match shaped {
                Some(v) => {
                    let key = overrides.get(&field.name).map(String::as_str).unwrap_or(field.payload_key());
                    payload.insert(key.to_string(), v);
                }
                None => problems.push(format!("{} has an invalid value", field.name)),
            }
        }

        for extra in draft.fields.keys().filter(|k| self.field(k).is_none()) {
            tracing::debug!(field = %extra, "ignoring draft field unknown to the field map");
        }

        if problems.is_empty() {
            Ok(Value::Object(payload))
        } else {
            Err(ClientError::Validation(problems.join("\n")))
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}
