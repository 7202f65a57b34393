use serde_json::{Map, Value};

/// Parses a response body read as text. Empty or non-JSON bodies are `None`.
pub fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

/// Pulls the record list out of whichever envelope the endpoint uses.
///
/// A bare array wins, then a `data` array; anything else is an empty list.
pub fn collection_items(body: Option<&Value>) -> Vec<Value> {
    match body {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Object(obj)) => match obj.get("data") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Single-record payload of a create/update response, if the backend echoes one
pub fn record_payload(body: Option<&Value>) -> Option<&Map<String, Value>> {
    match body? {
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Object(data)) => Some(data),
            Some(_) => None,
            None => Some(obj),
        },
        _ => None,
    }
}

/// `success: false` marks a logical failure even under a 2xx status
pub fn is_rejected(body: Option<&Value>) -> bool {
    matches!(body.and_then(|b| b.get("success")), Some(Value::Bool(false)))
}

/// Folds every error shape the backend produces into one display string.
///
/// Priority: `message`, `detail`, `title`, `error.message`, `error` as plain
/// strings; then validation lists or keyed maps found under `errors`,
/// `error` or `detail`, one `field: message` line each; then `HTTP <status>`.
pub fn extract_error_message(body: Option<&Value>, status: u16) -> String {
    let fallback = format!("HTTP {}", status);
    let Some(Value::Object(obj)) = body else {
        return match body {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => fallback,
        };
    };

    if let Some(message) = plain_message(obj) {
        return message;
    }

    for key in ["errors", "error", "detail"] {
        if let Some(value) = obj.get(key) {
            let lines = validation_lines(value);
            if !lines.is_empty() {
                return lines.join("\n");
            }
        }
    }

    fallback
}

fn plain_message(obj: &Map<String, Value>) -> Option<String> {
    let nested = obj.get("error").and_then(|e| e.get("message"));
    [obj.get("message"), obj.get("detail"), obj.get("title"), nested, obj.get("error")]
        .into_iter()
        .flatten()
        .find_map(non_empty_str)
}

fn non_empty_str(value: &Value) -> Option<String> {
    value.as_str().and_then(trimmed)
}

fn trimmed(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn validation_lines(value: &Value) -> Vec<String> {
    match value {
        Value::Array(entries) => entries.iter().filter_map(validation_entry).collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(field, messages)| {
                let text = messages_text(messages)?;
                Some(format!("{}: {}", field, text))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn validation_entry(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => trimmed(s),
        Value::Object(obj) => {
            let message = ["msg", "message", "detail"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(non_empty_str))?;
            match entry_field(obj) {
                Some(field) => Some(format!("{}: {}", field, message)),
                None => Some(message),
            }
        }
        _ => None,
    }
}

fn entry_field(obj: &Map<String, Value>) -> Option<String> {
    if let Some(Value::Array(loc)) = obj.get("loc") {
        // FastAPI-style locations start with the request part
        let parts: Vec<String> = loc
            .iter()
            .filter_map(|p| match p {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .skip_while(|p| matches!(p.as_str(), "body" | "query" | "path"))
            .collect();
        if !parts.is_empty() {
            return Some(parts.join("."));
        }
    }
    ["field", "path", "param"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(non_empty_str))
}

fn messages_text(messages: &Value) -> Option<String> {
    match messages {
        Value::String(s) => trimmed(s),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|m| match m {
                    Value::String(s) => trimmed(s),
                    Value::Object(o) => o.get("message").or_else(|| o.get("msg")).and_then(non_empty_str),
                    _ => None,
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
