pub mod storage;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::Value;

use crate::config::AuthConfig;

pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};

const BEARER_PREFIX: &str = "Bearer ";

// base64url that accepts payloads with or without `=` padding
const JWT_SEGMENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Bearer token plus the user id derived from it. Either may be absent.
#[derive(Clone, Default, PartialEq)]
pub struct AuthSession {
    token: Option<String>,
    user_id: Option<String>,
}

impl AuthSession {
    /// Unauthenticated session; requests go out without an Authorization header
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_token(token: impl Into<String>, config: &AuthConfig) -> Self {
        let token = strip_bearer(&token.into());
        if token.is_empty() {
            return Self::anonymous();
        }
        let user_id = decode_user_id(&token, &config.user_id_claims);
        Self { token: Some(token), user_id }
    }

    /// Reads the session from storage at mount time; never fails
    pub fn load(store: &dyn TokenStore, config: &AuthConfig) -> Self {
        match read_token(store, &config.token_keys) {
            Some(token) => Self::from_token(token, config),
            None => Self::anonymous(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("{}{}", BEARER_PREFIX, token))
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// First non-empty token found under the candidate keys, in order
pub fn read_token(store: &dyn TokenStore, keys: &[String]) -> Option<String> {
    keys.iter()
        .filter_map(|key| store.get(key))
        .map(|raw| strip_bearer(&raw))
        .find(|token| !token.is_empty())
}

fn strip_bearer(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix(BEARER_PREFIX)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Reads the user id out of a JWT payload without verifying the signature.
///
/// The claim names are tried in order; string claims are taken as-is and
/// numeric claims are stringified. Anything malformed yields `None`.
pub fn decode_user_id(token: &str, claims: &[String]) -> Option<String> {
    let payload = decode_payload(token)?;
    claims.iter().find_map(|claim| match payload.get(claim)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn decode_payload(token: &str) -> Option<serde_json::Map<String, Value>> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    // Standard-alphabet characters are folded into the url-safe alphabet
    let segment: String = parts[1]
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = JWT_SEGMENT.decode(segment.as_bytes()).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
