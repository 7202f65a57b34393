use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::error::MockError;
use super::MockState;

/// Token claims issued by the platform's auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: &str, role: &str, ttl: chrono::Duration) -> Self {
        let exp = (chrono::Utc::now() + ttl).timestamp().max(0) as usize;
        Self {
            sub: user_id.to_string(),
            user_id: Some(user_id.to_string()),
            role: role.to_string(),
            exp,
        }
    }
}

/// Caller identity once the bearer token has been verified
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.user_id.unwrap_or(claims.sub),
            role: claims.role,
        }
    }
}

pub fn issue_token(secret: &str, claims: &Claims) -> anyhow::Result<String> {
    Ok(encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))?)
}

/// Verifies the bearer token when the backend runs with a secret
pub async fn jwt_auth_middleware(
    State(state): State<MockState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, MockError> {
    if let Some(secret) = state.jwt_secret() {
        let token = extract_jwt_from_headers(&headers).map_err(MockError::unauthorized)?;
        let claims = validate_jwt(&token, secret).map_err(MockError::unauthorized)?;
        request.extensions_mut().insert(AuthUser::from(claims));
    }
    Ok(next.run(request).await)
}

/// Scoped collections only serve the owner named in the token
pub fn check_owner(user: Option<&AuthUser>, owner: &str) -> Result<(), MockError> {
    match user {
        Some(u) if u.id != owner && u.role != "admin" => {
            Err(MockError::forbidden(format!("user {} cannot access collections of {}", u.id, owner)))
        }
        _ => Ok(()),
    }
}

fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty JWT token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

fn validate_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
        .map_err(|e| format!("Invalid JWT token: {}", e))?;
    Ok(token_data.claims)
}
