use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub view: ViewConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Scheme, host and port of the backend, e.g. `http://127.0.0.1:3000`
    pub base_url: String,
    /// Path prefix the backend is proxied under, e.g. `/api`
    pub prefix: String,
    pub timeout_secs: u64,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Storage keys tried for a bearer token, in priority order
    pub token_keys: Vec<String>,
    /// JWT claims tried for the user id, in priority order
    pub user_id_claims: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    pub default_page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the CLI's token store and other client state
    pub config_dir: Option<PathBuf>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_keys: ["auth_token", "token", "access_token", "jwt"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            user_id_claims: vec!["userId".to_string(), "sub".to_string()],
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("FLEETDESK_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Profile defaults first, then specific env vars win
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("FLEETDESK_BASE_URL") {
            self.api.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("FLEETDESK_API_PREFIX") {
            self.api.prefix = v;
        }
        if let Ok(v) = env::var("FLEETDESK_TIMEOUT_SECS") {
            self.api.timeout_secs = v.parse().unwrap_or(self.api.timeout_secs);
        }
        if let Ok(v) = env::var("FLEETDESK_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        if let Ok(v) = env::var("FLEETDESK_TOKEN_KEYS") {
            let keys = split_list(&v);
            if !keys.is_empty() {
                self.auth.token_keys = keys;
            }
        }
        if let Ok(v) = env::var("FLEETDESK_USER_ID_CLAIMS") {
            let claims = split_list(&v);
            if !claims.is_empty() {
                self.auth.user_id_claims = claims;
            }
        }

        if let Ok(v) = env::var("FLEETDESK_PAGE_SIZE") {
            self.view.default_page_size = v
                .parse()
                .ok()
                .filter(|size: &usize| *size > 0)
                .unwrap_or(self.view.default_page_size);
        }

        if let Ok(v) = env::var("FLEETDESK_CONFIG_DIR") {
            self.storage.config_dir = Some(PathBuf::from(v));
        }

        self
    }

    /// Config pointed at an explicit backend, used by tests and embedders
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::development();
        config.api.base_url = base_url.into().trim_end_matches('/').to_string();
        config
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://127.0.0.1:3000".to_string(),
                prefix: "/api".to_string(),
                timeout_secs: 30,
                enable_request_logging: true,
            },
            auth: AuthConfig::default(),
            view: ViewConfig { default_page_size: 10 },
            storage: StorageConfig { config_dir: None },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging.fleetdesk.example.com".to_string(),
                prefix: "/api".to_string(),
                timeout_secs: 20,
                enable_request_logging: true,
            },
            auth: AuthConfig::default(),
            view: ViewConfig { default_page_size: 10 },
            storage: StorageConfig { config_dir: None },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://fleetdesk.example.com".to_string(),
                prefix: "/api".to_string(),
                timeout_secs: 15,
                enable_request_logging: false,
            },
            auth: AuthConfig::default(),
            view: ViewConfig { default_page_size: 10 },
            storage: StorageConfig { config_dir: None },
        }
    }

    /// Directory for client-side state, `$HOME/.config/fleetdesk` unless overridden
    pub fn config_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.storage.config_dir {
            return Ok(dir.clone());
        }
        let home = env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        Ok(PathBuf::from(home).join(".config").join("fleetdesk"))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    pub port: u16,
    /// HS256 secret; when empty the backend accepts unauthenticated calls
    pub jwt_secret: String,
}

impl MockConfig {
    pub fn from_env() -> Self {
        let port = env::var("FLEETDESK_MOCK_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3000);

        Self {
            port,
            jwt_secret: env::var("FLEETDESK_MOCK_JWT_SECRET").unwrap_or_default(),
        }
    }
}

// Global singleton config, initialized on first access
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(ClientConfig::from_env);

pub fn config() -> &'static ClientConfig {
    &CONFIG
}
