use std::fs;
use std::path::PathBuf;

use crate::api::ApiClient;
use crate::auth::{AuthSession, FileTokenStore, TokenStore};
use crate::config::ClientConfig;

/// Everything a command needs: resolved config plus the on-disk token store
pub struct CliContext {
    pub config: ClientConfig,
    pub store: FileTokenStore,
}

impl CliContext {
    pub fn load(base_url: Option<String>) -> anyhow::Result<Self> {
        let mut config = crate::config::config().clone();
        if let Some(url) = base_url {
            config.api.base_url = url;
        }
        let dir = get_config_dir(&config)?;
        Ok(Self { store: FileTokenStore::in_dir(&dir), config })
    }

    pub fn session(&self) -> AuthSession {
        AuthSession::load(&self.store, &self.config.auth)
    }

    pub fn client(&self) -> anyhow::Result<ApiClient> {
        Ok(ApiClient::new(&self.config, self.session())?)
    }

    /// Key new tokens are written under
    pub fn token_key(&self) -> &str {
        self.config
            .auth
            .token_keys
            .first()
            .map(String::as_str)
            .unwrap_or("auth_token")
    }

    pub fn clear_tokens(&self) -> anyhow::Result<()> {
        for key in &self.config.auth.token_keys {
            self.store.remove(key)?;
        }
        Ok(())
    }
}

pub fn get_config_dir(config: &ClientConfig) -> anyhow::Result<PathBuf> {
    let config_dir = config.config_dir()?;
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }
    Ok(config_dir)
}

pub async fn ping_server(base_url: &str) -> bool {
    let client = reqwest::Client::new();
    let url = format!("{}/health", base_url.trim_end_matches('/'));

    match client.get(&url).timeout(std::time::Duration::from_secs(5)).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
