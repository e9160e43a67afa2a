//! Server configuration.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen_addr: String,
    /// Base URL of the hosted Supabase project
    pub supabase_url: String,
    /// Public anon key of the project
    pub supabase_anon_key: String,
    /// Mark the session cookie `Secure` (serve over HTTPS)
    pub cookie_secure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            cookie_secure: false,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply `SUPABASE_URL` / `SUPABASE_ANON_KEY` when set and non-empty
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SUPABASE_URL").filter(|v| !v.is_empty()) {
            self.supabase_url = url;
        }
        if let Some(key) = lookup("SUPABASE_ANON_KEY").filter(|v| !v.is_empty()) {
            self.supabase_anon_key = key;
        }
    }

    /// The hosted backend needs both url and key
    pub fn validate(&self, in_memory: bool) -> anyhow::Result<()> {
        if in_memory {
            return Ok(());
        }
        if self.supabase_url.trim().is_empty() {
            bail!("supabase_url is not configured (set it in the config file or SUPABASE_URL)");
        }
        if self.supabase_anon_key.trim().is_empty() {
            bail!(
                "supabase_anon_key is not configured \
                 (set it in the config file or SUPABASE_ANON_KEY)"
            );
        }
        Ok(())
    }
}
