use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Canonical base URL of the NWS API.
pub const DEFAULT_BASE_URL: &str = "https://api.weather.gov";

/// Fallback identifying string when the caller configures none.
///
/// api.weather.gov requires an identifying User-Agent; real deployments
/// should set their own contact string via `with_user_agent`.
pub const DEFAULT_USER_AGENT: &str = concat!("nws-core/", env!("CARGO_PKG_VERSION"));

/// Default request deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default TTL for cached responses in seconds (10 minutes).
pub const DEFAULT_CACHE_TTL_SECS: i64 = 600;

/// Construction-time configuration for [`crate::NwsClient`].
///
/// Also serializable to disk so the CLI's `configure` command can persist
/// a contact string between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Identifying User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Base URL of the API; overridable for tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request deadline in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// How long successful responses stay cached, in seconds.
    /// One value applies to every endpoint.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: i64,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_cache_ttl() -> i64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_cache_ttl(mut self, secs: i64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    /// Load config from disk, or return defaults if no file exists yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: ClientConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "nws", "nws-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cfg.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS);
    }

    #[test]
    fn builder_overrides() {
        let cfg = ClientConfig::new()
            .with_user_agent("my-app/2.0 (ops@example.com)")
            .with_base_url("http://localhost:8080")
            .with_timeout(3)
            .with_cache_ttl(30);

        assert_eq!(cfg.user_agent, "my-app/2.0 (ops@example.com)");
        assert_eq!(cfg.base_url, "http://localhost:8080");
        assert_eq!(cfg.timeout_secs, 3);
        assert_eq!(cfg.cache_ttl_secs, 30);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: ClientConfig =
            toml::from_str("user_agent = \"my-app/1.0 (me@example.com)\"").expect("valid toml");

        assert_eq!(cfg.user_agent, "my-app/1.0 (me@example.com)");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.cache_ttl_secs, DEFAULT_CACHE_TTL_SECS);
    }

    #[test]
    fn roundtrips_through_toml() {
        let cfg = ClientConfig::new().with_user_agent("roundtrip/1.0");
        let text = toml::to_string_pretty(&cfg).expect("serializes");
        let back: ClientConfig = toml::from_str(&text).expect("parses");
        assert_eq!(back.user_agent, "roundtrip/1.0");
        assert_eq!(back.base_url, cfg.base_url);
    }
}
