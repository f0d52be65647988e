use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:7b";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub mode: String, // "server" or "stdio"
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { mode: "server".into(), port: 8080 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_ms: u64,
    pub retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.into(),
            model: DEFAULT_OLLAMA_MODEL.into(),
            timeout_ms: 30_000,
            retries: 1,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { timeout_ms: 5_000 }
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub history_window: usize,
    pub seed_todos: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { history_window: 50, seed_todos: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub relay: RelayConfig,
    pub agent: AgentConfig,
}

impl Config {
    /// Defaults overridden by environment variables only.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg
    }

    /// Optional TOML file named by `WEBMCP_CONFIG`, then env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("WEBMCP_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config {}: {e}", path.display()))?;
        Self::from_toml(&raw).map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env(&mut self) {
        if let Ok(mode) = std::env::var("MODE") {
            self.server.mode = mode;
        }
        if let Some(port) = env_parse::<u16>("PORT") {
            self.server.port = port;
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.backend.base_url = url;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            self.backend.model = model;
        }
        if let Some(ms) = env_parse::<u64>("BACKEND_TIMEOUT_MS") {
            self.backend.timeout_ms = ms;
        }
        if let Some(n) = env_parse::<u32>("BACKEND_RETRIES") {
            self.backend.retries = n;
        }
        if let Some(ms) = env_parse::<u64>("RELAY_TIMEOUT_MS") {
            self.relay.timeout_ms = ms;
        }
        if let Some(n) = env_parse::<usize>("HISTORY_WINDOW") {
            self.agent.history_window = n;
        }
        if let Ok(v) = std::env::var("SEED_TODOS") {
            self.agent.seed_todos = !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no");
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.server.mode.as_str(), "server" | "stdio") {
            anyhow::bail!("server.mode must be \"server\" or \"stdio\", got \"{}\"", self.server.mode);
        }
        if self.backend.base_url.trim().is_empty() {
            anyhow::bail!("backend.base_url cannot be empty");
        }
        if self.backend.model.trim().is_empty() {
            anyhow::bail!("backend.model cannot be empty");
        }
        if self.relay.timeout_ms == 0 {
            anyhow::bail!("relay.timeout_ms must be positive");
        }
        if self.agent.history_window == 0 {
            anyhow::bail!("agent.history_window must be positive");
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}
