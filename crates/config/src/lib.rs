//! Configuration loading, validation, and management for Casa.
//!
//! Loads configuration from `~/.casa/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.casa/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Agent behavior
    #[serde(default)]
    pub agent: AgentSettings,

    /// Device hub connection
    #[serde(default)]
    pub hub: HubConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("hub", &self.hub)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// When false the agent answers every prompt with an echo and never
    /// calls the model. Unset means echo unless a model is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Safety cap on model round-trips within one turn
    #[serde(default = "default_max_iterations")]
    pub max_tool_iterations: u32,
}

fn default_max_iterations() -> u32 {
    25
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            enabled: None,
            max_tool_iterations: default_max_iterations(),
        }
    }
}

/// Which hub implementation to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubKind {
    /// A DIRIGERA hub on the local network
    #[default]
    Dirigera,
    /// An in-process virtual hub, for demos without hardware
    Virtual,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// When false no hub is contacted and every device reports "off"
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub kind: HubKind,

    #[serde(default = "default_hub_host")]
    pub host: String,

    #[serde(default = "default_hub_port")]
    pub port: u16,

    /// Bearer token obtained by pairing with the hub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// The hub ships a self-signed certificate
    #[serde(default)]
    pub verify_tls: bool,

    #[serde(default = "default_hub_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub devices: DeviceNames,
}

fn default_hub_host() -> String {
    "host.docker.internal".into()
}
fn default_hub_port() -> u16 {
    8443
}
fn default_hub_timeout() -> u64 {
    10
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: HubKind::default(),
            host: default_hub_host(),
            port: default_hub_port(),
            token: None,
            verify_tls: false,
            timeout_secs: default_hub_timeout(),
            devices: DeviceNames::default(),
        }
    }
}

impl std::fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConfig")
            .field("enabled", &self.enabled)
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &redact(&self.token))
            .field("verify_tls", &self.verify_tls)
            .field("timeout_secs", &self.timeout_secs)
            .field("devices", &self.devices)
            .finish()
    }
}

/// Names the devices carry on the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceNames {
    #[serde(default = "default_desk_lamp")]
    pub desk_lamp: String,

    #[serde(default = "default_light_chain")]
    pub light_chain: String,

    #[serde(default = "default_room_lights")]
    pub room_lights: String,
}

fn default_desk_lamp() -> String {
    "Tischlampe".into()
}
fn default_light_chain() -> String {
    "Fotolicht".into()
}
fn default_room_lights() -> String {
    "Licht 1".into()
}

impl Default for DeviceNames {
    fn default() -> Self {
        Self {
            desk_lamp: default_desk_lamp(),
            light_chain: default_light_chain(),
            room_lights: default_room_lights(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Directory served under `/whisper/` (the speech front-end build)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,

    /// Cross-origin-isolation service worker served at `/coi-serviceworker.js`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_worker: Option<PathBuf>,
}

fn default_port() -> u16 {
    8912
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            static_dir: None,
            service_worker: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.casa/config.toml),
    /// then apply environment overrides:
    /// - `CASA_AGENT_ENABLED`, `CASA_HUB_ENABLED` (booleans)
    /// - `DIRIGERA_HUB_TOKEN`, `CASA_HUB_HOST`
    /// - `CASA_API_KEY`, then `OPENAI_API_KEY`
    /// - `CASA_PROVIDER`, `CASA_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CASA_AGENT_ENABLED") {
            self.agent.enabled = Some(parse_bool("CASA_AGENT_ENABLED", &raw)?);
        }
        if let Some(raw) = lookup("CASA_HUB_ENABLED") {
            self.hub.enabled = parse_bool("CASA_HUB_ENABLED", &raw)?;
        }
        if let Some(token) = lookup("DIRIGERA_HUB_TOKEN") {
            self.hub.token = Some(token);
        }
        if let Some(host) = lookup("CASA_HUB_HOST") {
            self.hub.host = host;
        }
        if self.api_key.is_none() {
            self.api_key = lookup("CASA_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("CASA_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("CASA_MODEL") {
            self.default_model = model;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".casa")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_iterations must be at least 1".into(),
            ));
        }

        if self.hub.enabled && self.hub.kind == HubKind::Dirigera && self.hub.token.is_none() {
            return Err(ConfigError::ValidationError(
                "hub is enabled but no token is set (hub.token or DIRIGERA_HUB_TOKEN)".into(),
            ));
        }

        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must not be 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available for the default provider (from
    /// config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// A key or an explicit endpoint for the default provider.
    pub fn model_configured(&self) -> bool {
        self.has_api_key()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_url.is_some())
    }

    /// Whether turns go to the model. An explicit `agent.enabled` wins;
    /// otherwise the agent runs only when a model is configured.
    pub fn agent_enabled(&self) -> bool {
        self.agent.enabled.unwrap_or_else(|| self.model_configured())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentSettings::default(),
            hub: HubConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::ValidationError(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
