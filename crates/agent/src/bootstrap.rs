//! Wiring from configuration to a ready assistant.

use crate::loop_runner::AgentLoop;
use crate::session::Session;
use casa_config::AppConfig;
use casa_core::event::EventBus;
use casa_core::message::Message;
use casa_core::provider::Provider;
use casa_devices::DeviceGateway;
use casa_tools::{Clock, SystemClock};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a front-end needs: the loop, its session, and the devices.
pub struct Assistant {
    agent: AgentLoop,
    session: Arc<Session>,
    devices: Arc<DeviceGateway>,
    event_bus: Arc<EventBus>,
}

impl Assistant {
    /// Build the assistant described by the configuration.
    ///
    /// An enabled hub is contacted here to resolve the devices, so a hub that
    /// is unreachable at startup is an error. With `agent.enabled` unset and
    /// no model configured the assistant answers in echo mode.
    pub async fn from_config(config: &AppConfig) -> Result<Self, casa_core::Error> {
        let devices = Arc::new(casa_devices::build_from_config(&config.hub).await?);

        let enabled = config.agent_enabled();
        if config.agent.enabled.is_none() && !enabled {
            warn!(
                provider = %config.default_provider,
                "No model configured, answering in echo mode"
            );
        }
        let mut config = config.clone();
        config.agent.enabled = Some(enabled);
        let config = &config;

        let router = casa_providers::build_from_config(config);
        let provider = router.default().ok_or_else(|| casa_core::Error::Config {
            message: format!("provider '{}' is not available", config.default_provider),
        })?;

        Ok(Self::assemble(config, provider, devices, Arc::new(SystemClock)))
    }

    /// Build the assistant around an explicit provider, gateway and clock.
    ///
    /// The provider is taken as usable, so only an explicit
    /// `agent.enabled = false` selects echo mode.
    pub fn assemble(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        devices: Arc<DeviceGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let tools = Arc::new(casa_tools::default_registry(devices.clone(), clock));

        info!(
            provider = provider.name(),
            model = %config.default_model,
            tools = tools.len(),
            hub = devices.hub_name().unwrap_or("none"),
            echo = config.agent.enabled == Some(false),
            "Assistant ready"
        );

        let agent = AgentLoop::new(
            provider,
            &config.default_model,
            config.default_temperature,
            tools,
            devices.clone(),
            event_bus.clone(),
        )
        .with_max_iterations(config.agent.max_tool_iterations)
        .with_max_tokens(config.default_max_tokens)
        .with_echo(config.agent.enabled == Some(false));

        Self {
            agent,
            session: Arc::new(Session::new()),
            devices,
            event_bus,
        }
    }

    /// Run one turn against the shared session.
    pub async fn converse(&self, prompt: &str) -> Result<String, casa_core::Error> {
        self.agent.run_turn(&self.session, prompt).await
    }

    /// Clear the conversation history.
    pub async fn reset(&self) -> usize {
        self.agent.reset(&self.session).await
    }

    pub async fn history(&self) -> Vec<Message> {
        self.session.snapshot().await
    }

    pub fn echo_mode(&self) -> bool {
        self.agent.echo()
    }

    pub fn devices(&self) -> &DeviceGateway {
        &self.devices
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_builds_simulated_echo_assistant() {
        let assistant = Assistant::from_config(&AppConfig::default()).await.unwrap();
        assert!(!assistant.devices().has_gateway());
        assert!(assistant.echo_mode());
        assert_eq!(assistant.converse("hello").await.unwrap(), "Echo: hello");
    }

    #[tokio::test]
    async fn api_key_builds_live_assistant() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let assistant = Assistant::from_config(&config).await.unwrap();
        assert!(!assistant.echo_mode());
    }

    #[tokio::test]
    async fn explicit_enable_without_key_stays_live() {
        let mut config = AppConfig::default();
        config.agent.enabled = Some(true);
        let assistant = Assistant::from_config(&config).await.unwrap();
        assert!(!assistant.echo_mode());
    }

    #[tokio::test]
    async fn disabled_agent_echoes() {
        let mut config = AppConfig::default();
        config.agent.enabled = Some(false);
        let assistant = Assistant::from_config(&config).await.unwrap();

        assert!(assistant.echo_mode());
        assert_eq!(
            assistant.converse("turn on the lamp").await.unwrap(),
            "Echo: turn on the lamp"
        );
        assert!(assistant.history().await.is_empty());
    }

    #[tokio::test]
    async fn virtual_hub_is_connected() {
        let mut config = AppConfig::default();
        config.hub.enabled = true;
        config.hub.kind = casa_config::HubKind::Virtual;
        let assistant = Assistant::from_config(&config).await.unwrap();
        assert_eq!(assistant.devices().hub_name(), Some("virtual"));
    }
}
