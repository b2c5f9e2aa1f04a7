//! `casa serve`: Start the HTTP gateway.

use casa_agent::Assistant;
use casa_config::AppConfig;
use std::sync::Arc;

pub async fn run(port_override: Option<u16>, echo: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if echo {
        config.agent.enabled = Some(false);
    }

    let assistant = Arc::new(Assistant::from_config(&config).await?);

    println!("Casa Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Mode:      {}",
        if assistant.echo_mode() { "echo" } else { "agent" }
    );
    println!(
        "   Devices:   {}",
        assistant.devices().hub_name().unwrap_or("simulated")
    );
    if let Some(dir) = &config.gateway.static_dir {
        println!("   Static:    {}", dir.display());
    }

    casa_gateway::start(config, assistant).await?;

    Ok(())
}
