//! `casa status`: Show configuration and live device status.

use casa_config::AppConfig;
use casa_core::device::HomeDevice;
use casa_devices::status::describe_live;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("Casa Status");
    println!("===========");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    let agent_enabled = config.agent_enabled();
    println!(
        "  Agent:        {}",
        match (agent_enabled, config.agent.enabled) {
            (true, _) => "enabled",
            (false, Some(false)) => "echo mode",
            (false, _) => "echo mode (no model configured)",
        }
    );
    if agent_enabled {
        let router = casa_providers::build_from_config(&config);
        let reachable = match router.default() {
            Some(provider) => match provider.health_check().await {
                Ok(true) => "reachable".to_string(),
                Ok(false) => "rejected the request".to_string(),
                Err(e) => format!("unreachable ({e})"),
            },
            None => "not available".to_string(),
        };
        println!("  Model API:    {reachable}");
    }
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("\n  No config file, using defaults and environment");
    }

    let devices = casa_devices::build_from_config(&config.hub).await?;
    println!();
    println!(
        "  Hub:          {}",
        devices.hub_name().unwrap_or("disabled (devices simulated)")
    );
    for device in HomeDevice::ALL {
        println!("  {:<13} {}", format!("{device}:"), describe_live(&devices, device).await);
    }

    Ok(())
}
