//! On/off tools for the two outlet-backed devices.

use async_trait::async_trait;
use casa_core::device::HomeDevice;
use casa_core::error::ToolError;
use casa_core::tool::{Tool, ToolResult};
use casa_devices::DeviceGateway;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
struct PowerArgs {
    is_on: bool,
}

/// Switches one outlet on or off.
pub struct OutletTool {
    name: &'static str,
    description: &'static str,
    device: HomeDevice,
    gateway: Arc<DeviceGateway>,
}

impl OutletTool {
    pub fn desk_light(gateway: Arc<DeviceGateway>) -> Self {
        Self {
            name: "toggle_desk_light",
            description: "Turn the desk light on or off",
            device: HomeDevice::DeskLamp,
            gateway,
        }
    }

    pub fn light_chain(gateway: Arc<DeviceGateway>) -> Self {
        Self {
            name: "toggle_light_chain",
            description: "Turn the light chain on or off",
            device: HomeDevice::LightChain,
            gateway,
        }
    }
}

#[async_trait]
impl Tool for OutletTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "is_on": {
                    "type": "boolean",
                    "description": "True to turn on the lamp, False to turn it off."
                }
            },
            "required": ["is_on"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: PowerArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("{}: {e}", self.name)))?;

        self.gateway.set_power(self.device, args.is_on).await?;
        info!(device = %self.device, on = args.is_on, "Switched outlet");

        Ok(ToolResult::structured(serde_json::Value::Null))
    }
}
