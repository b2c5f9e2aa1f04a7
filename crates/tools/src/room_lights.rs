//! Color and brightness tool for the room lights.

use async_trait::async_trait;
use casa_core::device::{HomeDevice, LIGHT_HUE_MAX, LIGHT_LEVEL_MAX, LightStatus};
use casa_core::error::ToolError;
use casa_core::tool::{Tool, ToolResult};
use casa_devices::DeviceGateway;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
struct RoomLightsArgs {
    new_status: LightStatus,
}

pub struct RoomLightsTool {
    gateway: Arc<DeviceGateway>,
}

impl RoomLightsTool {
    pub fn new(gateway: Arc<DeviceGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for RoomLightsTool {
    fn name(&self) -> &str {
        "toggle_room_lights"
    }

    fn description(&self) -> &str {
        "Change color and brightness of the room lights. Returns the status of the lights after the change."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        // Hue is documented as 0-360 by the hub but only 0-100 is accepted here.
        serde_json::json!({
            "type": "object",
            "properties": {
                "new_status": {
                    "type": "object",
                    "description": "Desired status of the room lights. Omitted fields are left unchanged.",
                    "properties": {
                        "is_on": {
                            "type": ["boolean", "null"],
                            "description": "Whether the lights are on or off"
                        },
                        "light_level": {
                            "type": ["integer", "null"],
                            "description": "Brightness of the lights from 1 (lowest) to 100 (highest)",
                            "minimum": 0,
                            "maximum": LIGHT_LEVEL_MAX,
                            "default": LIGHT_LEVEL_MAX
                        },
                        "light_hue": {
                            "type": ["number", "null"],
                            "description": "Hue of the lights from 0 to 360",
                            "minimum": 0,
                            "maximum": LIGHT_HUE_MAX,
                            "default": 0
                        },
                        "light_saturation": {
                            "type": ["number", "null"],
                            "description": "Saturation of the lights from 0 to 1. Only applied together with light_hue.",
                            "minimum": 0,
                            "maximum": 1,
                            "default": 1
                        }
                    }
                }
            },
            "required": ["new_status"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: RoomLightsArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(format!("toggle_room_lights: {e}")))?;
        args.new_status.validate()?;

        let status = self
            .gateway
            .set_light(HomeDevice::RoomLights, &args.new_status)
            .await?;
        info!(?status, "Updated room lights");

        let data = serde_json::to_value(&status)
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "toggle_room_lights".into(),
                reason: e.to_string(),
            })?;
        Ok(ToolResult::structured(data))
    }
}
