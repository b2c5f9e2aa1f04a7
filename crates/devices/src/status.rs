//! Human-readable device status lines for the system prompt.

use crate::gateway::DeviceGateway;
use casa_core::device::{DeviceAttributes, DeviceKind, HomeDevice};
use tracing::warn;

/// Describe a device from its attributes.
///
/// Outlets are just "on" or "off". The room lights, when on, also report
/// color and brightness.
pub fn describe(device: HomeDevice, attributes: &DeviceAttributes) -> String {
    if !attributes.is_on {
        return "off".to_string();
    }
    if device.kind() != DeviceKind::Light {
        return "on".to_string();
    }

    format!(
        "on (hue {:.1}, saturation {:.1}%, brightness {:.1}/100)",
        attributes.color_hue.unwrap_or(0.0),
        attributes.color_saturation.unwrap_or(0.0) * 100.0,
        f64::from(attributes.light_level.unwrap_or(0)),
    )
}

/// Read a device and describe it. Never fails.
pub async fn describe_live(gateway: &DeviceGateway, device: HomeDevice) -> String {
    match gateway.status(device).await {
        Ok(Some(attributes)) => describe(device, &attributes),
        Ok(None) => "off".to_string(),
        Err(e) => {
            warn!(%device, error = %e, "Could not read device status");
            "unavailable".to_string()
        }
    }
}
