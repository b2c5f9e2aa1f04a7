//! Device domain types and the hub client seam.
//!
//! The home has exactly three devices. Two are plain outlets; the room
//! lights carry brightness and color on top of on/off. All real-world
//! effects go through a [`HubClient`].

use crate::error::{DeviceError, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Upper bound of `light_level`.
pub const LIGHT_LEVEL_MAX: u8 = 100;

/// Upper bound accepted for `light_hue`.
///
/// The hub's hue domain is 0–360, but updates are validated against 0–100.
/// Kept as is until the range is settled; see DESIGN.md.
pub const LIGHT_HUE_MAX: f64 = 100.0;

/// Upper bound of `light_saturation`.
pub const LIGHT_SATURATION_MAX: f64 = 1.0;

/// Hub-assigned device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Device type as reported by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Outlet,
    Light,
    /// Sensors, controllers, the hub itself
    #[serde(other)]
    Other,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Outlet => f.write_str("outlet"),
            DeviceKind::Light => f.write_str("light"),
            DeviceKind::Other => f.write_str("device"),
        }
    }
}

/// The devices the assistant controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomeDevice {
    DeskLamp,
    LightChain,
    RoomLights,
}

impl HomeDevice {
    pub const ALL: [HomeDevice; 3] = [
        HomeDevice::DeskLamp,
        HomeDevice::LightChain,
        HomeDevice::RoomLights,
    ];

    /// What kind of hub device backs this one.
    pub fn kind(self) -> DeviceKind {
        match self {
            HomeDevice::DeskLamp | HomeDevice::LightChain => DeviceKind::Outlet,
            HomeDevice::RoomLights => DeviceKind::Light,
        }
    }

    /// Human-readable name used in prompts and errors.
    pub fn label(self) -> &'static str {
        match self {
            HomeDevice::DeskLamp => "desk lamp",
            HomeDevice::LightChain => "light chain",
            HomeDevice::RoomLights => "room lights",
        }
    }
}

impl std::fmt::Display for HomeDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Live attributes of a device, in the hub's wire naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAttributes {
    #[serde(default)]
    pub custom_name: String,

    #[serde(default)]
    pub is_on: bool,

    /// 1–100, lights only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_level: Option<u8>,

    /// 0–360, color lights only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hue: Option<f64>,

    /// 0–1, color lights only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_saturation: Option<f64>,
}

impl DeviceAttributes {
    /// An outlet with the given name, switched off.
    pub fn outlet(name: impl Into<String>) -> Self {
        Self {
            custom_name: name.into(),
            is_on: false,
            light_level: None,
            color_hue: None,
            color_saturation: None,
        }
    }

    /// A color light with the given name, switched off at full brightness.
    pub fn color_light(name: impl Into<String>) -> Self {
        Self {
            custom_name: name.into(),
            is_on: false,
            light_level: Some(LIGHT_LEVEL_MAX),
            color_hue: Some(0.0),
            color_saturation: Some(LIGHT_SATURATION_MAX),
        }
    }
}

/// A device as listed by the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,

    #[serde(rename = "type")]
    pub kind: DeviceKind,

    pub attributes: DeviceAttributes,
}

/// A single attribute change sent to the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributePatch {
    IsOn(bool),
    LightLevel(u8),
    /// Hue and saturation always travel together
    Color { hue: f64, saturation: f64 },
}

/// Partial update / readback envelope for the room lights.
///
/// As an update, only the fields that are present are applied. As a
/// readback, every field reflects the light after the update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightStatus {
    /// Whether the lights are on or off
    #[serde(default)]
    pub is_on: Option<bool>,

    /// Brightness from 1 (lowest) to 100 (highest)
    #[serde(default)]
    pub light_level: Option<u8>,

    /// Hue of the lights
    #[serde(default)]
    pub light_hue: Option<f64>,

    /// Saturation from 0 to 1
    #[serde(default)]
    pub light_saturation: Option<f64>,
}

impl LightStatus {
    /// The readback reported when no hub is configured.
    pub fn off() -> Self {
        Self {
            is_on: Some(false),
            ..Self::default()
        }
    }

    /// Readback of the given attributes.
    pub fn from_attributes(attributes: &DeviceAttributes) -> Self {
        Self {
            is_on: Some(attributes.is_on),
            light_level: attributes.light_level,
            light_hue: attributes.color_hue,
            light_saturation: attributes.color_saturation,
        }
    }

    /// Color change carried by this update, if both halves are present.
    pub fn color(&self) -> Option<(f64, f64)> {
        match (self.light_hue, self.light_saturation) {
            (Some(hue), Some(saturation)) => Some((hue, saturation)),
            _ => None,
        }
    }

    /// Reject out-of-range fields before anything reaches a device.
    pub fn validate(&self) -> Result<(), ToolError> {
        if let Some(level) = self.light_level
            && level > LIGHT_LEVEL_MAX
        {
            return Err(ToolError::InvalidArguments(format!(
                "light_level must be between 0 and {LIGHT_LEVEL_MAX}, got {level}"
            )));
        }
        if let Some(hue) = self.light_hue
            && !(0.0..=LIGHT_HUE_MAX).contains(&hue)
        {
            return Err(ToolError::InvalidArguments(format!(
                "light_hue must be between 0 and {LIGHT_HUE_MAX}, got {hue}"
            )));
        }
        if let Some(saturation) = self.light_saturation
            && !(0.0..=LIGHT_SATURATION_MAX).contains(&saturation)
        {
            return Err(ToolError::InvalidArguments(format!(
                "light_saturation must be between 0 and {LIGHT_SATURATION_MAX}, got {saturation}"
            )));
        }
        Ok(())
    }
}

/// Client for the physical device hub.
///
/// Implementations: the DIRIGERA REST hub and an in-memory virtual hub.
#[async_trait]
pub trait HubClient: Send + Sync {
    /// A human-readable name for this hub (e.g., "dirigera").
    fn name(&self) -> &str;

    /// List every device the hub knows about.
    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, DeviceError>;

    /// Read the current attributes of one device.
    async fn attributes(&self, id: &DeviceId) -> Result<DeviceAttributes, DeviceError>;

    /// Apply one attribute change to a device.
    async fn patch(&self, id: &DeviceId, patch: AttributePatch) -> Result<(), DeviceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_above_range_is_rejected() {
        let status = LightStatus {
            light_level: Some(150),
            ..LightStatus::default()
        };
        assert!(matches!(
            status.validate(),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn hue_is_validated_against_hundred() {
        let ok = LightStatus {
            light_hue: Some(100.0),
            ..LightStatus::default()
        };
        assert!(ok.validate().is_ok());

        let too_high = LightStatus {
            light_hue: Some(180.0),
            ..LightStatus::default()
        };
        assert!(too_high.validate().is_err());
    }

    #[test]
    fn saturation_outside_unit_range_is_rejected() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let status = LightStatus {
                light_saturation: Some(bad),
                ..LightStatus::default()
            };
            assert!(status.validate().is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn color_needs_both_halves() {
        let hue_only = LightStatus {
            light_hue: Some(30.0),
            ..LightStatus::default()
        };
        assert!(hue_only.color().is_none());

        let both = LightStatus {
            light_hue: Some(30.0),
            light_saturation: Some(0.5),
            ..LightStatus::default()
        };
        assert_eq!(both.color(), Some((30.0, 0.5)));
    }

    #[test]
    fn missing_fields_deserialize_as_unset() {
        let status: LightStatus = serde_json::from_value(serde_json::json!({"is_on": true})).unwrap();
        assert_eq!(status.is_on, Some(true));
        assert!(status.light_level.is_none());
        assert!(status.color().is_none());
    }

    #[test]
    fn hub_device_listing_parses() {
        let json = serde_json::json!({
            "id": "abc-1",
            "type": "light",
            "deviceType": "light",
            "attributes": {
                "customName": "Licht 1",
                "isOn": true,
                "lightLevel": 40,
                "colorHue": 210.5,
                "colorSaturation": 0.8
            }
        });
        let info: DeviceInfo = serde_json::from_value(json).unwrap();
        assert_eq!(info.kind, DeviceKind::Light);
        assert_eq!(info.attributes.custom_name, "Licht 1");
        assert_eq!(info.attributes.light_level, Some(40));
    }

    #[test]
    fn unknown_device_types_are_other() {
        let kind: DeviceKind = serde_json::from_str("\"motionSensor\"").unwrap();
        assert_eq!(kind, DeviceKind::Other);
    }

    #[test]
    fn readback_mirrors_attributes() {
        let mut attrs = DeviceAttributes::color_light("Licht 1");
        attrs.is_on = true;
        let status = LightStatus::from_attributes(&attrs);
        assert_eq!(status.is_on, Some(true));
        assert_eq!(status.light_level, Some(100));
        assert_eq!(status.light_saturation, Some(1.0));
    }
}
