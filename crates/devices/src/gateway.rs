//! Device gateway adapter.
//!
//! The capability bundle handed to every tool. It is either backed by a hub
//! client with the three devices resolved, or simulated. In simulation every
//! operation is a no-op that reports the device as off; it never fails.

use casa_config::DeviceNames;
use casa_core::device::{
    AttributePatch, DeviceAttributes, DeviceId, DeviceKind, HomeDevice, HubClient, LightStatus,
};
use casa_core::error::DeviceError;
use std::sync::Arc;
use tracing::{debug, info};

/// Hub identifiers of the three devices.
#[derive(Debug, Clone)]
pub struct DeviceHandles {
    pub desk_lamp: DeviceId,
    pub light_chain: DeviceId,
    pub room_lights: DeviceId,
}

impl DeviceHandles {
    fn id(&self, device: HomeDevice) -> &DeviceId {
        match device {
            HomeDevice::DeskLamp => &self.desk_lamp,
            HomeDevice::LightChain => &self.light_chain,
            HomeDevice::RoomLights => &self.room_lights,
        }
    }
}

enum Backend {
    Simulated,
    Hub {
        client: Arc<dyn HubClient>,
        handles: DeviceHandles,
    },
}

pub struct DeviceGateway {
    backend: Backend,
}

impl DeviceGateway {
    /// A gateway with no hub behind it.
    pub fn simulated() -> Self {
        Self {
            backend: Backend::Simulated,
        }
    }

    /// A gateway over an already-resolved set of devices.
    pub fn with_hub(client: Arc<dyn HubClient>, handles: DeviceHandles) -> Self {
        Self {
            backend: Backend::Hub { client, handles },
        }
    }

    /// Resolve the three devices on the hub by name and kind.
    pub async fn connect(
        client: Arc<dyn HubClient>,
        names: &DeviceNames,
    ) -> Result<Self, DeviceError> {
        let devices = client.list_devices().await?;

        let find = |name: &str, kind: DeviceKind| {
            devices
                .iter()
                .find(|d| d.kind == kind && d.attributes.custom_name == name)
                .map(|d| d.id.clone())
                .ok_or_else(|| DeviceError::NotFound {
                    kind: kind.to_string(),
                    name: name.to_string(),
                })
        };

        let handles = DeviceHandles {
            desk_lamp: find(&names.desk_lamp, DeviceKind::Outlet)?,
            light_chain: find(&names.light_chain, DeviceKind::Outlet)?,
            room_lights: find(&names.room_lights, DeviceKind::Light)?,
        };

        info!(
            hub = client.name(),
            desk_lamp = %handles.desk_lamp,
            light_chain = %handles.light_chain,
            room_lights = %handles.room_lights,
            "Connected to device hub"
        );

        Ok(Self::with_hub(client, handles))
    }

    /// Whether a hub is configured.
    pub fn has_gateway(&self) -> bool {
        matches!(self.backend, Backend::Hub { .. })
    }

    pub fn hub_name(&self) -> Option<&str> {
        match &self.backend {
            Backend::Simulated => None,
            Backend::Hub { client, .. } => Some(client.name()),
        }
    }

    /// Switch a device on or off.
    pub async fn set_power(&self, device: HomeDevice, on: bool) -> Result<(), DeviceError> {
        let Backend::Hub { client, handles } = &self.backend else {
            debug!(%device, on, "No hub, ignoring power change");
            return Ok(());
        };

        client
            .patch(handles.id(device), AttributePatch::IsOn(on))
            .await
            .map_err(|e| attribute_to(device, e))
    }

    /// Apply a partial update to a light and read it back.
    ///
    /// Fields are applied in order: power, brightness, then color. Color is
    /// only changed when hue and saturation are both present.
    pub async fn set_light(
        &self,
        device: HomeDevice,
        update: &LightStatus,
    ) -> Result<LightStatus, DeviceError> {
        let Backend::Hub { client, handles } = &self.backend else {
            debug!(%device, "No hub, reporting light as off");
            return Ok(LightStatus::off());
        };

        if device.kind() != DeviceKind::Light {
            return Err(DeviceError::Unsupported {
                device: device.to_string(),
                operation: "brightness and color".into(),
            });
        }

        let id = handles.id(device);
        let mut patches = Vec::with_capacity(3);
        if let Some(on) = update.is_on {
            patches.push(AttributePatch::IsOn(on));
        }
        if let Some(level) = update.light_level {
            patches.push(AttributePatch::LightLevel(level));
        }
        if let Some((hue, saturation)) = update.color() {
            patches.push(AttributePatch::Color { hue, saturation });
        }

        for patch in patches {
            client
                .patch(id, patch)
                .await
                .map_err(|e| attribute_to(device, e))?;
        }

        let attributes = client
            .attributes(id)
            .await
            .map_err(|e| attribute_to(device, e))?;
        Ok(LightStatus::from_attributes(&attributes))
    }

    /// Read a device's live attributes. `None` when there is no hub.
    pub async fn status(&self, device: HomeDevice) -> Result<Option<DeviceAttributes>, DeviceError> {
        let Backend::Hub { client, handles } = &self.backend else {
            return Ok(None);
        };

        client
            .attributes(handles.id(device))
            .await
            .map(Some)
            .map_err(|e| attribute_to(device, e))
    }
}

/// Name the home device in hub errors, which only know the raw id.
fn attribute_to(device: HomeDevice, err: DeviceError) -> DeviceError {
    match err {
        DeviceError::Unavailable { reason, .. } => DeviceError::unavailable(device.label(), reason),
        other => other,
    }
}
