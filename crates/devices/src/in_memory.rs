//! In-memory virtual hub.
//!
//! Holds the three devices in process, applies patches the way the real hub
//! does, and records the most recent patches so callers can check what was
//! actuated.
//! Can be switched offline to exercise the unavailable path.

use async_trait::async_trait;
use casa_config::DeviceNames;
use casa_core::device::{
    AttributePatch, DeviceAttributes, DeviceId, DeviceInfo, DeviceKind, HubClient,
};
use casa_core::error::DeviceError;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Patches kept in the log; older entries are dropped.
pub const PATCH_LOG_CAPACITY: usize = 256;

pub struct InMemoryHub {
    devices: Mutex<Vec<DeviceInfo>>,
    patches: Mutex<VecDeque<(DeviceId, AttributePatch)>>,
    offline: AtomicBool,
}

impl InMemoryHub {
    /// A hub with the default device names.
    pub fn new() -> Self {
        Self::with_names(&DeviceNames::default())
    }

    /// A hub holding two outlets and one color light with the given names.
    pub fn with_names(names: &DeviceNames) -> Self {
        let devices = vec![
            DeviceInfo {
                id: DeviceId::new("virtual-outlet-1"),
                kind: DeviceKind::Outlet,
                attributes: DeviceAttributes::outlet(&names.desk_lamp),
            },
            DeviceInfo {
                id: DeviceId::new("virtual-outlet-2"),
                kind: DeviceKind::Outlet,
                attributes: DeviceAttributes::outlet(&names.light_chain),
            },
            DeviceInfo {
                id: DeviceId::new("virtual-light-1"),
                kind: DeviceKind::Light,
                attributes: DeviceAttributes::color_light(&names.room_lights),
            },
        ];
        Self::with_devices(devices)
    }

    pub fn with_devices(devices: Vec<DeviceInfo>) -> Self {
        Self {
            devices: Mutex::new(devices),
            patches: Mutex::new(VecDeque::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail as if the hub were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// The most recent patches, oldest first.
    pub fn patches(&self) -> Vec<(DeviceId, AttributePatch)> {
        self.patches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Current attributes of the device with the given name.
    pub fn attributes_by_name(&self, name: &str) -> Option<DeviceAttributes> {
        self.devices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|d| d.attributes.custom_name == name)
            .map(|d| d.attributes.clone())
    }

    fn ensure_online(&self, id: &DeviceId) -> Result<(), DeviceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DeviceError::unavailable(id.as_str(), "hub is offline"));
        }
        Ok(())
    }
}

impl Default for InMemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HubClient for InMemoryHub {
    fn name(&self) -> &str {
        "virtual"
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, DeviceError> {
        self.ensure_online(&DeviceId::new("hub"))?;
        Ok(self
            .devices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn attributes(&self, id: &DeviceId) -> Result<DeviceAttributes, DeviceError> {
        self.ensure_online(id)?;
        self.devices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|d| &d.id == id)
            .map(|d| d.attributes.clone())
            .ok_or_else(|| DeviceError::unavailable(id.as_str(), "unknown device id"))
    }

    async fn patch(&self, id: &DeviceId, patch: AttributePatch) -> Result<(), DeviceError> {
        self.ensure_online(id)?;
        {
            let mut devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
            let device = devices
                .iter_mut()
                .find(|d| &d.id == id)
                .ok_or_else(|| DeviceError::unavailable(id.as_str(), "unknown device id"))?;

            match (&patch, device.kind) {
                (AttributePatch::IsOn(on), _) => device.attributes.is_on = *on,
                (AttributePatch::LightLevel(level), DeviceKind::Light) => {
                    device.attributes.light_level = Some(*level)
                }
                (AttributePatch::Color { hue, saturation }, DeviceKind::Light) => {
                    device.attributes.color_hue = Some(*hue);
                    device.attributes.color_saturation = Some(*saturation);
                }
                _ => {
                    return Err(DeviceError::unavailable(
                        id.as_str(),
                        "hub rejected the attribute for this device type",
                    ));
                }
            }
        }

        let mut log = self.patches.lock().unwrap_or_else(|e| e.into_inner());
        if log.len() == PATCH_LOG_CAPACITY {
            log.pop_front();
        }
        log.push_back((id.clone(), patch));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_three_devices() {
        let hub = InMemoryHub::new();
        let devices = hub.list_devices().await.unwrap();
        assert_eq!(devices.len(), 3);
        assert_eq!(
            devices.iter().filter(|d| d.kind == DeviceKind::Outlet).count(),
            2
        );
    }

    #[tokio::test]
    async fn patch_is_applied_and_recorded() {
        let hub = InMemoryHub::new();
        let id = DeviceId::new("virtual-light-1");
        hub.patch(&id, AttributePatch::LightLevel(30)).await.unwrap();

        let attrs = hub.attributes(&id).await.unwrap();
        assert_eq!(attrs.light_level, Some(30));
        assert_eq!(hub.patches(), vec![(id, AttributePatch::LightLevel(30))]);
    }

    #[tokio::test]
    async fn patch_log_keeps_only_the_latest() {
        let hub = InMemoryHub::new();
        let id = DeviceId::new("virtual-light-1");
        let level = |i: usize| AttributePatch::LightLevel((i % 100) as u8);
        for i in 0..PATCH_LOG_CAPACITY + 10 {
            hub.patch(&id, level(i)).await.unwrap();
        }

        let patches = hub.patches();
        assert_eq!(patches.len(), PATCH_LOG_CAPACITY);
        assert_eq!(patches[0].1, level(10));
        assert_eq!(patches.last().unwrap().1, level(PATCH_LOG_CAPACITY + 9));
    }

    #[tokio::test]
    async fn outlets_reject_light_attributes() {
        let hub = InMemoryHub::new();
        let id = DeviceId::new("virtual-outlet-1");
        let err = hub.patch(&id, AttributePatch::LightLevel(30)).await;
        assert!(err.is_err());
        assert!(hub.patches().is_empty());
    }

    #[tokio::test]
    async fn offline_hub_fails_every_call() {
        let hub = InMemoryHub::new();
        hub.set_offline(true);
        let id = DeviceId::new("virtual-outlet-1");
        assert!(matches!(
            hub.patch(&id, AttributePatch::IsOn(true)).await,
            Err(DeviceError::Unavailable { .. })
        ));
        assert!(hub.list_devices().await.is_err());
        assert!(hub.patches().is_empty());
    }

    #[test]
    fn lookup_by_name() {
        let hub = InMemoryHub::new();
        let lamp = hub.attributes_by_name("Tischlampe").unwrap();
        assert!(!lamp.is_on);
        assert!(hub.attributes_by_name("Küche").is_none());
    }
}
