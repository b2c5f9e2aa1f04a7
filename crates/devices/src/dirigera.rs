//! DIRIGERA hub client.
//!
//! Talks to the hub's local REST API:
//! - `GET  /v1/devices` — every paired device with its attributes
//! - `GET  /v1/devices/{id}` — one device
//! - `PATCH /v1/devices/{id}` — body `[{"attributes": {...}}]`
//!
//! Requests carry the bearer token obtained during pairing. The hub serves a
//! self-signed certificate, so TLS verification is off unless configured.

use async_trait::async_trait;
use casa_config::HubConfig;
use casa_core::device::{AttributePatch, DeviceAttributes, DeviceId, DeviceInfo, HubClient};
use casa_core::error::DeviceError;
use std::time::Duration;
use tracing::{debug, warn};

pub struct DirigeraHub {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl DirigeraHub {
    pub fn new(
        host: &str,
        port: u16,
        token: impl Into<String>,
        verify_tls: bool,
        timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if !verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| DeviceError::unavailable("hub", format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base_url: format!("https://{host}:{port}/v1"),
            token: token.into(),
            client,
        })
    }

    pub fn from_config(config: &HubConfig) -> Result<Self, DeviceError> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| DeviceError::unavailable("hub", "no hub token configured"))?;
        Self::new(
            &config.host,
            config.port,
            token,
            config.verify_tls,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// The `attributes` object for one patch.
    fn patch_attributes(patch: &AttributePatch) -> serde_json::Value {
        match patch {
            AttributePatch::IsOn(on) => serde_json::json!({ "isOn": on }),
            AttributePatch::LightLevel(level) => serde_json::json!({ "lightLevel": level }),
            AttributePatch::Color { hue, saturation } => serde_json::json!({
                "colorHue": hue,
                "colorSaturation": saturation,
            }),
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        target: &str,
    ) -> Result<reqwest::Response, DeviceError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DeviceError::unavailable(target, e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DeviceError::unavailable(target, "hub rejected the access token"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, target, "Hub returned error");
            return Err(DeviceError::unavailable(
                target,
                format!("hub returned status {}", status.as_u16()),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl HubClient for DirigeraHub {
    fn name(&self) -> &str {
        "dirigera"
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, DeviceError> {
        let url = format!("{}/devices", self.base_url);
        let response = self.send(self.client.get(&url), "hub").await?;
        response
            .json::<Vec<DeviceInfo>>()
            .await
            .map_err(|e| DeviceError::unavailable("hub", format!("malformed device list: {e}")))
    }

    async fn attributes(&self, id: &DeviceId) -> Result<DeviceAttributes, DeviceError> {
        let url = format!("{}/devices/{id}", self.base_url);
        let response = self.send(self.client.get(&url), id.as_str()).await?;
        let info: DeviceInfo = response.json().await.map_err(|e| {
            DeviceError::unavailable(id.as_str(), format!("malformed device: {e}"))
        })?;
        Ok(info.attributes)
    }

    async fn patch(&self, id: &DeviceId, patch: AttributePatch) -> Result<(), DeviceError> {
        let url = format!("{}/devices/{id}", self.base_url);
        let body = serde_json::json!([{ "attributes": Self::patch_attributes(&patch) }]);
        debug!(device = %id, ?patch, "Patching device");
        self.send(self.client.patch(&url).json(&body), id.as_str())
            .await?;
        Ok(())
    }
}
