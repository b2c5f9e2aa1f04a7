//! Device access for Casa.
//!
//! - [`DeviceGateway`] is the only path to real-world effects. It is either
//!   backed by a hub or simulated, and the variant is checked once, here.
//! - [`status`] turns live attributes into the short phrases the prompt
//!   embeds.
//! - [`DirigeraHub`] talks to an IKEA DIRIGERA hub over its local REST API;
//!   [`InMemoryHub`] is a virtual hub for tests and demos.

pub mod dirigera;
pub mod gateway;
pub mod in_memory;
pub mod status;

use std::sync::Arc;

use casa_config::{HubConfig, HubKind};
use casa_core::device::HubClient;
use casa_core::error::DeviceError;
use tracing::info;

pub use dirigera::DirigeraHub;
pub use gateway::{DeviceGateway, DeviceHandles};
pub use in_memory::InMemoryHub;

/// Build the device gateway described by the hub configuration.
///
/// A disabled hub yields the simulated gateway; an enabled one is contacted
/// once to resolve the three devices by name.
pub async fn build_from_config(config: &HubConfig) -> Result<DeviceGateway, DeviceError> {
    if !config.enabled {
        info!("Device hub disabled, devices are simulated");
        return Ok(DeviceGateway::simulated());
    }

    let client: Arc<dyn HubClient> = match config.kind {
        HubKind::Dirigera => Arc::new(DirigeraHub::from_config(config)?),
        HubKind::Virtual => Arc::new(InMemoryHub::with_names(&config.devices)),
    };

    DeviceGateway::connect(client, &config.devices).await
}
