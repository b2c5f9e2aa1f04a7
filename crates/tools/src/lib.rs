//! Smart-home tools for Casa.
//!
//! The model can switch the two outlets, change the room lights, and read
//! the clock. Every device tool goes through the [`DeviceGateway`], so a
//! gateway without a hub turns them into harmless no-ops.

pub mod clock;
pub mod current_time;
pub mod outlet;
pub mod room_lights;

use casa_core::tool::ToolRegistry;
use casa_devices::DeviceGateway;
use std::sync::Arc;

pub use clock::{Clock, FixedClock, SystemClock};

/// Build the registry with every tool the assistant offers.
pub fn default_registry(gateway: Arc<DeviceGateway>, clock: Arc<dyn Clock>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(outlet::OutletTool::desk_light(gateway.clone())));
    registry.register(Box::new(outlet::OutletTool::light_chain(gateway.clone())));
    registry.register(Box::new(room_lights::RoomLightsTool::new(gateway)));
    registry.register(Box::new(current_time::CurrentTimeTool::new(clock)));
    registry
}
