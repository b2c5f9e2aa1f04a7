//! System instructions, composed fresh for every turn.

use casa_core::device::HomeDevice;
use casa_devices::DeviceGateway;
use casa_devices::status::describe_live;

const PERSONA: &str = "You are a smart-home assistant capable of controlling various devices.
Please keep all your responses short!";

/// Build the instructions for one turn from the live device status.
pub async fn build_instructions(devices: &DeviceGateway) -> String {
    let (desk_lamp, light_chain, room_lights) = tokio::join!(
        describe_live(devices, HomeDevice::DeskLamp),
        describe_live(devices, HomeDevice::LightChain),
        describe_live(devices, HomeDevice::RoomLights),
    );

    format!(
        "{PERSONA}

You currently have access to the following devices:
- A small desk lamp, controlled through the tool \"toggle_desk_light\". It is currently {desk_lamp}.
- A light chain, controlled through the tool \"toggle_light_chain\". It is currently {light_chain}.
- A set of room lights, controlled through the tool \"toggle_room_lights\". They are currently {room_lights}.

You can look up the current date and time with the tool \"get_current_time\".

Make use of these tools to control the smart-home devices and answer the user's queries."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use casa_config::DeviceNames;
    use casa_core::device::HubClient;
    use casa_core::device::{AttributePatch, DeviceId};
    use casa_devices::InMemoryHub;
    use std::sync::Arc;

    #[tokio::test]
    async fn simulated_devices_are_all_off() {
        let text = build_instructions(&DeviceGateway::simulated()).await;
        assert!(text.starts_with("You are a smart-home assistant"));
        assert!(text.contains("keep all your responses short"));
        assert!(text.contains("\"toggle_desk_light\". It is currently off."));
        assert!(text.contains("\"toggle_light_chain\". It is currently off."));
        assert!(text.contains("\"toggle_room_lights\". They are currently off."));
        assert!(text.contains("get_current_time"));
    }

    #[tokio::test]
    async fn reflects_state_changed_between_turns() {
        let hub = Arc::new(InMemoryHub::new());
        let gateway = DeviceGateway::connect(hub.clone(), &DeviceNames::default())
            .await
            .unwrap();

        let before = build_instructions(&gateway).await;
        assert!(before.contains("\"toggle_desk_light\". It is currently off."));

        // Someone flips the lamp outside the assistant
        hub.patch(&DeviceId::new("virtual-outlet-1"), AttributePatch::IsOn(true))
            .await
            .unwrap();
        hub.patch(&DeviceId::new("virtual-light-1"), AttributePatch::IsOn(true))
            .await
            .unwrap();

        let after = build_instructions(&gateway).await;
        assert!(after.contains("\"toggle_desk_light\". It is currently on."));
        assert!(after.contains(
            "They are currently on (hue 0.0, saturation 100.0%, brightness 100.0/100)."
        ));
    }

    #[tokio::test]
    async fn unreachable_hub_still_yields_instructions() {
        let hub = Arc::new(InMemoryHub::new());
        let gateway = DeviceGateway::connect(hub.clone(), &DeviceNames::default())
            .await
            .unwrap();
        hub.set_offline(true);

        let text = build_instructions(&gateway).await;
        assert!(text.contains("It is currently unavailable."));
    }
}
