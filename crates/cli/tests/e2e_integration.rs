//! End-to-end tests for the Casa assistant.
//!
//! These drive full turns through the orchestrator with a scripted model,
//! real tools, and the in-memory hub, and check what the model was sent,
//! what the devices did, and what the session kept.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use casa_agent::Assistant;
use casa_config::{AppConfig, DeviceNames};
use casa_core::error::ProviderError;
use casa_core::message::{Message, MessageToolCall, Role};
use casa_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use casa_devices::{DeviceGateway, InMemoryHub};
use casa_tools::FixedClock;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Returns scripted responses in sequence and records every request.
struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<std::time::Duration>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    fn with_delay(
        responses: Vec<Result<ProviderResponse, ProviderError>>,
        delay: std::time::Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop();
        next.unwrap_or_else(|| panic!("ScriptedProvider exhausted"))
    }
}

fn text_response(text: &str) -> Result<ProviderResponse, ProviderError> {
    Ok(ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    })
}

fn tool_response(name: &str, args: serde_json::Value) -> Result<ProviderResponse, ProviderError> {
    let mut msg = Message::assistant("");
    msg.tool_calls.push(MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    });
    Ok(ProviderResponse {
        message: msg,
        usage: None,
        model: "mock".into(),
    })
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        chrono::NaiveDate::from_ymd_opt(2026, 10, 5)
            .unwrap()
            .and_hms_opt(15, 7, 0)
            .unwrap(),
    ))
}

async fn with_hub(provider: Arc<dyn Provider>) -> (Arc<InMemoryHub>, Assistant) {
    let hub = Arc::new(InMemoryHub::new());
    let devices = DeviceGateway::connect(hub.clone(), &DeviceNames::default())
        .await
        .unwrap();
    let assistant = Assistant::assemble(
        &AppConfig::default(),
        provider,
        Arc::new(devices),
        clock(),
    );
    (hub, assistant)
}

fn simulated(provider: Arc<ScriptedProvider>, config: &AppConfig) -> Assistant {
    Assistant::assemble(
        config,
        provider,
        Arc::new(DeviceGateway::simulated()),
        clock(),
    )
}

fn roles(messages: &[Message]) -> Vec<Role> {
    messages.iter().map(|m| m.role.clone()).collect()
}

// ── History ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_second_turn_sees_first_turn_transcript() {
    let provider = ScriptedProvider::new(vec![
        tool_response("toggle_desk_light", serde_json::json!({"is_on": true})),
        text_response("The desk lamp is on."),
        text_response("It was the desk lamp."),
    ]);
    let (_, assistant) = with_hub(provider.clone()).await;

    assistant.converse("Turn on the desk lamp").await.unwrap();
    let reply = assistant.converse("Which light did you switch?").await.unwrap();
    assert_eq!(reply, "It was the desk lamp.");

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);

    // system, then the full first turn, then the new prompt
    let second_turn = &requests[2].messages;
    assert_eq!(
        roles(second_turn),
        vec![
            Role::System,
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::User,
        ]
    );
    assert_eq!(second_turn[1].content, "Turn on the desk lamp");
    assert_eq!(second_turn[2].tool_calls[0].name, "toggle_desk_light");
    assert_eq!(second_turn[4].content, "The desk lamp is on.");
    assert_eq!(second_turn[5].content, "Which light did you switch?");
}

#[tokio::test]
async fn e2e_instructions_are_rebuilt_every_turn() {
    let provider = ScriptedProvider::new(vec![
        tool_response("toggle_desk_light", serde_json::json!({"is_on": true})),
        text_response("Done."),
        text_response("It is on."),
    ]);
    let (_, assistant) = with_hub(provider.clone()).await;

    assistant.converse("Desk lamp on").await.unwrap();
    assistant.converse("Is the desk lamp on?").await.unwrap();

    let requests = provider.requests();
    let first = &requests[0].messages[0].content;
    let later = &requests[2].messages[0].content;
    assert!(first.contains("\"toggle_desk_light\". It is currently off."));
    assert!(later.contains("\"toggle_desk_light\". It is currently on."));
}

#[tokio::test]
async fn e2e_reset_clears_history_for_next_turn() {
    let provider = ScriptedProvider::new(vec![
        text_response("Hello."),
        text_response("Hello again."),
    ]);
    let assistant = simulated(provider.clone(), &AppConfig::default());

    assistant.converse("Hi").await.unwrap();
    assert_eq!(assistant.reset().await, 2);
    assert_eq!(assistant.reset().await, 0);
    assert!(assistant.history().await.is_empty());

    assistant.converse("Hi again").await.unwrap();
    let last = provider.requests().pop().unwrap();
    assert_eq!(roles(&last.messages), vec![Role::System, Role::User]);
}

#[tokio::test]
async fn e2e_concurrent_turns_do_not_interleave() {
    let provider = ScriptedProvider::with_delay(
        vec![text_response("First."), text_response("Second.")],
        std::time::Duration::from_millis(20),
    );
    let assistant = Arc::new(simulated(provider.clone(), &AppConfig::default()));

    let a = tokio::spawn({
        let assistant = assistant.clone();
        async move { assistant.converse("one").await }
    });
    let b = tokio::spawn({
        let assistant = assistant.clone();
        async move { assistant.converse("two").await }
    });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let history = assistant.history().await;
    assert_eq!(
        roles(&history),
        vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
    );

    // The later turn was built on the earlier one's history
    let requests = provider.requests();
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[1].messages.len(), 4);
}

// ── Echo mode ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_echo_mode_touches_nothing() {
    let provider = ScriptedProvider::new(vec![]);
    let mut config = AppConfig::default();
    config.agent.enabled = Some(false);
    let assistant = simulated(provider.clone(), &config);

    let reply = assistant.converse("turn on the lamp").await.unwrap();
    assert_eq!(reply, "Echo: turn on the lamp");
    assert!(provider.requests().is_empty());
    assert!(assistant.history().await.is_empty());
}

// ── Devices ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_room_lights_update_reads_back() {
    let provider = ScriptedProvider::new(vec![
        tool_response(
            "toggle_room_lights",
            serde_json::json!({"new_status": {
                "is_on": true,
                "light_level": 30,
                "light_hue": 50.0,
                "light_saturation": 0.4
            }}),
        ),
        text_response("Dimmed and tinted."),
    ]);
    let (hub, assistant) = with_hub(provider).await;

    assistant.converse("Cozy lights please").await.unwrap();

    let attrs = hub.attributes_by_name("Licht 1").unwrap();
    assert!(attrs.is_on);
    assert_eq!(attrs.light_level, Some(30));
    assert_eq!(attrs.color_hue, Some(50.0));
    assert_eq!(attrs.color_saturation, Some(0.4));

    let tool_msg = &assistant.history().await[2];
    let readback: serde_json::Value = serde_json::from_str(&tool_msg.content).unwrap();
    assert_eq!(readback["light_level"], 30);
    assert_eq!(readback["is_on"], true);
}

#[tokio::test]
async fn e2e_hue_only_update_keeps_saturation() {
    let provider = ScriptedProvider::new(vec![
        tool_response(
            "toggle_room_lights",
            serde_json::json!({"new_status": {"light_hue": 70.0}}),
        ),
        text_response("Changed."),
    ]);
    let (hub, assistant) = with_hub(provider).await;

    assistant.converse("Make it greener").await.unwrap();

    let attrs = hub.attributes_by_name("Licht 1").unwrap();
    assert_eq!(attrs.color_saturation, Some(1.0));
    assert_eq!(attrs.color_hue, Some(0.0));
    assert!(hub.patches().is_empty());
}

#[tokio::test]
async fn e2e_out_of_range_brightness_is_rejected() {
    let provider = ScriptedProvider::new(vec![
        tool_response(
            "toggle_room_lights",
            serde_json::json!({"new_status": {"light_level": 150}}),
        ),
        text_response("Brightness only goes up to 100."),
    ]);
    let (hub, assistant) = with_hub(provider.clone()).await;

    assistant.converse("Brightness 150!").await.unwrap();

    assert!(hub.patches().is_empty());
    assert_eq!(hub.attributes_by_name("Licht 1").unwrap().light_level, Some(100));

    // The model saw the validation error
    let second = &provider.requests()[1];
    let tool_msg = second.messages.last().unwrap();
    assert_eq!(tool_msg.role, Role::Tool);
    assert!(tool_msg.content.contains("light_level"));
}

#[tokio::test]
async fn e2e_unavailable_device_is_reported_to_the_model() {
    let provider = ScriptedProvider::new(vec![
        tool_response("toggle_light_chain", serde_json::json!({"is_on": true})),
        text_response("Sorry, the light chain is not reachable."),
    ]);
    let (hub, assistant) = with_hub(provider.clone()).await;
    hub.set_offline(true);

    let reply = assistant.converse("Light chain on").await.unwrap();
    assert_eq!(reply, "Sorry, the light chain is not reachable.");

    // One attempt, no retry
    assert_eq!(provider.requests().len(), 2);
    let tool_msg = provider.requests()[1].messages.last().unwrap().clone();
    assert!(tool_msg.content.starts_with("Error: Device unavailable"));
    assert!(tool_msg.content.contains("light chain"));

    // Instructions still built while the hub was down
    assert!(
        provider.requests()[0].messages[0]
            .content
            .contains("unavailable")
    );
}

#[tokio::test]
async fn e2e_simulated_room_lights_report_off() {
    let provider = ScriptedProvider::new(vec![
        tool_response(
            "toggle_room_lights",
            serde_json::json!({"new_status": {"is_on": true}}),
        ),
        text_response("The lights seem to be off."),
    ]);
    let assistant = simulated(provider, &AppConfig::default());

    assistant.converse("Lights on").await.unwrap();

    let tool_msg = &assistant.history().await[2];
    let readback: serde_json::Value = serde_json::from_str(&tool_msg.content).unwrap();
    assert_eq!(readback["is_on"], false);
    assert!(readback["light_level"].is_null());
}

#[tokio::test]
async fn e2e_current_time_tool() {
    let provider = ScriptedProvider::new(vec![
        tool_response("get_current_time", serde_json::json!({})),
        text_response("It's just after three."),
    ]);
    let assistant = simulated(provider, &AppConfig::default());

    assistant.converse("What time is it?").await.unwrap();
    assert_eq!(
        assistant.history().await[2].content,
        "Monday, 5. October 2026. It is currently 03:07PM."
    );
}

// ── Failures ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_model_failure_leaves_history_unchanged() {
    let provider = ScriptedProvider::new(vec![
        text_response("First."),
        tool_response("toggle_desk_light", serde_json::json!({"is_on": true})),
        Err(ProviderError::Network("connection reset".into())),
    ]);
    let (hub, assistant) = with_hub(provider).await;

    assistant.converse("first").await.unwrap();
    let before = assistant.history().await;

    let err = assistant.converse("desk lamp on").await.unwrap_err();
    assert!(matches!(err, casa_core::Error::Provider(_)));

    let after = assistant.history().await;
    assert_eq!(after.len(), before.len());

    // The device call that happened before the failure is not rolled back
    assert!(hub.attributes_by_name("Tischlampe").unwrap().is_on);
}

/// Asks for the desk lamp, then never answers the follow-up; later calls
/// reply normally.
struct StallingProvider {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Provider for StallingProvider {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        match self.calls.fetch_add(1, Ordering::SeqCst) {
            0 => tool_response("toggle_desk_light", serde_json::json!({"is_on": true})),
            1 => std::future::pending().await,
            _ => text_response("Hello again."),
        }
    }
}

#[tokio::test]
async fn e2e_cancelled_turn_keeps_device_calls_and_skips_history() {
    let provider = Arc::new(StallingProvider {
        calls: AtomicUsize::new(0),
    });
    let (hub, assistant) = with_hub(provider).await;

    let outcome =
        tokio::time::timeout(Duration::from_millis(200), assistant.converse("Lamp on")).await;
    assert!(outcome.is_err());

    // The lamp was switched before the turn was dropped
    assert!(hub.attributes_by_name("Tischlampe").unwrap().is_on);
    assert!(assistant.history().await.is_empty());

    // The turn lock was released with the dropped future
    let reply = tokio::time::timeout(Duration::from_secs(5), assistant.converse("Hi"))
        .await
        .expect("turn lock still held")
        .unwrap();
    assert_eq!(reply, "Hello again.");
    assert_eq!(assistant.history().await.len(), 2);
}

// ── HTTP ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_http_converse_then_reset() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let provider = ScriptedProvider::new(vec![
        tool_response("toggle_desk_light", serde_json::json!({"is_on": true})),
        text_response("Lamp is on."),
    ]);
    let (hub, assistant) = with_hub(provider).await;
    let assistant = Arc::new(assistant);
    let config = AppConfig::default();
    let app = casa_gateway::build_router(
        Arc::new(casa_gateway::GatewayState {
            assistant: assistant.clone(),
        }),
        &config.gateway,
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/converse")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prompt": "desk lamp on"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], br#""Lamp is on.""#);
    assert!(hub.attributes_by_name("Tischlampe").unwrap().is_on);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(assistant.history().await.is_empty());
}
