//! The conversation turn loop.

use crate::prompt::build_instructions;
use crate::session::Session;
use casa_core::event::{DomainEvent, EventBus};
use casa_core::message::Message;
use casa_core::provider::{Provider, ProviderRequest};
use casa_core::tool::{ToolCall, ToolRegistry};
use casa_devices::DeviceGateway;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Final answer when the model keeps calling tools past the iteration cap.
///
/// Tool calls in the last capped response are neither run nor stored.
pub const MAX_ITERATIONS_REPLY: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// Drives one conversation turn: compose instructions, call the model, run
/// the tools it asks for, repeat until it answers in plain text.
pub struct AgentLoop {
    /// The model service
    provider: Arc<dyn Provider>,

    model: String,

    temperature: f32,

    max_tokens: Option<u32>,

    tools: Arc<ToolRegistry>,

    /// Read for the live status in the instructions
    devices: Arc<DeviceGateway>,

    /// Maximum model round-trips per turn
    max_iterations: u32,

    event_bus: Arc<EventBus>,

    /// Answer every prompt with "Echo: <prompt>" and touch nothing
    echo: bool,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        devices: Arc<DeviceGateway>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            devices,
            max_iterations: 25,
            event_bus,
            echo: false,
        }
    }

    /// Set the maximum number of model round-trips per turn.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the max tokens per model response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Run one turn against the session and return the final text.
    ///
    /// The session is only updated when the turn completes. A model failure
    /// leaves the history as it was, and so does dropping the returned
    /// future; device calls made before that point stay applied.
    pub async fn run_turn(
        &self,
        session: &Session,
        prompt: &str,
    ) -> Result<String, casa_core::Error> {
        if self.echo {
            return Ok(format!("Echo: {prompt}"));
        }

        let mut state = session.lock().await;
        let conversation_id = state
            .id()
            .map(ToString::to_string)
            .unwrap_or_else(|| "new".into());
        let history = state.snapshot();

        info!(
            conversation_id = %conversation_id,
            history = history.len(),
            "Processing turn"
        );

        let instructions = build_instructions(&self.devices).await;
        let mut transcript = vec![Message::user(prompt)];

        match self
            .converse(&conversation_id, instructions, &history, &mut transcript)
            .await
        {
            Ok(reply) => {
                state.append(transcript);
                Ok(reply)
            }
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Turn failed");
                self.event_bus.publish(DomainEvent::TurnFailed {
                    conversation_id,
                    error_message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                Err(e)
            }
        }
    }

    /// Clear the session history.
    pub async fn reset(&self, session: &Session) -> usize {
        let discarded = session.reset().await;
        info!(discarded, "Conversation reset");
        self.event_bus.publish(DomainEvent::ConversationReset {
            discarded_messages: discarded,
            timestamp: chrono::Utc::now(),
        });
        discarded
    }

    /// The model/tool loop. Everything produced this turn lands in `transcript`.
    async fn converse(
        &self,
        conversation_id: &str,
        instructions: String,
        history: &[Message],
        transcript: &mut Vec<Message>,
    ) -> Result<String, casa_core::Error> {
        let system = Message::system(instructions);
        let tool_definitions = self.tools.definitions();

        for iteration in 1..=self.max_iterations {
            debug!(conversation_id, iteration, "Agent loop iteration");

            let mut messages = Vec::with_capacity(1 + history.len() + transcript.len());
            messages.push(system.clone());
            messages.extend_from_slice(history);
            messages.extend_from_slice(transcript);

            let request = ProviderRequest {
                model: self.model.clone(),
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = self.provider.complete(request).await?;

            if let Some(usage) = &response.usage {
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    conversation_id: conversation_id.to_string(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: chrono::Utc::now(),
                });
            }

            if response.message.tool_calls.is_empty() {
                let reply = response.message.content.clone();
                transcript.push(response.message);
                return Ok(reply);
            }

            // The model would never see these results
            if iteration == self.max_iterations {
                warn!(
                    conversation_id,
                    dropped_calls = response.message.tool_calls.len(),
                    "Not dispatching tool calls past the iteration cap"
                );
                break;
            }

            debug!(
                tool_count = response.message.tool_calls.len(),
                "Executing tool calls"
            );

            let tool_calls = response.message.tool_calls.clone();
            transcript.push(response.message);

            for tc in &tool_calls {
                let output = self.dispatch(&tc.id, &tc.name, &tc.arguments).await;
                transcript.push(Message::tool_result(&tc.id, output));
            }
        }

        warn!(
            conversation_id,
            iterations = self.max_iterations,
            "Max tool iterations reached, ending turn"
        );
        transcript.push(Message::assistant(MAX_ITERATIONS_REPLY));
        Ok(MAX_ITERATIONS_REPLY.to_string())
    }

    /// Run one tool call. Failures become the text the model sees, so it can
    /// correct its arguments or tell the user; nothing is retried.
    async fn dispatch(&self, id: &str, name: &str, raw_arguments: &str) -> String {
        let start = std::time::Instant::now();

        let result = match parse_arguments(raw_arguments) {
            Ok(arguments) => {
                let call = ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments,
                };
                self.tools.execute(&call).await
            }
            Err(e) => Err(e),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: name.to_string(),
            success: result.as_ref().is_ok_and(|r| r.success),
            duration_ms,
            timestamp: chrono::Utc::now(),
        });

        match result {
            Ok(tool_result) => {
                debug!(tool = name, duration_ms, "Tool succeeded");
                tool_result.output
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Tool execution failed");
                format!("Error: {e}")
            }
        }
    }
}

/// Tool arguments arrive as a JSON string; an empty string means no arguments.
fn parse_arguments(raw: &str) -> Result<serde_json::Value, casa_core::ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw)
        .map_err(|e| casa_core::ToolError::InvalidArguments(format!("arguments are not JSON: {e}")))
}
