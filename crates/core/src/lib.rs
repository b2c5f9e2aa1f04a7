//! # Casa Core
//!
//! Domain types, traits, and error definitions for the Casa smart-home agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that the provider, device, tool, and agent crates implement against.
//!
//! ## Seams
//!
//! - [`Provider`] — the language-model completion service
//! - [`HubClient`] — the physical device hub
//! - [`Tool`] — an operation the model may invoke
//!
//! Each seam is a trait so tests can substitute scripted or in-memory
//! implementations.

pub mod device;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use device::{
    AttributePatch, DeviceAttributes, DeviceId, DeviceInfo, DeviceKind, HomeDevice, HubClient,
    LightStatus,
};
pub use error::{DeviceError, Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
