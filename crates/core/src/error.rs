//! Error types for the Casa domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Casa operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model service errors ---
    #[error("Model service error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Device errors ---
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the external model service. Fatal to the current turn.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

/// Failures of the device hub.
///
/// The simulated (no hub) path never produces these.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    #[error("{device} is unavailable: {reason}")]
    Unavailable { device: String, reason: String },

    #[error("No {kind} named '{name}' on the hub")]
    NotFound { kind: String, name: String },

    #[error("{device} does not support {operation}")]
    Unsupported { device: String, operation: String },
}

impl DeviceError {
    pub fn unavailable(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            device: device.into(),
            reason: reason.into(),
        }
    }
}

impl From<DeviceError> for ToolError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Unavailable { .. } | DeviceError::NotFound { .. } => {
                ToolError::DeviceUnavailable(err.to_string())
            }
            DeviceError::Unsupported { .. } => ToolError::InvalidArguments(err.to_string()),
        }
    }
}
