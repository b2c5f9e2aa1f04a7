//! The Casa conversation core.
//!
//! One turn runs as:
//!
//! 1. **Compose** instructions from the persona and live device status
//! 2. **Call** the model with the prior history and the tool set
//! 3. **Dispatch** any tool calls to the devices, feed the results back,
//!    and call the model again
//! 4. **Append** the finished turn to the session and return the answer
//!
//! With the agent disabled every prompt is echoed back instead, without
//! touching the model, the devices or the history.

pub mod bootstrap;
pub mod loop_runner;
pub mod prompt;
pub mod session;

pub use bootstrap::Assistant;
pub use loop_runner::AgentLoop;
pub use prompt::build_instructions;
pub use session::{ConversationState, Session};
