//! The single conversation session.
//!
//! History lives in a [`ConversationState`] behind a one-slot lock. A turn
//! holds the lock from snapshot to append, so two turns never interleave
//! their writes and a reset never lands in the middle of a turn.

use casa_core::message::{Conversation, ConversationId, Message};
use tokio::sync::{Mutex, MutexGuard};

/// Ordered history of the active conversation, absent until the first turn.
#[derive(Debug, Default)]
pub struct ConversationState {
    conversation: Option<Conversation>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a complete turn transcript, creating the conversation if needed.
    pub fn append(&mut self, turns: Vec<Message>) {
        self.conversation
            .get_or_insert_with(Conversation::new)
            .extend(turns);
    }

    /// A copy of the history, empty if there is none yet.
    pub fn snapshot(&self) -> Vec<Message> {
        self.conversation
            .as_ref()
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    /// Drop the whole history. Returns how many messages were discarded.
    pub fn reset(&mut self) -> usize {
        self.conversation.take().map_or(0, |c| c.len())
    }

    pub fn id(&self) -> Option<&ConversationId> {
        self.conversation.as_ref().map(|c| &c.id)
    }

    pub fn len(&self) -> usize {
        self.conversation.as_ref().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owned handle to the conversation state and its turn lock.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<ConversationState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the turn lock.
    pub async fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().await
    }

    /// Clear the history once any in-flight turn has finished.
    pub async fn reset(&self) -> usize {
        self.lock().await.reset()
    }

    pub async fn snapshot(&self) -> Vec<Message> {
        self.lock().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.lock().await.len()
    }
}
