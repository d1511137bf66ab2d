//! Storage abstraction for conversations and messages

use crate::chat::models::{
    Conversation, ConversationPatch, ConversationSummary, Message, NewConversation, NewMessage,
};
use crate::error::AppError;
use async_trait::async_trait;

/// Operations the HTTP layer needs from a conversation store
///
/// Missing rows are reported as [`AppError::NotFound`]; implementations must
/// not expose driver-specific error codes for that case.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Check that the backing store answers queries
    async fn ping(&self) -> Result<(), AppError>;

    /// All conversations, most recently updated first, without messages
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, AppError>;

    /// A conversation with its messages and attachments, or `None` if absent
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError>;

    /// Create a conversation, applying default title and model
    async fn create_conversation(&self, options: NewConversation)
        -> Result<Conversation, AppError>;

    /// Apply the fields present in `patch` and refresh `updated_at`
    async fn update_conversation(
        &self,
        id: &str,
        patch: ConversationPatch,
    ) -> Result<Conversation, AppError>;

    /// Delete a conversation and everything it owns; absent ids succeed
    async fn delete_conversation(&self, id: &str) -> Result<(), AppError>;

    /// Append a message (with attachments) and touch the parent's `updated_at`
    async fn add_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<Message, AppError>;

    /// Delete one message scoped to its conversation
    async fn delete_message(&self, conversation_id: &str, message_id: &str)
        -> Result<(), AppError>;

    /// Delete the named message
    ///
    /// Later messages are left in place.
    async fn delete_message_and_subsequent(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<(), AppError>;

    /// Release the underlying connections; safe to call twice
    async fn shutdown(&self);
}
