//! Chat module
//!
//! Handles conversation, message and attachment storage using a SQLite
//! database.

pub mod db;
pub mod models;
pub mod store;

pub use db::ChatDb;
pub use models::{
    Attachment, Conversation, ConversationPatch, ConversationSummary, Message, MessageRole,
    NewAttachment, NewConversation, NewMessage, DEFAULT_MODEL, DEFAULT_TITLE,
};
pub use store::ConversationStore;
