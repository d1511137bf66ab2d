//! API module
//!
//! Contains HTTP request handlers that map onto the conversation store

pub mod chat;
pub mod health;
pub mod request_id;

use crate::chat::ConversationStore;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Shared handler state: the process-wide store handle
pub type RouterState = Arc<dyn ConversationStore>;

/// Routes for conversations and messages
pub fn chat_routes() -> Router<RouterState> {
    Router::new()
        .route(
            "/api/conversations",
            get(chat::list_conversations).post(chat::create_conversation),
        )
        .route(
            "/api/conversations/:id",
            get(chat::get_conversation)
                .put(chat::update_conversation)
                .delete(chat::delete_conversation),
        )
        .route("/api/conversations/:id/messages", post(chat::add_message))
        .route(
            "/api/conversations/:id/messages/:message_id",
            delete(chat::delete_message),
        )
        .route(
            "/api/conversations/:id/messages/:message_id/subsequent",
            delete(chat::delete_message_and_subsequent),
        )
}
