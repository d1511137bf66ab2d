//! Chat API endpoints
//!
//! Handles HTTP requests for conversations and messages.

use crate::api::RouterState;
use crate::chat::{
    Conversation, ConversationPatch, ConversationSummary, Message, NewConversation, NewMessage,
};
use crate::error::AppError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::CONTENT_LENGTH, HeaderMap},
    response::Json,
};
use serde::Serialize;

/// Body returned by delete endpoints
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Always true; failures are returned as errors
    pub success: bool,
}

impl DeleteResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// GET /api/conversations - List all conversations
pub async fn list_conversations(
    State(store): State<RouterState>,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    Ok(Json(store.list_conversations().await?))
}

/// POST /api/conversations - Create a new conversation
///
/// A request without a body gets the default title and model; a body that
/// is present but not valid JSON for [`NewConversation`] is rejected.
pub async fn create_conversation(
    State(store): State<RouterState>,
    headers: HeaderMap,
    request: Result<Json<NewConversation>, JsonRejection>,
) -> Result<Json<Conversation>, AppError> {
    let options = match request {
        Ok(Json(options)) => options,
        Err(JsonRejection::MissingJsonContentType(_)) => NewConversation::default(),
        Err(_) if is_empty_body(&headers) => NewConversation::default(),
        Err(rejection) => return Err(AppError::InvalidRequest(rejection.body_text())),
    };
    Ok(Json(store.create_conversation(options).await?))
}

fn is_empty_body(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        == Some(0)
}

/// GET /api/conversations/:id - Get conversation with messages
pub async fn get_conversation(
    State(store): State<RouterState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, AppError> {
    let conversation = store
        .get_conversation(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Conversation not found: {}", id)))?;

    Ok(Json(conversation))
}

/// PUT /api/conversations/:id - Update title and/or model
pub async fn update_conversation(
    State(store): State<RouterState>,
    Path(id): Path<String>,
    Json(patch): Json<ConversationPatch>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(store.update_conversation(&id, patch).await?))
}

/// DELETE /api/conversations/:id - Delete a conversation
pub async fn delete_conversation(
    State(store): State<RouterState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    store.delete_conversation(&id).await?;
    Ok(DeleteResponse::ok())
}

/// POST /api/conversations/:id/messages - Append a message
pub async fn add_message(
    State(store): State<RouterState>,
    Path(id): Path<String>,
    Json(message): Json<NewMessage>,
) -> Result<Json<Message>, AppError> {
    Ok(Json(store.add_message(&id, message).await?))
}

/// DELETE /api/conversations/:id/messages/:message_id - Delete one message
pub async fn delete_message(
    State(store): State<RouterState>,
    Path((id, message_id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, AppError> {
    store.delete_message(&id, &message_id).await?;
    Ok(DeleteResponse::ok())
}

/// DELETE /api/conversations/:id/messages/:message_id/subsequent
pub async fn delete_message_and_subsequent(
    State(store): State<RouterState>,
    Path((id, message_id)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>, AppError> {
    store
        .delete_message_and_subsequent(&id, &message_id)
        .await?;
    Ok(DeleteResponse::ok())
}
