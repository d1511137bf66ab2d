//! Chat data models
//!
//! Defines structures for conversations, messages and attachments, plus the
//! input shapes accepted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Title given to conversations created without one
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Model assigned to conversations created without one
pub const DEFAULT_MODEL: &str = "glm-4.7-flash";

/// Current time as Unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

/// Common sender roles
///
/// Roles are stored as free-form text; this enum only names the usual ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user
    User,
    /// Message from the assistant/AI
    Assistant,
    /// System prompt
    System,
}

impl MessageRole {
    /// Convert the role to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// List-view projection of a conversation (no messages)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Unique identifier for the conversation
    pub id: String,
    /// Title of the conversation
    pub title: String,
    /// Model associated with the conversation
    pub model: String,
    /// When the conversation was created (Unix milliseconds)
    pub created_at: i64,
    /// When the conversation or one of its messages last changed (Unix milliseconds)
    pub updated_at: i64,
}

/// A conversation thread together with its messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier for the conversation
    pub id: String,
    /// Title of the conversation
    pub title: String,
    /// Model associated with the conversation
    pub model: String,
    /// When the conversation was created (Unix milliseconds)
    pub created_at: i64,
    /// When the conversation was last updated (Unix milliseconds)
    pub updated_at: i64,
    /// Messages ordered by creation time, oldest first
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Attach messages to a summary row
    pub fn from_summary(summary: ConversationSummary, messages: Vec<Message>) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            model: summary.model,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            messages,
        }
    }

    /// Get created_at as DateTime
    pub fn created_at_datetime(&self) -> DateTime<Utc> {
        millis_to_datetime(self.created_at)
    }

    /// Get updated_at as DateTime
    pub fn updated_at_datetime(&self) -> DateTime<Utc> {
        millis_to_datetime(self.updated_at)
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier for the message
    pub id: String,
    /// ID of the conversation this message belongs to
    pub conversation_id: String,
    /// Role of the message sender, not validated
    pub role: String,
    /// Content of the message
    pub content: String,
    /// Reasoning trace, if any
    pub thinking: Option<String>,
    /// How long the reasoning took, if recorded
    pub thinking_duration: Option<f64>,
    /// When the message was created (Unix milliseconds)
    pub created_at: i64,
    /// Files attached to this message
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Get created_at as DateTime
    pub fn created_at_datetime(&self) -> DateTime<Utc> {
        millis_to_datetime(self.created_at)
    }
}

/// A file reference owned by one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Unique identifier for the attachment
    pub id: String,
    /// ID of the owning message
    pub message_id: String,
    /// Stored file name
    pub filename: String,
    /// Name of the file as uploaded
    pub original_name: String,
    /// MIME type
    pub mimetype: String,
    /// Size in bytes
    pub size: i64,
    /// Storage location or URL
    pub path: String,
}

/// Options for creating a conversation
///
/// Absent or empty fields fall back to [`DEFAULT_TITLE`] and [`DEFAULT_MODEL`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    /// Requested title
    #[serde(default)]
    pub title: Option<String>,
    /// Requested model
    #[serde(default)]
    pub model: Option<String>,
}

impl NewConversation {
    /// Options with a title and the default model
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            model: None,
        }
    }

    /// Title to persist
    pub fn resolved_title(&self) -> &str {
        non_empty(self.title.as_deref()).unwrap_or(DEFAULT_TITLE)
    }

    /// Model to persist
    pub fn resolved_model(&self) -> &str {
        non_empty(self.model.as_deref()).unwrap_or(DEFAULT_MODEL)
    }
}

/// Partial update of a conversation
///
/// `None` leaves the column unchanged; `Some` is written verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPatch {
    /// New title
    #[serde(default)]
    pub title: Option<String>,
    /// New model
    #[serde(default)]
    pub model: Option<String>,
}

/// A message to append to a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    /// Sender role
    pub role: String,
    /// Message body
    pub content: String,
    /// Optional reasoning trace
    #[serde(default)]
    pub thinking: Option<String>,
    /// Optional reasoning duration
    #[serde(default, alias = "thinking_duration")]
    pub thinking_duration: Option<f64>,
    /// Files to attach
    #[serde(default)]
    pub attachments: Vec<NewAttachment>,
}

impl NewMessage {
    /// Message with the given role and content, no extras
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            thinking: None,
            thinking_duration: None,
            attachments: Vec::new(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User.as_str(), content)
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant.as_str(), content)
    }

    /// Set the reasoning trace and its duration
    pub fn with_thinking(mut self, thinking: impl Into<String>, duration: f64) -> Self {
        self.thinking = Some(thinking.into());
        self.thinking_duration = Some(duration);
        self
    }

    /// Add an attachment
    pub fn with_attachment(mut self, attachment: NewAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Thinking to persist; empty traces are stored as NULL
    pub fn stored_thinking(&self) -> Option<&str> {
        non_empty(self.thinking.as_deref())
    }

    /// Duration to persist; zero is stored as NULL
    pub fn stored_thinking_duration(&self) -> Option<f64> {
        self.thinking_duration.filter(|d| *d != 0.0)
    }
}

/// File metadata to store alongside a new message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttachment {
    /// Stored file name
    pub filename: String,
    /// Name of the file as uploaded
    pub original_name: String,
    /// MIME type
    pub mimetype: String,
    /// Size in bytes
    pub size: i64,
    /// Storage location
    #[serde(default)]
    pub path: Option<String>,
    /// Remote location, used when no path is given
    #[serde(default)]
    pub url: Option<String>,
}

impl NewAttachment {
    /// Location to persist: path, then url, then empty
    pub fn stored_path(&self) -> &str {
        non_empty(self.path.as_deref())
            .or_else(|| non_empty(self.url.as_deref()))
            .unwrap_or("")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
