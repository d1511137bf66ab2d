//! Chat database operations
//!
//! Handles all database interactions for conversations, messages and
//! attachments.

use crate::chat::models::{
    now_millis, Attachment, Conversation, ConversationPatch, ConversationSummary, Message,
    NewConversation, NewMessage,
};
use crate::chat::store::ConversationStore;
use crate::config::DatabaseConfig;
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Message row before its attachments are joined in
#[derive(Debug, FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    thinking: Option<String>,
    thinking_duration: Option<f64>,
    created_at: i64,
}

impl MessageRow {
    fn into_message(self, attachments: Vec<Attachment>) -> Message {
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            role: self.role,
            content: self.content,
            thinking: self.thinking,
            thinking_duration: self.thinking_duration,
            created_at: self.created_at,
            attachments,
        }
    }
}

/// SQLite-backed conversation store
///
/// Holds one connection pool for the lifetime of the process; clone the
/// surrounding `Arc` rather than opening a second store.
pub struct ChatDb {
    pool: SqlitePool,
}

impl ChatDb {
    /// Open the database file at `db_path` with the default pool size
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        Self::connect(&DatabaseConfig::for_path(db_path)).await
    }

    /// Initialize the database connection pool and schema
    ///
    /// # Arguments
    /// * `config` - Database location and pool size
    ///
    /// # Returns
    /// * `Ok(ChatDb)` if successful
    /// * `Err(AppError::Connection)` if the database cannot be opened
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let db_path = config.url.as_str();
        let file_path = db_path
            .strip_prefix("sqlite://")
            .or_else(|| db_path.strip_prefix("sqlite:"))
            .unwrap_or(db_path);
        let file_path = file_path.split('?').next().unwrap_or(file_path);

        // Ensure parent directory exists
        if !file_path.starts_with(":memory:") {
            if let Some(parent) = Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        error!(path = %parent.display(), error = %e, "Failed to create db directory");
                        AppError::Connection(format!("Failed to create db directory: {}", e))
                    })?;
                }
            }
        }

        // SQLite connection string format: sqlite:path/to/db.db
        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::Connection(format!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!(database = %db_path, error = %e, "Database connection failed");
                AppError::Connection(e.to_string())
            })?;

        info!("Connected to SQLite database at: {}", db_path);

        let db = Self { pool };
        db.ensure_schema().await?;

        Ok(db)
    }

    /// Create the tables and indexes if they are missing
    async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::raw_sql(include_str!("../../schema/chat.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Schema setup failed: {}", e)))?;

        debug!("Chat schema ready");
        Ok(())
    }

    async fn fetch_summary(&self, id: &str) -> Result<Option<ConversationSummary>, AppError> {
        let summary = sqlx::query_as::<_, ConversationSummary>(
            "SELECT id, title, model, created_at, updated_at FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Messages of a conversation, oldest first, each with its attachments
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, conversation_id, role, content, thinking, thinking_duration, created_at \
             FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT a.id, a.message_id, a.filename, a.original_name, a.mimetype, a.size, a.path \
             FROM attachments a JOIN messages m ON m.id = a.message_id \
             WHERE m.conversation_id = ? ORDER BY a.rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_message: HashMap<String, Vec<Attachment>> = HashMap::new();
        for attachment in attachments {
            by_message
                .entry(attachment.message_id.clone())
                .or_default()
                .push(attachment);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let attachments = by_message.remove(&row.id).unwrap_or_default();
                row.into_message(attachments)
            })
            .collect())
    }

    /// Update conversation's updated_at timestamp (when new message is added)
    async fn touch_conversation(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Conversation not found: {}", id)));
        }
        Ok(())
    }

    async fn delete_conversation_row(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Conversation not found: {}", id)));
        }
        Ok(())
    }
}

/// Map a failed message insert onto NotFound when the parent is missing
fn missing_parent(err: sqlx::Error, conversation_id: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            AppError::NotFound(format!("Conversation not found: {}", conversation_id))
        }
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl ConversationStore for ChatDb {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, AppError> {
        let conversations = sqlx::query_as::<_, ConversationSummary>(
            "SELECT id, title, model, created_at, updated_at FROM conversations \
             ORDER BY updated_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        let Some(summary) = self.fetch_summary(id).await? else {
            return Ok(None);
        };
        let messages = self.fetch_messages(id).await?;

        Ok(Some(Conversation::from_summary(summary, messages)))
    }

    async fn create_conversation(
        &self,
        options: NewConversation,
    ) -> Result<Conversation, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = now_millis();
        let title = options.resolved_title().to_string();
        let model = options.resolved_model().to_string();

        sqlx::query(
            "INSERT INTO conversations (id, title, model, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&title)
        .bind(&model)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(conversation_id = %id, model = %model, "Created conversation");
        Ok(Conversation {
            id,
            title,
            model,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        })
    }

    async fn update_conversation(
        &self,
        id: &str,
        patch: ConversationPatch,
    ) -> Result<Conversation, AppError> {
        let result = sqlx::query(
            "UPDATE conversations SET title = COALESCE(?, title), model = COALESCE(?, model), \
             updated_at = ? WHERE id = ?",
        )
        .bind(patch.title)
        .bind(patch.model)
        .bind(now_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Conversation not found: {}", id)));
        }

        debug!(conversation_id = %id, "Updated conversation");
        self.get_conversation(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Conversation not found: {}", id)))
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), AppError> {
        match self.delete_conversation_row(id).await {
            Ok(()) => {
                debug!(conversation_id = %id, "Deleted conversation");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(conversation_id = %id, "Conversation already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<Message, AppError> {
        let id = Uuid::new_v4().to_string();
        let created_at = now_millis();
        let thinking = message.stored_thinking().map(str::to_string);
        let thinking_duration = message.stored_thinking_duration();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, thinking, thinking_duration, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(&message.role)
        .bind(&message.content)
        .bind(&thinking)
        .bind(thinking_duration)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| missing_parent(e, conversation_id))?;

        let mut attachments = Vec::with_capacity(message.attachments.len());
        for new_attachment in &message.attachments {
            let attachment = Attachment {
                id: Uuid::new_v4().to_string(),
                message_id: id.clone(),
                filename: new_attachment.filename.clone(),
                original_name: new_attachment.original_name.clone(),
                mimetype: new_attachment.mimetype.clone(),
                size: new_attachment.size,
                path: new_attachment.stored_path().to_string(),
            };

            sqlx::query(
                "INSERT INTO attachments (id, message_id, filename, original_name, mimetype, size, path) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&attachment.id)
            .bind(&attachment.message_id)
            .bind(&attachment.filename)
            .bind(&attachment.original_name)
            .bind(&attachment.mimetype)
            .bind(attachment.size)
            .bind(&attachment.path)
            .execute(&mut *tx)
            .await?;

            attachments.push(attachment);
        }

        tx.commit().await?;

        // Not part of the transaction: a failure here leaves the message stored
        if let Err(e) = self.touch_conversation(conversation_id).await {
            warn!(
                conversation_id = %conversation_id,
                message_id = %id,
                error = %e,
                "Message stored but conversation timestamp was not updated"
            );
            return Err(e);
        }

        debug!(
            "Added message {} to conversation {} ({} attachments)",
            id,
            conversation_id,
            attachments.len()
        );
        Ok(Message {
            id,
            conversation_id: conversation_id.to_string(),
            role: message.role,
            content: message.content,
            thinking,
            thinking_duration,
            created_at,
            attachments,
        })
    }

    async fn delete_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ? AND conversation_id = ?")
            .bind(message_id)
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Message {} not found in conversation {}",
                message_id, conversation_id
            )));
        }

        debug!(conversation_id = %conversation_id, message_id = %message_id, "Deleted message");
        Ok(())
    }

    async fn delete_message_and_subsequent(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<(), AppError> {
        // TODO: also remove messages created after `message_id` once the
        // intended semantics are confirmed; today this is a single delete.
        self.delete_message(conversation_id, message_id).await
    }

    async fn shutdown(&self) {
        if self.pool.is_closed() {
            return;
        }
        self.pool.close().await;
        info!("Database connections closed");
    }
}
