//! Integration tests for the SQLite conversation store
//!
//! Each test opens a fresh database file in a temporary directory.

use conversation_store::chat::{
    ChatDb, ConversationPatch, ConversationStore, NewAttachment, NewConversation, NewMessage,
    DEFAULT_MODEL, DEFAULT_TITLE,
};
use conversation_store::config::DatabaseConfig;
use conversation_store::error::AppError;
use std::time::Duration;
use tempfile::TempDir;

async fn open_db() -> (ChatDb, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("chat.db");
    let db = ChatDb::new(db_path.to_str().unwrap())
        .await
        .expect("Failed to create test database");
    (db, temp_dir)
}

/// Let the millisecond clock move on so timestamps differ
async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

fn png(name: &str) -> NewAttachment {
    NewAttachment {
        filename: format!("{}-stored.png", name),
        original_name: format!("{}.png", name),
        mimetype: "image/png".to_string(),
        size: 2048,
        path: Some(format!("uploads/{}-stored.png", name)),
        url: None,
    }
}

#[tokio::test]
async fn test_create_conversation_applies_defaults() {
    let (db, _dir) = open_db().await;

    let conversation = db
        .create_conversation(NewConversation::default())
        .await
        .unwrap();

    assert_eq!(conversation.title, DEFAULT_TITLE);
    assert_eq!(conversation.model, DEFAULT_MODEL);
    assert!(conversation.messages.is_empty());
    assert_eq!(conversation.created_at, conversation.updated_at);

    let stored = db.get_conversation(&conversation.id).await.unwrap().unwrap();
    assert_eq!(stored, conversation);
}

#[tokio::test]
async fn test_create_conversation_keeps_title_and_model() {
    let (db, _dir) = open_db().await;

    let conversation = db
        .create_conversation(NewConversation {
            title: Some("Rust questions".to_string()),
            model: Some("llama3.1:8b".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(conversation.title, "Rust questions");
    assert_eq!(conversation.model, "llama3.1:8b");
}

#[tokio::test]
async fn test_list_conversations_most_recent_first() {
    let (db, _dir) = open_db().await;

    let first = db.create_conversation(NewConversation::titled("first")).await.unwrap();
    tick().await;
    let second = db.create_conversation(NewConversation::titled("second")).await.unwrap();
    tick().await;
    let third = db.create_conversation(NewConversation::titled("third")).await.unwrap();
    tick().await;

    // Activity on the oldest conversation moves it to the front
    db.add_message(&first.id, NewMessage::user("bump")).await.unwrap();

    let listed = db.list_conversations().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), third.id.as_str(), second.id.as_str()]);

    for pair in listed.windows(2) {
        assert!(pair[0].updated_at > pair[1].updated_at);
    }
}

#[tokio::test]
async fn test_get_missing_conversation_returns_none() {
    let (db, _dir) = open_db().await;
    assert!(db.get_conversation("does-not-exist").await.unwrap().is_none());
}

#[tokio::test]
async fn test_add_message_orders_and_touches_parent() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();
    let before = conversation.updated_at;
    tick().await;

    let question = db
        .add_message(&conversation.id, NewMessage::user("What is ownership?"))
        .await
        .unwrap();
    let answer = db
        .add_message(
            &conversation.id,
            NewMessage::assistant("A set of rules.").with_thinking("Recall the book", 1.25),
        )
        .await
        .unwrap();

    let stored = db.get_conversation(&conversation.id).await.unwrap().unwrap();
    assert!(stored.updated_at >= before);
    assert!(stored.updated_at > before);

    let ids: Vec<&str> = stored.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec![question.id.as_str(), answer.id.as_str()]);
    assert!(stored.messages[0].created_at <= stored.messages[1].created_at);

    let answer = &stored.messages[1];
    assert_eq!(answer.role, "assistant");
    assert_eq!(answer.thinking.as_deref(), Some("Recall the book"));
    assert_eq!(answer.thinking_duration, Some(1.25));
    assert!(stored.messages[0].thinking.is_none());
    assert!(stored.messages[0].thinking_duration.is_none());
}

#[tokio::test]
async fn test_add_message_stores_free_form_role() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();

    let message = db
        .add_message(&conversation.id, NewMessage::new("tool", "{\"ok\":true}"))
        .await
        .unwrap();
    assert_eq!(message.role, "tool");
}

#[tokio::test]
async fn test_empty_thinking_is_stored_as_null() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();

    let message = db
        .add_message(&conversation.id, NewMessage::assistant("ok").with_thinking("", 0.0))
        .await
        .unwrap();
    assert!(message.thinking.is_none());
    assert!(message.thinking_duration.is_none());

    let stored = db.get_conversation(&conversation.id).await.unwrap().unwrap();
    assert!(stored.messages[0].thinking.is_none());
    assert!(stored.messages[0].thinking_duration.is_none());
}

#[tokio::test]
async fn test_attachments_round_trip() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();

    let remote = NewAttachment {
        filename: "report.pdf".to_string(),
        original_name: "Q3 report.pdf".to_string(),
        mimetype: "application/pdf".to_string(),
        size: 734_003,
        path: None,
        url: Some("https://files.example.com/report.pdf".to_string()),
    };
    let message = NewMessage::user("See attached")
        .with_attachment(png("diagram"))
        .with_attachment(remote);

    let created = db.add_message(&conversation.id, message).await.unwrap();
    assert_eq!(created.attachments.len(), 2);
    assert!(created.attachments.iter().all(|a| a.message_id == created.id));

    let stored = db.get_conversation(&conversation.id).await.unwrap().unwrap();
    let attachments = &stored.messages[0].attachments;
    assert_eq!(attachments.len(), 2);

    let diagram = attachments
        .iter()
        .find(|a| a.original_name == "diagram.png")
        .unwrap();
    assert_eq!(diagram.filename, "diagram-stored.png");
    assert_eq!(diagram.mimetype, "image/png");
    assert_eq!(diagram.size, 2048);
    assert_eq!(diagram.path, "uploads/diagram-stored.png");

    let report = attachments
        .iter()
        .find(|a| a.original_name == "Q3 report.pdf")
        .unwrap();
    assert_eq!(report.size, 734_003);
    assert_eq!(report.path, "https://files.example.com/report.pdf");
}

#[tokio::test]
async fn test_attachment_without_location_gets_empty_path() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();

    let mut attachment = png("blank");
    attachment.path = None;
    let created = db
        .add_message(&conversation.id, NewMessage::user("x").with_attachment(attachment))
        .await
        .unwrap();
    assert_eq!(created.attachments[0].path, "");
}

#[tokio::test]
async fn test_attachments_stay_with_their_message() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();

    db.add_message(&conversation.id, NewMessage::user("one").with_attachment(png("a")))
        .await
        .unwrap();
    db.add_message(&conversation.id, NewMessage::assistant("two"))
        .await
        .unwrap();
    db.add_message(&conversation.id, NewMessage::user("three").with_attachment(png("b")))
        .await
        .unwrap();

    let stored = db.get_conversation(&conversation.id).await.unwrap().unwrap();
    assert_eq!(stored.messages[0].attachments[0].original_name, "a.png");
    assert!(stored.messages[1].attachments.is_empty());
    assert_eq!(stored.messages[2].attachments[0].original_name, "b.png");
}

#[tokio::test]
async fn test_add_message_to_missing_conversation_is_not_found() {
    let (db, _dir) = open_db().await;
    let result = db
        .add_message("missing", NewMessage::user("hello").with_attachment(png("x")))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_update_title_only() {
    let (db, _dir) = open_db().await;
    let conversation = db
        .create_conversation(NewConversation {
            title: Some("Draft".to_string()),
            model: Some("qwen3:14b".to_string()),
        })
        .await
        .unwrap();
    db.add_message(&conversation.id, NewMessage::user("hi").with_attachment(png("c")))
        .await
        .unwrap();
    let before = db.get_conversation(&conversation.id).await.unwrap().unwrap();
    tick().await;

    let updated = db
        .update_conversation(
            &conversation.id,
            ConversationPatch {
                title: Some("X".to_string()),
                model: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "X");
    assert_eq!(updated.model, "qwen3:14b");
    assert!(updated.updated_at > before.updated_at);
    assert_eq!(updated.created_at, before.created_at);
    assert_eq!(updated.messages.len(), 1);
    assert_eq!(updated.messages[0].attachments.len(), 1);
}

#[tokio::test]
async fn test_update_model_only() {
    let (db, _dir) = open_db().await;
    let conversation = db
        .create_conversation(NewConversation::titled("Keep me"))
        .await
        .unwrap();

    let updated = db
        .update_conversation(
            &conversation.id,
            ConversationPatch {
                title: None,
                model: Some("mistral".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Keep me");
    assert_eq!(updated.model, "mistral");
}

#[tokio::test]
async fn test_empty_patch_still_refreshes_timestamp() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();
    tick().await;

    let updated = db
        .update_conversation(&conversation.id, ConversationPatch::default())
        .await
        .unwrap();
    assert_eq!(updated.title, conversation.title);
    assert_eq!(updated.model, conversation.model);
    assert!(updated.updated_at > conversation.updated_at);
}

#[tokio::test]
async fn test_update_missing_conversation_is_not_found() {
    let (db, _dir) = open_db().await;
    let result = db
        .update_conversation("missing", ConversationPatch::default())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_conversation_twice_succeeds() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();

    db.delete_conversation(&conversation.id).await.unwrap();
    assert!(db.get_conversation(&conversation.id).await.unwrap().is_none());
    db.delete_conversation(&conversation.id).await.unwrap();
    db.delete_conversation("never-existed").await.unwrap();
}

#[tokio::test]
async fn test_delete_conversation_cascades() {
    let (db, _dir) = open_db().await;
    let doomed = db.create_conversation(NewConversation::titled("doomed")).await.unwrap();
    let kept = db.create_conversation(NewConversation::titled("kept")).await.unwrap();

    let message = db
        .add_message(&doomed.id, NewMessage::user("bye").with_attachment(png("d")))
        .await
        .unwrap();
    db.add_message(&kept.id, NewMessage::user("stay").with_attachment(png("k")))
        .await
        .unwrap();

    db.delete_conversation(&doomed.id).await.unwrap();

    // The message went with its conversation
    let result = db.delete_message(&doomed.id, &message.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let kept = db.get_conversation(&kept.id).await.unwrap().unwrap();
    assert_eq!(kept.messages.len(), 1);
    assert_eq!(kept.messages[0].attachments.len(), 1);

    let listed = db.list_conversations().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "kept");
}

#[tokio::test]
async fn test_delete_message() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();
    let first = db
        .add_message(&conversation.id, NewMessage::user("first").with_attachment(png("f")))
        .await
        .unwrap();
    let second = db
        .add_message(&conversation.id, NewMessage::assistant("second"))
        .await
        .unwrap();

    db.delete_message(&conversation.id, &first.id).await.unwrap();

    let stored = db.get_conversation(&conversation.id).await.unwrap().unwrap();
    assert_eq!(stored.messages.len(), 1);
    assert_eq!(stored.messages[0].id, second.id);

    // Not idempotent, unlike conversation deletion
    let again = db.delete_message(&conversation.id, &first.id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_message_scoped_to_conversation() {
    let (db, _dir) = open_db().await;
    let owner = db.create_conversation(NewConversation::titled("owner")).await.unwrap();
    let other = db.create_conversation(NewConversation::titled("other")).await.unwrap();
    let message = db
        .add_message(&owner.id, NewMessage::user("mine"))
        .await
        .unwrap();

    let result = db.delete_message(&other.id, &message.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let owner = db.get_conversation(&owner.id).await.unwrap().unwrap();
    assert_eq!(owner.messages.len(), 1);
}

#[tokio::test]
async fn test_delete_message_and_subsequent_deletes_single_message() {
    let (db, _dir) = open_db().await;
    let conversation = db.create_conversation(NewConversation::default()).await.unwrap();
    let first = db
        .add_message(&conversation.id, NewMessage::user("first"))
        .await
        .unwrap();
    let later = db
        .add_message(&conversation.id, NewMessage::assistant("later"))
        .await
        .unwrap();

    db.delete_message_and_subsequent(&conversation.id, &first.id)
        .await
        .unwrap();

    let stored = db.get_conversation(&conversation.id).await.unwrap().unwrap();
    assert_eq!(stored.messages.len(), 1);
    assert_eq!(stored.messages[0].id, later.id);

    let missing = db
        .delete_message_and_subsequent(&conversation.id, &first.id)
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("chat.db");
    let config = DatabaseConfig::for_path(db_path.to_str().unwrap());

    let db = ChatDb::connect(&config).await.unwrap();
    let conversation = db
        .create_conversation(NewConversation::titled("persistent"))
        .await
        .unwrap();
    db.add_message(&conversation.id, NewMessage::user("remember me"))
        .await
        .unwrap();
    db.shutdown().await;

    // Schema setup runs again against existing tables
    let reopened = ChatDb::connect(&config).await.unwrap();
    let stored = reopened
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "persistent");
    assert_eq!(stored.messages[0].content, "remember me");
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let (db, _dir) = open_db().await;
    db.ping().await.unwrap();
    db.shutdown().await;
    db.shutdown().await;
    assert!(matches!(db.ping().await, Err(AppError::Connection(_))));
}

#[tokio::test]
async fn test_connect_to_unusable_path_fails_with_connection_error() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();
    let db_path = blocker.join("chat.db");

    let result = ChatDb::new(db_path.to_str().unwrap()).await;
    assert!(matches!(result, Err(AppError::Connection(_))));
}
