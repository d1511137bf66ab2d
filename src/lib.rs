//! Conversation Store Library
//!
//! Persists chat conversations, their messages and file attachments in
//! SQLite. The HTTP server binary is in `src/main.rs`.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
