//! Health endpoint

use crate::api::RouterState;
use crate::chat::ConversationStore;
use crate::error::AppError;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" when the store answers
    pub status: String,
    /// Crate version
    pub version: String,
}

/// GET /api/health - Liveness plus a store round-trip
pub async fn health_check(
    State(store): State<RouterState>,
) -> Result<Json<HealthResponse>, AppError> {
    store.ping().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatDb;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_health_check_reports_healthy() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("health.db");
        let db = ChatDb::new(db_path.to_str().unwrap()).await.unwrap();
        let state: RouterState = Arc::new(db);

        let response = health_check(State(state)).await.unwrap().0;
        assert_eq!(response.status, "healthy");
        assert!(!response.version.is_empty());
    }

    #[tokio::test]
    async fn test_health_check_fails_after_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("health.db");
        let db = ChatDb::new(db_path.to_str().unwrap()).await.unwrap();
        let state: RouterState = Arc::new(db);
        state.shutdown().await;

        let result = health_check(State(state)).await;
        assert!(matches!(result, Err(AppError::Connection(_))));
    }
}
