//! Shared error type for the portal's persistence layer.
//!
//! Every store trait in `portal_core` returns [`StoreError`]; backends map
//! their driver-level failures into it and callers propagate it unmodified
//! (retries, if wanted, belong to the caller).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {entity}:{id}")]
    NotFound { entity: String, id: String },

    #[error("Unique key conflict on {entity}: {key}")]
    Conflict { entity: String, key: String }
}

impl StoreError {
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string()
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Transient failures a caller may retry; reconciliation is idempotent
    /// so a blind retry is always safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}
