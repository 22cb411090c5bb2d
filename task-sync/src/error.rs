use errors::StoreError;
use thiserror::Error;

pub type TaskSyncResult<T> = Result<T, TaskSyncError>;

#[derive(Debug, Error)]
pub enum TaskSyncError {
    #[error("Student not found: {id}")]
    StudentNotFound { id: String },

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    #[error("Invalid status transition: {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Timed out waiting for the sync lock of student {student_id}")]
    LockTimeout { student_id: String },

    #[error("Store failure: {0}")]
    Store(#[from] StoreError)
}

impl TaskSyncError {
    pub fn student_not_found(id: impl std::fmt::Display) -> Self {
        Self::StudentNotFound { id: id.to_string() }
    }

    pub fn task_not_found(id: impl std::fmt::Display) -> Self {
        Self::TaskNotFound { id: id.to_string() }
    }

    /// Store failures may be retried blindly; sync is idempotent, so a
    /// partially applied run is completed by the next one.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}
