//! Store traits the sync engine and lifecycle flows program against.
//!
//! Every backend (in-memory, Postgres) implements these; the engine only
//! ever sees `Arc<dyn …>`. All methods return [`errors::StoreError`] on
//! failure, which the caller propagates unmodified.

use async_trait::async_trait;
use errors::StoreError;
use serde::{Deserialize, Serialize};

use crate::types::{
    CountryId, ProgramId, Student, StudentId, Task, TaskId, TaskKey, TaskStatus, TaskTemplate,
    UniversityId
};

/// One of the three fixed query shapes the template store answers.
///
/// The level exclusions are part of the filter's meaning, not the caller's
/// job: a country-generic query must not return a template that also carries
/// a university or program scope, and a university-generic one must not
/// return program-scoped templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "camelCase")]
pub enum TemplateFilter {
    #[serde(rename_all = "camelCase")]
    CountryGeneric { country_ids: Vec<CountryId> },
    #[serde(rename_all = "camelCase")]
    UniversityGeneric { university_ids: Vec<UniversityId> },
    #[serde(rename_all = "camelCase")]
    ProgramSpecific { program_ids: Vec<ProgramId> }
}

impl TemplateFilter {
    /// An empty identifier set matches nothing by definition.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::CountryGeneric { country_ids } => country_ids.is_empty(),
            Self::UniversityGeneric { university_ids } => university_ids.is_empty(),
            Self::ProgramSpecific { program_ids } => program_ids.is_empty()
        }
    }
}

/// Read access to student profiles, plus the XP payout used by task approval.
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StoreError>;

    async fn get_student_by_user_id(&self, user_id: &str) -> Result<Option<Student>, StoreError>;

    async fn add_xp(&self, id: StudentId, amount: u32) -> Result<(), StoreError>;
}

/// Program → university resolution for context expansion.
#[async_trait]
pub trait ProgramCatalog: Send + Sync {
    /// University ids for the given programs, duplicates collapsed. Unknown
    /// program ids are silently ignored.
    async fn university_ids_for_programs(
        &self,
        program_ids: &[ProgramId]
    ) -> Result<Vec<UniversityId>, StoreError>;
}

/// Read-only access to checklist-item definitions.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn find_templates(&self, filter: &TemplateFilter)
    -> Result<Vec<TaskTemplate>, StoreError>;
}

/// CRUD access to a student's instantiated tasks. The sync engine only ever
/// reads keys and inserts; the status/submission mutations belong to the
/// review flow.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// The (stage, title) projection of a student's existing tasks.
    async fn find_existing_keys(&self, student_id: StudentId) -> Result<Vec<TaskKey>, StoreError>;

    /// Bulk-insert newly reconciled tasks. A unique-key conflict on
    /// (student, stage, title) means a concurrent sync got there first and
    /// is not an error.
    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError>;

    async fn find_for_student(&self, student_id: StudentId) -> Result<Vec<Task>, StoreError>;

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError>;

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<(), StoreError>;

    async fn set_submission(
        &self,
        id: TaskId,
        submission: serde_json::Value
    ) -> Result<(), StoreError>;
}
