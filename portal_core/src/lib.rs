//! Shared domain types and store traits for the study-abroad portal.

pub mod traits;
pub mod types;

pub use traits::{ProgramCatalog, StudentDirectory, TaskStore, TemplateFilter, TemplateStore};
pub use types::{
    CountryId, ProgramId, Student, StudentId, SubmissionKind, Task, TaskId, TaskKey, TaskStatus,
    TaskTemplate, TemplateId, TemplateScope, UniversityId
};
