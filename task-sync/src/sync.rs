//! The sync orchestrator: one entry point sequencing context resolution,
//! template matching, specificity resolution, and reconciliation.

use crate::config::TaskSyncConfig;
use crate::context::resolve_context;
use crate::error::{TaskSyncError, TaskSyncResult};
use crate::matcher::match_templates;
use crate::reconciler::reconcile;
use crate::specificity::resolve_specificity;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use portal_core::traits::{ProgramCatalog, StudentDirectory, TaskStore, TemplateStore};
use portal_core::types::StudentId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// How a sync run ended. `NoApplicableContext` is a legitimate terminal
/// state for students with no countries and no programs, distinct from the
/// NotFound error so callers do not alarm on brand-new profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncOutcome {
    Completed,
    NoApplicableContext
}

/// Per-stage cardinalities of one sync run, for observability and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub student_id: StudentId,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: SyncOutcome,
    pub countries: usize,
    pub universities: usize,
    pub programs: usize,
    pub candidates_matched: usize,
    pub templates_deduplicated: usize,
    pub templates_skipped_invalid: usize,
    pub tasks_created: usize,
    pub dry_run: bool
}

impl SyncReport {
    fn new(student_id: StudentId, dry_run: bool) -> Self {
        Self {
            student_id,
            started_at: Utc::now(),
            completed_at: None,
            outcome: SyncOutcome::Completed,
            countries: 0,
            universities: 0,
            programs: 0,
            candidates_matched: 0,
            templates_deduplicated: 0,
            templates_skipped_invalid: 0,
            tasks_created: 0,
            dry_run
        }
    }

    fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }
}

/// The single entry point collaborators call. Safe to invoke repeatedly and
/// concurrently for the same student: runs for one student are serialized by
/// an in-process advisory lock, and the task store's unique key backs that
/// up across processes.
pub struct TaskSyncService {
    config: TaskSyncConfig,
    students: Arc<dyn StudentDirectory>,
    catalog: Arc<dyn ProgramCatalog>,
    templates: Arc<dyn TemplateStore>,
    tasks: Arc<dyn TaskStore>,
    sync_locks: DashMap<StudentId, Arc<Mutex<()>>>
}

impl TaskSyncService {
    pub fn new(
        config: TaskSyncConfig,
        students: Arc<dyn StudentDirectory>,
        catalog: Arc<dyn ProgramCatalog>,
        templates: Arc<dyn TemplateStore>,
        tasks: Arc<dyn TaskStore>
    ) -> Self {
        Self {
            config,
            students,
            catalog,
            templates,
            tasks,
            sync_locks: DashMap::new()
        }
    }

    fn student_lock(&self, student_id: StudentId) -> Arc<Mutex<()>> {
        self.sync_locks
            .entry(student_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Reconcile one student's tasks against the currently applicable
    /// templates. Idempotent; never updates or deletes an existing task.
    #[instrument(skip(self))]
    pub async fn sync(&self, student_id: StudentId) -> TaskSyncResult<SyncReport> {
        let lock = self.student_lock(student_id);
        let _guard = tokio::time::timeout(self.config.lock_timeout(), lock.lock())
            .await
            .map_err(|_| TaskSyncError::LockTimeout {
                student_id: student_id.to_string()
            })?;

        let mut report = SyncReport::new(student_id, self.config.dry_run);

        let student = self
            .students
            .get_student(student_id)
            .await?
            .ok_or_else(|| TaskSyncError::student_not_found(student_id))?;

        let context = resolve_context(&student, self.catalog.as_ref()).await?;
        report.countries = context.country_ids.len();
        report.universities = context.university_ids.len();
        report.programs = context.program_ids.len();

        if context.is_empty() {
            // Quiescent, not an error: the student simply has no scope yet.
            warn!(student_id = %student_id, "No applicable context; nothing to reconcile");
            report.outcome = SyncOutcome::NoApplicableContext;
            report.complete();
            return Ok(report);
        }

        let candidates = match_templates(self.templates.as_ref(), &context).await?;
        report.candidates_matched = candidates.len();

        let resolved = resolve_specificity(candidates);
        report.templates_deduplicated = resolved.templates.len();
        report.templates_skipped_invalid = resolved.skipped_invalid;

        report.tasks_created = reconcile(
            self.tasks.as_ref(),
            student_id,
            &resolved.templates,
            self.config.dry_run
        )
        .await?;

        report.complete();
        info!(
            student_id = %student_id,
            countries = report.countries,
            universities = report.universities,
            programs = report.programs,
            candidates = report.candidates_matched,
            deduplicated = report.templates_deduplicated,
            skipped_invalid = report.templates_skipped_invalid,
            created = report.tasks_created,
            dry_run = report.dry_run,
            "Task sync completed"
        );

        Ok(report)
    }

    /// Convenience entry point for callers that only hold the external user
    /// identity (registration, profile update handlers).
    pub async fn sync_by_user_id(&self, user_id: &str) -> TaskSyncResult<SyncReport> {
        let student = self
            .students
            .get_student_by_user_id(user_id)
            .await?
            .ok_or_else(|| TaskSyncError::student_not_found(user_id))?;
        self.sync(student.id).await
    }
}
