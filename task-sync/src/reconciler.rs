//! Reconciliation: create exactly the tasks that are missing, touch nothing
//! that exists.

use errors::StoreError;
use portal_core::traits::TaskStore;
use portal_core::types::{StudentId, Task, TaskKey, TaskTemplate};
use std::collections::HashSet;
use tracing::{debug, info};

/// Diff the desired template set against the student's existing tasks and
/// bulk-insert instances for the missing keys. Existing tasks are read only
/// for their (stage, title) projection and never written, so re-running
/// after a partial failure is always safe.
///
/// Returns the number of tasks created. `dry_run` computes the diff without
/// writing.
pub async fn reconcile(
    store: &dyn TaskStore,
    student_id: StudentId,
    desired: &[TaskTemplate],
    dry_run: bool
) -> Result<usize, StoreError> {
    let existing: HashSet<TaskKey> = store
        .find_existing_keys(student_id)
        .await?
        .into_iter()
        .collect();
    debug!(student_id = %student_id, existing = existing.len(), "Loaded existing task keys");

    let to_create: Vec<Task> = desired
        .iter()
        .filter(|template| !existing.contains(&template.key()))
        .map(|template| Task::from_template(student_id, template))
        .collect();

    if to_create.is_empty() {
        debug!(student_id = %student_id, "Nothing to reconcile; no write issued");
        return Ok(0);
    }

    if dry_run {
        info!(
            student_id = %student_id,
            would_create = to_create.len(),
            "Dry run; skipping task insert"
        );
        return Ok(to_create.len());
    }

    let created = to_create.len();
    store.insert_tasks(&to_create).await?;
    info!(student_id = %student_id, created, "Created missing tasks");
    Ok(created)
}
