//! Task lifecycle: the submission/review flow that shares the task store
//! with the sync engine. These are the only mutations existing tasks ever
//! see; reconciliation itself never touches them.

use crate::error::{TaskSyncError, TaskSyncResult};
use portal_core::traits::{StudentDirectory, TaskStore};
use portal_core::types::{StudentId, Task, TaskId, TaskStatus};
use std::sync::Arc;
use tracing::info;

pub struct TaskLifecycleService {
    students: Arc<dyn StudentDirectory>,
    tasks: Arc<dyn TaskStore>
}

impl TaskLifecycleService {
    pub fn new(students: Arc<dyn StudentDirectory>, tasks: Arc<dyn TaskStore>) -> Self {
        Self { students, tasks }
    }

    async fn load_task(&self, task_id: TaskId) -> TaskSyncResult<Task> {
        self.tasks
            .get_task(task_id)
            .await?
            .ok_or_else(|| TaskSyncError::task_not_found(task_id))
    }

    fn check_transition(task: &Task, to: TaskStatus) -> TaskSyncResult<()> {
        let allowed = matches!(
            (task.status, to),
            (TaskStatus::Todo | TaskStatus::ChangesRequested, TaskStatus::Review)
                | (TaskStatus::Review, TaskStatus::Done)
                | (TaskStatus::Review, TaskStatus::ChangesRequested)
        );
        if allowed {
            Ok(())
        } else {
            Err(TaskSyncError::InvalidTransition {
                from: task.status.to_string(),
                to: to.to_string()
            })
        }
    }

    /// Attach a submission payload and move the task into review.
    pub async fn submit(
        &self,
        task_id: TaskId,
        submission: serde_json::Value
    ) -> TaskSyncResult<Task> {
        let task = self.load_task(task_id).await?;
        Self::check_transition(&task, TaskStatus::Review)?;

        self.tasks.set_submission(task_id, submission).await?;
        self.tasks.update_status(task_id, TaskStatus::Review).await?;

        info!(task_id = %task_id, "Task submitted for review");
        self.load_task(task_id).await
    }

    /// Approve a reviewed task and pay its XP reward into the student's
    /// total. The only place XP is ever granted.
    pub async fn approve(&self, task_id: TaskId) -> TaskSyncResult<Task> {
        let task = self.load_task(task_id).await?;
        Self::check_transition(&task, TaskStatus::Done)?;

        self.tasks.update_status(task_id, TaskStatus::Done).await?;
        self.students.add_xp(task.student_id, task.xp_reward).await?;

        info!(
            task_id = %task_id,
            student_id = %task.student_id,
            xp = task.xp_reward,
            "Task approved"
        );
        self.load_task(task_id).await
    }

    /// Send a reviewed task back to the student.
    pub async fn request_changes(&self, task_id: TaskId) -> TaskSyncResult<Task> {
        let task = self.load_task(task_id).await?;
        Self::check_transition(&task, TaskStatus::ChangesRequested)?;

        self.tasks
            .update_status(task_id, TaskStatus::ChangesRequested)
            .await?;

        info!(task_id = %task_id, "Changes requested");
        self.load_task(task_id).await
    }

    /// Everything currently waiting for a curator.
    pub async fn review_queue(&self) -> TaskSyncResult<Vec<Task>> {
        Ok(self.tasks.find_by_status(TaskStatus::Review).await?)
    }

    pub async fn tasks_for_student(&self, student_id: StudentId) -> TaskSyncResult<Vec<Task>> {
        Ok(self.tasks.find_for_student(student_id).await?)
    }
}
