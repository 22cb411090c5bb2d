//! In-memory backend, used by the integration tests and embeddable wherever
//! a database is overkill. Implements every `portal_core` store trait on a
//! handful of `RwLock`-guarded maps.

use async_trait::async_trait;
use errors::StoreError;
use portal_core::traits::{
    ProgramCatalog, StudentDirectory, TaskStore, TemplateFilter, TemplateStore
};
use portal_core::types::{
    ProgramId, Student, StudentId, Task, TaskId, TaskKey, TaskStatus, TaskTemplate, TemplateId,
    TemplateScope, UniversityId
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryBackend {
    students: RwLock<HashMap<StudentId, Student>>,
    program_universities: RwLock<HashMap<ProgramId, UniversityId>>,
    templates: RwLock<Vec<TaskTemplate>>,
    tasks: RwLock<HashMap<TaskId, Task>>,
    next_template_id: AtomicI64
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_student(&self, student: Student) {
        self.students.write().await.insert(student.id, student);
    }

    /// Register a catalog program and the university it belongs to.
    pub async fn insert_program(&self, program_id: ProgramId, university_id: UniversityId) {
        self.program_universities
            .write()
            .await
            .insert(program_id, university_id);
    }

    /// Insert a template definition, assigning the next sequential id.
    pub async fn insert_template(&self, template: TaskTemplate) -> TemplateId {
        let id = TemplateId::new(self.next_template_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut templates = self.templates.write().await;
        templates.push(TaskTemplate { id, ..template });
        id
    }

    /// Insert a template keeping the id it already carries. Lets tests pin
    /// ids when the tie-break order matters.
    pub async fn insert_template_with_id(&self, template: TaskTemplate) -> TemplateId {
        let id = template.id;
        self.templates.write().await.push(template);
        id
    }

    fn matches(filter: &TemplateFilter, template: &TaskTemplate) -> bool {
        match (filter, &template.scope) {
            (TemplateFilter::CountryGeneric { country_ids }, Some(TemplateScope::Country(c))) => {
                country_ids.contains(c)
            }
            (
                TemplateFilter::UniversityGeneric { university_ids },
                Some(TemplateScope::University(u))
            ) => university_ids.contains(u),
            (TemplateFilter::ProgramSpecific { program_ids }, Some(TemplateScope::Program(p))) => {
                program_ids.contains(p)
            }
            _ => false
        }
    }
}

#[async_trait]
impl StudentDirectory for MemoryBackend {
    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        Ok(self.students.read().await.get(&id).cloned())
    }

    async fn get_student_by_user_id(&self, user_id: &str) -> Result<Option<Student>, StoreError> {
        Ok(self
            .students
            .read()
            .await
            .values()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn add_xp(&self, id: StudentId, amount: u32) -> Result<(), StoreError> {
        let mut students = self.students.write().await;
        let student = students
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("student", id))?;
        student.xp_total += amount;
        Ok(())
    }
}

#[async_trait]
impl ProgramCatalog for MemoryBackend {
    async fn university_ids_for_programs(
        &self,
        program_ids: &[ProgramId]
    ) -> Result<Vec<UniversityId>, StoreError> {
        let programs = self.program_universities.read().await;
        let mut out: Vec<UniversityId> = Vec::new();
        for pid in program_ids {
            if let Some(uid) = programs.get(pid) {
                if !out.contains(uid) {
                    out.push(uid.clone());
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl TemplateStore for MemoryBackend {
    async fn find_templates(
        &self,
        filter: &TemplateFilter
    ) -> Result<Vec<TaskTemplate>, StoreError> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .templates
            .read()
            .await
            .iter()
            .filter(|t| Self::matches(filter, t))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TaskStore for MemoryBackend {
    async fn find_existing_keys(&self, student_id: StudentId) -> Result<Vec<TaskKey>, StoreError> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.student_id == student_id)
            .map(Task::key)
            .collect())
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        // Single write lock for the whole batch, so two concurrent inserts
        // cannot interleave. Duplicate (student, stage, title) entries are
        // skipped, matching the Postgres unique-constraint backstop.
        let mut map = self.tasks.write().await;
        for task in tasks {
            let exists = map
                .values()
                .any(|t| t.student_id == task.student_id && t.key() == task.key());
            if !exists {
                map.insert(task.id, task.clone());
            }
        }
        Ok(())
    }

    async fn find_for_student(&self, student_id: StudentId) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.student_id == student_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| (a.stage.clone(), a.title.clone()).cmp(&(b.stage.clone(), b.title.clone())));
        Ok(tasks)
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("task", id))?;
        task.status = status;
        Ok(())
    }

    async fn set_submission(
        &self,
        id: TaskId,
        submission: serde_json::Value
    ) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("task", id))?;
        task.submission = Some(submission);
        Ok(())
    }
}
