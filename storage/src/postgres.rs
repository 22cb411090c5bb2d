//! PostgreSQL backend. Explicit bind-parameter queries, schema created by
//! [`PostgresBackend::initialize_schema`].
//!
//! The `tasks` table carries `UNIQUE (student_id, stage, title)` and inserts
//! go through `ON CONFLICT DO NOTHING`, so two processes reconciling the
//! same student at once cannot duplicate a task even without the engine's
//! in-process lock.

use async_trait::async_trait;
use errors::StoreError;
use portal_core::traits::{
    ProgramCatalog, StudentDirectory, TaskStore, TemplateFilter, TemplateStore
};
use portal_core::types::{
    CountryId, ProgramId, Student, StudentId, SubmissionKind, Task, TaskId, TaskKey, TaskStatus,
    TaskTemplate, TemplateId, TemplateScope, UniversityId
};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

pub struct PostgresBackend {
    pool: Pool<Postgres>
}

impl PostgresBackend {
    pub async fn new(connection_url: &str) -> Result<Self, StoreError> {
        let pool = Pool::connect(connection_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS students (
                id UUID PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                country_id TEXT,
                xp_total INTEGER NOT NULL DEFAULT 0
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS student_countries (
                student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                country_id TEXT NOT NULL,
                PRIMARY KEY (student_id, country_id)
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS student_programs (
                student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                program_id TEXT NOT NULL,
                PRIMARY KEY (student_id, program_id)
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS programs (
                id TEXT PRIMARY KEY,
                university_id TEXT NOT NULL
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS task_templates (
                id BIGSERIAL PRIMARY KEY,
                country_id TEXT,
                university_id TEXT,
                program_id TEXT,
                stage TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                xp_reward INTEGER NOT NULL DEFAULT 0,
                submission_kind TEXT NOT NULL DEFAULT 'file_upload'
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                id UUID PRIMARY KEY,
                student_id UUID NOT NULL REFERENCES students(id) ON DELETE CASCADE,
                stage TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                xp_reward INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'todo',
                submission_kind TEXT NOT NULL DEFAULT 'file_upload',
                submission JSONB,
                UNIQUE (student_id, stage, title)
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_student_id ON tasks(student_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn create_student(&self, student: &Student) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO students (id, user_id, full_name, country_id, xp_total)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE
             SET user_id = $2, full_name = $3, country_id = $4, xp_total = $5"
        )
        .bind(student.id.as_uuid())
        .bind(&student.user_id)
        .bind(&student.full_name)
        .bind(student.country_id.as_ref().map(|c| c.as_str().to_string()))
        .bind(i32::try_from(student.xp_total).unwrap_or(i32::MAX))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM student_countries WHERE student_id = $1")
            .bind(student.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        for country in &student.country_ids {
            sqlx::query(
                "INSERT INTO student_countries (student_id, country_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING"
            )
            .bind(student.id.as_uuid())
            .bind(country.as_str())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM student_programs WHERE student_id = $1")
            .bind(student.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        for program in &student.selected_program_ids {
            sqlx::query(
                "INSERT INTO student_programs (student_id, program_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING"
            )
            .bind(student.id.as_uuid())
            .bind(program.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_program(
        &self,
        program_id: &ProgramId,
        university_id: &UniversityId
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO programs (id, university_id) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET university_id = $2"
        )
        .bind(program_id.as_str())
        .bind(university_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_template(
        &self,
        scope: &TemplateScope,
        stage: &str,
        title: &str,
        description: &str,
        xp_reward: u32,
        submission_kind: SubmissionKind
    ) -> Result<TemplateId, StoreError> {
        let (country, university, program) = match scope {
            TemplateScope::Country(c) => (Some(c.as_str()), None, None),
            TemplateScope::University(u) => (None, Some(u.as_str()), None),
            TemplateScope::Program(p) => (None, None, Some(p.as_str()))
        };

        let row = sqlx::query(
            "INSERT INTO task_templates
                 (country_id, university_id, program_id, stage, title, description, xp_reward, submission_kind)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id"
        )
        .bind(country)
        .bind(university)
        .bind(program)
        .bind(stage)
        .bind(title)
        .bind(description)
        .bind(i32::try_from(xp_reward).unwrap_or(i32::MAX))
        .bind(submission_kind.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(TemplateId::new(row.get::<i64, _>("id")))
    }

    async fn load_student_associations(
        &self,
        student_id: Uuid
    ) -> Result<(Vec<CountryId>, Vec<ProgramId>), StoreError> {
        let country_rows = sqlx::query(
            "SELECT country_id FROM student_countries WHERE student_id = $1 ORDER BY country_id"
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        let countries = country_rows
            .iter()
            .filter_map(|r| CountryId::new(r.get::<String, _>("country_id")))
            .collect();

        let program_rows = sqlx::query(
            "SELECT program_id FROM student_programs WHERE student_id = $1 ORDER BY program_id"
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        let programs = program_rows
            .iter()
            .filter_map(|r| ProgramId::new(r.get::<String, _>("program_id")))
            .collect();

        Ok((countries, programs))
    }

    async fn student_from_row(&self, row: &sqlx::postgres::PgRow) -> Result<Student, StoreError> {
        let id: Uuid = row.get("id");
        let (country_ids, selected_program_ids) = self.load_student_associations(id).await?;
        Ok(Student {
            id: StudentId::from_uuid(id),
            user_id: row.get("user_id"),
            full_name: row.get("full_name"),
            country_id: row
                .get::<Option<String>, _>("country_id")
                .and_then(CountryId::new),
            country_ids,
            selected_program_ids,
            xp_total: u32::try_from(row.get::<i32, _>("xp_total")).unwrap_or(0)
        })
    }
}

fn scope_from_columns(
    country: Option<String>,
    university: Option<String>,
    program: Option<String>
) -> Option<TemplateScope> {
    // Most specific populated column wins; the filter queries already
    // enforce the level exclusions.
    if let Some(p) = program.and_then(ProgramId::new) {
        return Some(TemplateScope::Program(p));
    }
    if let Some(u) = university.and_then(UniversityId::new) {
        return Some(TemplateScope::University(u));
    }
    country.and_then(CountryId::new).map(TemplateScope::Country)
}

fn template_from_row(row: &sqlx::postgres::PgRow) -> TaskTemplate {
    TaskTemplate {
        id: TemplateId::new(row.get::<i64, _>("id")),
        scope: scope_from_columns(
            row.get("country_id"),
            row.get("university_id"),
            row.get("program_id")
        ),
        stage: row.get("stage"),
        title: row.get("title"),
        description: row.get("description"),
        xp_reward: u32::try_from(row.get::<i32, _>("xp_reward")).unwrap_or(0),
        submission_kind: row
            .get::<String, _>("submission_kind")
            .parse()
            .unwrap_or(SubmissionKind::FileUpload)
    }
}

fn task_from_row(row: &sqlx::postgres::PgRow) -> Task {
    Task {
        id: TaskId::from_uuid(row.get("id")),
        student_id: StudentId::from_uuid(row.get("student_id")),
        stage: row.get("stage"),
        title: row.get("title"),
        description: row.get("description"),
        xp_reward: u32::try_from(row.get::<i32, _>("xp_reward")).unwrap_or(0),
        status: row
            .get::<String, _>("status")
            .parse()
            .unwrap_or(TaskStatus::Todo),
        submission_kind: row
            .get::<String, _>("submission_kind")
            .parse()
            .unwrap_or(SubmissionKind::FileUpload),
        submission: row.get("submission")
    }
}

const TEMPLATE_COLUMNS: &str =
    "id, country_id, university_id, program_id, stage, title, description, xp_reward, submission_kind";

const TASK_COLUMNS: &str =
    "id, student_id, stage, title, description, xp_reward, status, submission_kind, submission";

#[async_trait]
impl StudentDirectory for PostgresBackend {
    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, full_name, country_id, xp_total
             FROM students WHERE id = $1"
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.student_from_row(&row).await?)),
            None => Ok(None)
        }
    }

    async fn get_student_by_user_id(&self, user_id: &str) -> Result<Option<Student>, StoreError> {
        let row = sqlx::query(
            "SELECT id, user_id, full_name, country_id, xp_total
             FROM students WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.student_from_row(&row).await?)),
            None => Ok(None)
        }
    }

    async fn add_xp(&self, id: StudentId, amount: u32) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE students SET xp_total = xp_total + $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(i32::try_from(amount).unwrap_or(i32::MAX))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("student", id));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgramCatalog for PostgresBackend {
    async fn university_ids_for_programs(
        &self,
        program_ids: &[ProgramId]
    ) -> Result<Vec<UniversityId>, StoreError> {
        if program_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = program_ids.iter().map(|p| p.as_str().to_string()).collect();
        let rows = sqlx::query(
            "SELECT DISTINCT university_id FROM programs WHERE id = ANY($1)
             ORDER BY university_id"
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|r| UniversityId::new(r.get::<String, _>("university_id")))
            .collect())
    }
}

#[async_trait]
impl TemplateStore for PostgresBackend {
    async fn find_templates(
        &self,
        filter: &TemplateFilter
    ) -> Result<Vec<TaskTemplate>, StoreError> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }

        let rows = match filter {
            TemplateFilter::CountryGeneric { country_ids } => {
                let ids: Vec<String> =
                    country_ids.iter().map(|c| c.as_str().to_string()).collect();
                sqlx::query(&format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM task_templates
                     WHERE country_id = ANY($1)
                       AND university_id IS NULL AND program_id IS NULL"
                ))
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
            }
            TemplateFilter::UniversityGeneric { university_ids } => {
                let ids: Vec<String> = university_ids
                    .iter()
                    .map(|u| u.as_str().to_string())
                    .collect();
                sqlx::query(&format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM task_templates
                     WHERE university_id = ANY($1) AND program_id IS NULL"
                ))
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
            }
            TemplateFilter::ProgramSpecific { program_ids } => {
                let ids: Vec<String> =
                    program_ids.iter().map(|p| p.as_str().to_string()).collect();
                sqlx::query(&format!(
                    "SELECT {TEMPLATE_COLUMNS} FROM task_templates
                     WHERE program_id = ANY($1)"
                ))
                .bind(&ids)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.iter().map(template_from_row).collect())
    }
}

#[async_trait]
impl TaskStore for PostgresBackend {
    async fn find_existing_keys(&self, student_id: StudentId) -> Result<Vec<TaskKey>, StoreError> {
        let rows = sqlx::query("SELECT stage, title FROM tasks WHERE student_id = $1")
            .bind(student_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|r| TaskKey::new(r.get::<String, _>("stage"), r.get::<String, _>("title")))
            .collect())
    }

    async fn insert_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for task in tasks {
            sqlx::query(
                "INSERT INTO tasks
                     (id, student_id, stage, title, description, xp_reward, status, submission_kind, submission)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (student_id, stage, title) DO NOTHING"
            )
            .bind(task.id.as_uuid())
            .bind(task.student_id.as_uuid())
            .bind(&task.stage)
            .bind(&task.title)
            .bind(&task.description)
            .bind(i32::try_from(task.xp_reward).unwrap_or(i32::MAX))
            .bind(task.status.to_string())
            .bind(task.submission_kind.to_string())
            .bind(&task.submission)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_for_student(&self, student_id: StudentId) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE student_id = $1 ORDER BY stage, title"
        ))
        .bind(student_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(task_from_row).collect())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(task_from_row))
    }

    async fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE status = $1 ORDER BY student_id, stage, title"
        ))
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(task_from_row).collect())
    }

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE tasks SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("task", id));
        }
        Ok(())
    }

    async fn set_submission(
        &self,
        id: TaskId,
        submission: serde_json::Value
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE tasks SET submission = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(submission)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("task", id));
        }
        Ok(())
    }
}
