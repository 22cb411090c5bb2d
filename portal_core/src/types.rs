use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

macro_rules! slug_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Option<Self> {
                let id = id.into();
                if id.is_empty() || id.len() > 100 {
                    None
                } else {
                    Some(Self(id))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = anyhow::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s).ok_or_else(|| anyhow::anyhow!(concat!("Invalid ", stringify!($name))))
            }
        }
    };
}

slug_id!(
    /// Scope level 1. Catalog countries use short slugs ("at", "it").
    CountryId
);
slug_id!(
    /// Scope level 2. Reachable only transitively through a selected program.
    UniversityId
);
slug_id!(
    /// Scope level 3, the most specific template scope.
    ProgramId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct StudentId(Uuid);

impl StudentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for StudentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential template identifier, assigned by the template store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TemplateId(i64);

impl TemplateId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One applicant. Read-only input to the sync engine; owned by the
/// administrative/auth subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    /// External auth identity this profile belongs to.
    pub user_id: String,
    pub full_name: String,
    /// Legacy single-country field, still populated by old profiles.
    pub country_id: Option<CountryId>,
    /// Modern multi-country association; wins over `country_id` when non-empty.
    pub country_ids: Vec<CountryId>,
    pub selected_program_ids: Vec<ProgramId>,
    /// Paid out by task approval, never by sync.
    pub xp_total: u32
}

impl Student {
    /// The countries that drive template matching: the modern list when
    /// non-empty, otherwise the legacy single field.
    pub fn effective_country_ids(&self) -> Vec<CountryId> {
        if self.country_ids.is_empty() {
            self.country_id.iter().cloned().collect()
        } else {
            self.country_ids.clone()
        }
    }
}

/// The single scope a template is pinned to. A template is scoped to exactly
/// one level; specificity is total-ordered program > university > country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "id", rename_all = "camelCase")]
pub enum TemplateScope {
    Country(CountryId),
    University(UniversityId),
    Program(ProgramId)
}

impl TemplateScope {
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Country(_) => 1,
            Self::University(_) => 2,
            Self::Program(_) => 3
        }
    }

    pub fn level_name(&self) -> &'static str {
        match self {
            Self::Country(_) => "country",
            Self::University(_) => "university",
            Self::Program(_) => "program"
        }
    }
}

/// What kind of submission a task expects from the student.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubmissionKind {
    FileUpload,
    Text,
    Link,
    Confirmation
}

/// A reusable checklist-item definition.
///
/// `scope: None` means corrupt template data; the store can hand such a row
/// out, but the engine skips it rather than instantiating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub id: TemplateId,
    pub scope: Option<TemplateScope>,
    pub stage: String,
    pub title: String,
    pub description: String,
    pub xp_reward: u32,
    pub submission_kind: SubmissionKind
}

impl TaskTemplate {
    pub fn key(&self) -> TaskKey {
        TaskKey {
            stage: self.stage.clone(),
            title: self.title.clone()
        }
    }
}

/// The (stage, title) pair that identifies "the same logical task" across
/// scope levels, and correlates a task back to the template family that
/// produced it. Tasks carry no template reference; this key is the only link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskKey {
    pub stage: String,
    pub title: String
}

impl TaskKey {
    pub fn new(stage: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            title: title.into()
        }
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.stage, self.title)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    Review,
    ChangesRequested,
    Done
}

/// A concrete, per-student, mutable instance of a template. Created once by
/// reconciliation and mutated afterward only by the submission/review flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub student_id: StudentId,
    pub stage: String,
    pub title: String,
    pub description: String,
    pub xp_reward: u32,
    pub status: TaskStatus,
    pub submission_kind: SubmissionKind,
    pub submission: Option<serde_json::Value>
}

impl Task {
    /// Instantiate a template for a student: status starts at Todo, no
    /// submission yet.
    pub fn from_template(student_id: StudentId, template: &TaskTemplate) -> Self {
        Self {
            id: TaskId::new(),
            student_id,
            stage: template.stage.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
            xp_reward: template.xp_reward,
            status: TaskStatus::Todo,
            submission_kind: template.submission_kind,
            submission: None
        }
    }

    pub fn key(&self) -> TaskKey {
        TaskKey {
            stage: self.stage.clone(),
            title: self.title.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_ids_reject_empty_and_oversized() {
        assert!(CountryId::new("").is_none());
        assert!(CountryId::new("a".repeat(101)).is_none());
        assert_eq!(CountryId::new("at").unwrap().as_str(), "at");
    }

    #[test]
    fn specificity_orders_program_over_university_over_country() {
        let c = TemplateScope::Country(CountryId::new("at").unwrap());
        let u = TemplateScope::University(UniversityId::new("uni-vienna").unwrap());
        let p = TemplateScope::Program(ProgramId::new("p-cs-msc").unwrap());
        assert!(p.specificity() > u.specificity());
        assert!(u.specificity() > c.specificity());
    }

    #[test]
    fn effective_countries_prefer_modern_list() {
        let at = CountryId::new("at").unwrap();
        let it = CountryId::new("it").unwrap();
        let mut student = Student {
            id: StudentId::new(),
            user_id: "u-1".to_string(),
            full_name: "Test Student".to_string(),
            country_id: Some(at.clone()),
            country_ids: vec![it.clone()],
            selected_program_ids: vec![],
            xp_total: 0
        };
        assert_eq!(student.effective_country_ids(), vec![it]);

        student.country_ids.clear();
        assert_eq!(student.effective_country_ids(), vec![at]);

        student.country_id = None;
        assert!(student.effective_country_ids().is_empty());
    }

    #[test]
    fn task_from_template_copies_definition_fields() {
        let template = TaskTemplate {
            id: TemplateId::new(1),
            scope: Some(TemplateScope::Country(CountryId::new("at").unwrap())),
            stage: "Documents".to_string(),
            title: "Upload passport scan".to_string(),
            description: "PDF scan of the main passport page.".to_string(),
            xp_reward: 20,
            submission_kind: SubmissionKind::FileUpload
        };
        let student_id = StudentId::new();
        let task = Task::from_template(student_id, &template);
        assert_eq!(task.student_id, student_id);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.key(), template.key());
        assert_eq!(task.xp_reward, 20);
        assert!(task.submission.is_none());
    }

    #[test]
    fn task_status_round_trips_snake_case() {
        assert_eq!(TaskStatus::ChangesRequested.to_string(), "changes_requested");
        assert_eq!(
            "changes_requested".parse::<TaskStatus>().unwrap(),
            TaskStatus::ChangesRequested
        );
    }
}
