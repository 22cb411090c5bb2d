//! Builders for the entities tests construct over and over.

use portal_core::types::{
    CountryId, ProgramId, Student, StudentId, SubmissionKind, TaskTemplate, TemplateId,
    TemplateScope
};

/// Fluent student construction with sensible defaults.
pub struct StudentBuilder {
    student: Student
}

impl StudentBuilder {
    pub fn new() -> Self {
        Self {
            student: Student {
                id: StudentId::new(),
                user_id: super::unique_user_id(),
                full_name: "Test Student".to_string(),
                country_id: None,
                country_ids: Vec::new(),
                selected_program_ids: Vec::new(),
                xp_total: 0
            }
        }
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.student.user_id = user_id.into();
        self
    }

    pub fn full_name(mut self, name: impl Into<String>) -> Self {
        self.student.full_name = name.into();
        self
    }

    /// Legacy single-country field.
    pub fn legacy_country(mut self, country: &str) -> Self {
        self.student.country_id = CountryId::new(country);
        self
    }

    pub fn countries(mut self, countries: &[&str]) -> Self {
        self.student.country_ids = countries
            .iter()
            .filter_map(|c| CountryId::new(*c))
            .collect();
        self
    }

    pub fn programs(mut self, programs: &[&str]) -> Self {
        self.student.selected_program_ids =
            programs.iter().filter_map(|p| ProgramId::new(*p)).collect();
        self
    }

    pub fn build(self) -> Student {
        self.student
    }
}

impl Default for StudentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A template definition with defaults; the scope constructors are the usual
/// entry points.
pub struct TemplateBuilder {
    template: TaskTemplate
}

impl TemplateBuilder {
    fn new(scope: Option<TemplateScope>) -> Self {
        Self {
            template: TaskTemplate {
                id: TemplateId::new(0),
                scope,
                stage: "Documents".to_string(),
                title: "Upload passport scan".to_string(),
                description: "PDF scan of the main passport page.".to_string(),
                xp_reward: 20,
                submission_kind: SubmissionKind::FileUpload
            }
        }
    }

    pub fn country(country: &str) -> Self {
        Self::new(CountryId::new(country).map(TemplateScope::Country))
    }

    pub fn university(university: &str) -> Self {
        Self::new(
            portal_core::types::UniversityId::new(university).map(TemplateScope::University)
        )
    }

    pub fn program(program: &str) -> Self {
        Self::new(ProgramId::new(program).map(TemplateScope::Program))
    }

    /// Corrupt template data: no scope at all.
    pub fn scopeless() -> Self {
        Self::new(None)
    }

    pub fn id(mut self, id: i64) -> Self {
        self.template.id = TemplateId::new(id);
        self
    }

    pub fn stage(mut self, stage: impl Into<String>) -> Self {
        self.template.stage = stage.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.template.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.template.description = description.into();
        self
    }

    pub fn xp(mut self, xp: u32) -> Self {
        self.template.xp_reward = xp;
        self
    }

    pub fn submission_kind(mut self, kind: SubmissionKind) -> Self {
        self.template.submission_kind = kind;
        self
    }

    pub fn build(self) -> TaskTemplate {
        self.template
    }
}
