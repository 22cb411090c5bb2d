//! Context resolution: the scope identifiers a student's profile reaches.

use errors::StoreError;
use portal_core::traits::ProgramCatalog;
use portal_core::types::{CountryId, ProgramId, Student, UniversityId};
use tracing::debug;

/// The three identifier sets template matching runs against. Universities
/// are only reachable transitively, through a selected program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedContext {
    pub country_ids: Vec<CountryId>,
    pub university_ids: Vec<UniversityId>,
    pub program_ids: Vec<ProgramId>
}

impl ResolvedContext {
    /// No scope at any level. A valid, quiescent state for brand-new
    /// students, not an error.
    pub fn is_empty(&self) -> bool {
        self.country_ids.is_empty() && self.university_ids.is_empty() && self.program_ids.is_empty()
    }
}

/// Derive the full applicable context for a student. Pure except for the
/// program → university catalog lookup.
pub async fn resolve_context(
    student: &Student,
    catalog: &dyn ProgramCatalog
) -> Result<ResolvedContext, StoreError> {
    let country_ids = student.effective_country_ids();
    let program_ids = student.selected_program_ids.clone();

    let university_ids = if program_ids.is_empty() {
        Vec::new()
    } else {
        catalog.university_ids_for_programs(&program_ids).await?
    };

    debug!(
        student_id = %student.id,
        countries = country_ids.len(),
        universities = university_ids.len(),
        programs = program_ids.len(),
        "Resolved student context"
    );

    Ok(ResolvedContext {
        country_ids,
        university_ids,
        program_ids
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use portal_core::types::StudentId;
    use std::collections::HashMap;

    struct FixedCatalog {
        mapping: HashMap<ProgramId, UniversityId>
    }

    #[async_trait]
    impl ProgramCatalog for FixedCatalog {
        async fn university_ids_for_programs(
            &self,
            program_ids: &[ProgramId]
        ) -> Result<Vec<UniversityId>, StoreError> {
            let mut out = Vec::new();
            for pid in program_ids {
                if let Some(uid) = self.mapping.get(pid) {
                    if !out.contains(uid) {
                        out.push(uid.clone());
                    }
                }
            }
            Ok(out)
        }
    }

    fn student(
        country_id: Option<&str>,
        country_ids: &[&str],
        program_ids: &[&str]
    ) -> Student {
        Student {
            id: StudentId::new(),
            user_id: "u-1".to_string(),
            full_name: "Test Student".to_string(),
            country_id: country_id.map(|c| CountryId::new(c).unwrap()),
            country_ids: country_ids
                .iter()
                .map(|c| CountryId::new(*c).unwrap())
                .collect(),
            selected_program_ids: program_ids
                .iter()
                .map(|p| ProgramId::new(*p).unwrap())
                .collect(),
            xp_total: 0
        }
    }

    fn catalog() -> FixedCatalog {
        let mut mapping = HashMap::new();
        mapping.insert(
            ProgramId::new("p-cs-msc").unwrap(),
            UniversityId::new("uni-vienna").unwrap()
        );
        mapping.insert(
            ProgramId::new("p-ba-bsc").unwrap(),
            UniversityId::new("uni-vienna").unwrap()
        );
        FixedCatalog { mapping }
    }

    #[tokio::test]
    async fn expands_programs_to_deduplicated_universities() {
        let ctx = resolve_context(
            &student(None, &["at"], &["p-cs-msc", "p-ba-bsc"]),
            &catalog()
        )
        .await
        .unwrap();

        assert_eq!(ctx.country_ids, vec![CountryId::new("at").unwrap()]);
        assert_eq!(
            ctx.university_ids,
            vec![UniversityId::new("uni-vienna").unwrap()]
        );
        assert_eq!(ctx.program_ids.len(), 2);
    }

    #[tokio::test]
    async fn legacy_country_field_is_the_fallback() {
        let ctx = resolve_context(&student(Some("it"), &[], &[]), &catalog())
            .await
            .unwrap();
        assert_eq!(ctx.country_ids, vec![CountryId::new("it").unwrap()]);
        assert!(ctx.university_ids.is_empty());
        assert!(!ctx.is_empty());
    }

    #[tokio::test]
    async fn no_associations_yield_empty_context() {
        let ctx = resolve_context(&student(None, &[], &[]), &catalog())
            .await
            .unwrap();
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn programs_alone_still_produce_context() {
        let ctx = resolve_context(&student(None, &[], &["p-cs-msc"]), &catalog())
            .await
            .unwrap();
        assert!(ctx.country_ids.is_empty());
        assert_eq!(ctx.university_ids.len(), 1);
        assert!(!ctx.is_empty());
    }
}
