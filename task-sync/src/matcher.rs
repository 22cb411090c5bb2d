//! Template matching: union the candidates from all three scope levels.

use crate::context::ResolvedContext;
use errors::StoreError;
use portal_core::traits::{TemplateFilter, TemplateStore};
use portal_core::types::TaskTemplate;
use tracing::debug;

/// Fetch every template whose scope matches the context at any level. The
/// result may carry duplicate (stage, title) pairs across levels; the
/// specificity resolver owns deduplication.
pub async fn match_templates(
    store: &dyn TemplateStore,
    context: &ResolvedContext
) -> Result<Vec<TaskTemplate>, StoreError> {
    let filters = [
        TemplateFilter::CountryGeneric {
            country_ids: context.country_ids.clone()
        },
        TemplateFilter::UniversityGeneric {
            university_ids: context.university_ids.clone()
        },
        TemplateFilter::ProgramSpecific {
            program_ids: context.program_ids.clone()
        }
    ];

    let mut candidates = Vec::new();
    for filter in &filters {
        if filter.is_empty() {
            continue;
        }
        let matched = store.find_templates(filter).await?;
        debug!(filter = ?filter, count = matched.len(), "Matched templates");
        candidates.extend(matched);
    }

    Ok(candidates)
}
