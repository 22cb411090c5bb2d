//! Specificity resolution: one template per (stage, title), most specific
//! scope wins.

use portal_core::types::{TaskKey, TaskTemplate};
use std::collections::HashMap;
use tracing::warn;

/// The winners of specificity resolution plus a count of templates dropped
/// for carrying no scope at all (corrupt template data).
#[derive(Debug, Default)]
pub struct ResolvedTemplates {
    pub templates: Vec<TaskTemplate>,
    pub skipped_invalid: usize
}

/// Collapse candidates sharing a (stage, title) key down to the single most
/// specific one (program > university > country). Ties at equal specificity
/// are broken deterministically: the lowest template id wins, independent of
/// store iteration order.
///
/// A template with no scope should never reach this stage; it is skipped and
/// logged loudly rather than failing the whole sync.
pub fn resolve_specificity(candidates: Vec<TaskTemplate>) -> ResolvedTemplates {
    let mut winners: HashMap<TaskKey, TaskTemplate> = HashMap::new();
    let mut skipped_invalid = 0;

    for candidate in candidates {
        let Some(scope) = &candidate.scope else {
            warn!(
                template_id = %candidate.id,
                stage = %candidate.stage,
                title = %candidate.title,
                "Template has no scope at all; skipping (corrupt template data)"
            );
            skipped_invalid += 1;
            continue;
        };
        let specificity = scope.specificity();

        match winners.entry(candidate.key()) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(candidate);
            }
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let current = entry.get();
                // Unwrap is safe: nothing scopeless is ever inserted.
                let current_specificity =
                    current.scope.as_ref().map(|s| s.specificity()).unwrap_or(0);
                let wins = specificity > current_specificity
                    || (specificity == current_specificity && candidate.id < current.id);
                if wins {
                    entry.insert(candidate);
                }
            }
        }
    }

    let mut templates: Vec<TaskTemplate> = winners.into_values().collect();
    templates.sort_by(|a, b| a.id.cmp(&b.id));

    ResolvedTemplates {
        templates,
        skipped_invalid
    }
}
