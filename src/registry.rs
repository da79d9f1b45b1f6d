//! Category admission
//!
//! The classifier is free to propose names the user never configured. The
//! registry decides whether a proposal becomes a real category or falls back
//! to the catch-all. Admissions mutate the shared category set synchronously,
//! so a duplicate proposal later in the same batch resolves as an exact match
//! instead of creating a second category.

use tracing::{debug, info};

use crate::config::CategoryConfig;
use crate::models::Category;

/// Fallback for proposals that cannot be admitted
///
/// "Uncategorized" is an implicit category: it is never stored in the
/// registry, never counts against the auto-generated cap, and resolves to a
/// label through the same find-or-create path as any other name.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Outcome of admitting one proposed category name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// The name the message is filed under
    pub final_name: String,
    /// Whether the category set grew and needs persisting
    pub created: bool,
}

/// Resolve a proposed category name against the registry
///
/// Exact matches pass through. Unknown names are admitted as auto-generated
/// categories while auto-creation is enabled and under the cap; otherwise the
/// proposal resolves to [`UNCATEGORIZED`] and the set is unchanged.
pub fn admit(
    proposed: &str,
    categories: &mut Vec<Category>,
    settings: &CategoryConfig,
) -> Admission {
    let proposed = proposed.trim();

    if proposed.is_empty() || proposed == UNCATEGORIZED {
        return Admission {
            final_name: UNCATEGORIZED.to_string(),
            created: false,
        };
    }

    if categories.iter().any(|c| c.name == proposed) {
        return Admission {
            final_name: proposed.to_string(),
            created: false,
        };
    }

    if !settings.auto_create {
        debug!(
            "Auto-creation disabled, filing proposal '{}' as {}",
            proposed, UNCATEGORIZED
        );
        return Admission {
            final_name: UNCATEGORIZED.to_string(),
            created: false,
        };
    }

    let auto_count = categories.iter().filter(|c| c.auto_generated).count();
    if auto_count >= settings.auto_create_limit {
        debug!(
            "Auto-category limit {} reached, filing proposal '{}' as {}",
            settings.auto_create_limit, proposed, UNCATEGORIZED
        );
        return Admission {
            final_name: UNCATEGORIZED.to_string(),
            created: false,
        };
    }

    info!("Admitting new auto-generated category '{}'", proposed);
    categories.push(Category::auto_generated(proposed));
    Admission {
        final_name: proposed.to_string(),
        created: true,
    }
}
