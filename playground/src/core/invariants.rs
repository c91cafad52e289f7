//! Semantic invariants of a pattern catalog beyond what the schema checks.

use std::collections::HashSet;

use crate::core::catalog::Pattern;

/// Return every violation found; empty means the catalog is consistent.
///
/// Related-pattern ids are deliberately not checked: catalogs link to
/// patterns that have not been written yet.
pub fn validate_catalog_invariants(patterns: &[Pattern]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut slugs = HashSet::new();
    let mut names = HashSet::new();

    for (index, pattern) in patterns.iter().enumerate() {
        if !slugs.insert(pattern.slug.as_str()) {
            errors.push(format!(
                "duplicate slug '{}' at index {index}",
                pattern.slug
            ));
        }
        if !names.insert(pattern.name.to_lowercase()) {
            errors.push(format!(
                "duplicate name '{}' at index {index}",
                pattern.name
            ));
        }
        if pattern.code_template.trim().is_empty() {
            errors.push(format!("pattern '{}' has an empty codeTemplate", pattern.slug));
        }
    }

    errors
}
