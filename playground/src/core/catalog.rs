//! Pattern catalog records and pure query helpers.

use serde::{Deserialize, Serialize};

/// A design pattern article.
///
/// `category` is one of `javascript`, `nodejs`, `react`; `difficulty` one of
/// `beginner`, `intermediate`, `advanced`. Both are enforced by the catalog
/// schema rather than by the type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    /// Assigned by the store on load; absent in catalog files.
    #[serde(default)]
    pub id: u32,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    /// Pattern family (`creational`, `structural`, `behavioral`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// HTML article body.
    pub content: String,
    pub code_example: String,
    /// Seed source for the sandbox editor.
    pub code_template: String,
    pub related_patterns: Vec<RelatedPattern>,
    pub real_world_examples: Vec<RealWorldExample>,
    pub benefits: Vec<String>,
    pub drawbacks: Vec<String>,
    pub further_reading: Vec<Reference>,
}

/// Cross-link to another pattern. The id may refer to a pattern that is not
/// in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedPattern {
    pub id: u32,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealWorldExample {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A stored favorite entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: u32,
    pub pattern_id: u32,
    pub user_id: String,
}

/// Favorite insert payload (id is assigned by the store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFavorite {
    pub pattern_id: u32,
    pub user_id: String,
}

/// Case-insensitive substring match over name, description and content.
pub fn matches_query(pattern: &Pattern, query: &str) -> bool {
    let query = query.to_lowercase();
    pattern.name.to_lowercase().contains(&query)
        || pattern.description.to_lowercase().contains(&query)
        || pattern.content.to_lowercase().contains(&query)
}
