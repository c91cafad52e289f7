//! In-memory record store for patterns and favorites.
//!
//! Nothing here is durable: favorites disappear on restart.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::core::catalog::{Favorite, NewFavorite, Pattern, matches_query};

/// Record lookup/list/insert/delete contract used by the HTTP layer.
pub trait Store: Send + Sync {
    /// All patterns in id order.
    fn all_patterns(&self) -> Vec<Pattern>;
    fn pattern_by_slug(&self, slug: &str) -> Option<Pattern>;
    fn pattern_by_id(&self, id: u32) -> Option<Pattern>;
    fn patterns_by_category(&self, category: &str) -> Vec<Pattern>;
    fn search_patterns(&self, query: &str) -> Vec<Pattern>;

    /// Patterns favorited by `user_id`, in insertion order.
    ///
    /// Errors if a favorite refers to a pattern that no longer exists.
    fn favorites(&self, user_id: &str) -> Result<Vec<Pattern>>;
    /// Insert a favorite. Does not deduplicate; callers check
    /// [`Store::is_favorite`] first.
    fn add_favorite(&self, favorite: NewFavorite) -> Favorite;
    /// Returns false if no matching favorite existed.
    fn remove_favorite(&self, pattern_id: u32, user_id: &str) -> bool;
    fn is_favorite(&self, pattern_id: u32, user_id: &str) -> bool;
}

#[derive(Debug, Default)]
struct Tables {
    patterns: BTreeMap<u32, Pattern>,
    favorites: BTreeMap<u32, Favorite>,
    next_favorite_id: u32,
}

/// [`Store`] backed by maps behind a lock.
#[derive(Debug, Default)]
pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    /// Seed the store, assigning pattern ids `1..` in the given order.
    pub fn new(patterns: Vec<Pattern>) -> Self {
        let patterns: BTreeMap<u32, Pattern> = patterns
            .into_iter()
            .zip(1u32..)
            .map(|(mut pattern, id)| {
                pattern.id = id;
                (id, pattern)
            })
            .collect();
        debug!(patterns = patterns.len(), "store seeded");
        Self {
            tables: RwLock::new(Tables {
                patterns,
                favorites: BTreeMap::new(),
                next_favorite_id: 1,
            }),
        }
    }

    fn filter_patterns(&self, keep: impl Fn(&Pattern) -> bool) -> Vec<Pattern> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .patterns
            .values()
            .filter(|pattern| keep(pattern))
            .cloned()
            .collect()
    }
}

impl Store for MemStore {
    fn all_patterns(&self) -> Vec<Pattern> {
        self.filter_patterns(|_| true)
    }

    fn pattern_by_slug(&self, slug: &str) -> Option<Pattern> {
        self.filter_patterns(|pattern| pattern.slug == slug)
            .into_iter()
            .next()
    }

    fn pattern_by_id(&self, id: u32) -> Option<Pattern> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.patterns.get(&id).cloned()
    }

    fn patterns_by_category(&self, category: &str) -> Vec<Pattern> {
        self.filter_patterns(|pattern| pattern.category == category)
    }

    fn search_patterns(&self, query: &str) -> Vec<Pattern> {
        self.filter_patterns(|pattern| matches_query(pattern, query))
    }

    fn favorites(&self, user_id: &str) -> Result<Vec<Pattern>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .favorites
            .values()
            .filter(|favorite| favorite.user_id == user_id)
            .map(|favorite| {
                tables
                    .patterns
                    .get(&favorite.pattern_id)
                    .cloned()
                    .ok_or_else(|| anyhow!("pattern with id {} not found", favorite.pattern_id))
            })
            .collect()
    }

    fn add_favorite(&self, favorite: NewFavorite) -> Favorite {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let id = tables.next_favorite_id;
        tables.next_favorite_id += 1;
        let stored = Favorite {
            id,
            pattern_id: favorite.pattern_id,
            user_id: favorite.user_id,
        };
        tables.favorites.insert(id, stored.clone());
        debug!(id, pattern_id = stored.pattern_id, "favorite added");
        stored
    }

    fn remove_favorite(&self, pattern_id: u32, user_id: &str) -> bool {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let found = tables
            .favorites
            .iter()
            .find(|(_, favorite)| favorite.pattern_id == pattern_id && favorite.user_id == user_id)
            .map(|(id, _)| *id);
        match found {
            Some(id) => tables.favorites.remove(&id).is_some(),
            None => false,
        }
    }

    fn is_favorite(&self, pattern_id: u32, user_id: &str) -> bool {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .favorites
            .values()
            .any(|favorite| favorite.pattern_id == pattern_id && favorite.user_id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pattern;

    fn store() -> MemStore {
        let mut observer = pattern("observer", "Observer");
        observer.category = "react".to_string();
        observer.description = "Notify subscribers".to_string();
        MemStore::new(vec![pattern("singleton", "Singleton"), observer])
    }

    fn favorite(pattern_id: u32, user_id: &str) -> NewFavorite {
        NewFavorite {
            pattern_id,
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn ids_follow_seed_order() {
        let store = store();
        let ids: Vec<u32> = store.all_patterns().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.pattern_by_slug("observer").map(|p| p.id), Some(2));
        assert_eq!(store.pattern_by_id(1).map(|p| p.slug), Some("singleton".to_string()));
        assert!(store.pattern_by_slug("missing").is_none());
    }

    #[test]
    fn category_and_search_filter() {
        let store = store();
        let react: Vec<String> = store
            .patterns_by_category("react")
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(react, vec!["observer".to_string()]);

        let hits: Vec<String> = store
            .search_patterns("SUBSCRIBERS")
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(hits, vec!["observer".to_string()]);
    }

    #[test]
    fn favorites_are_scoped_per_user() {
        let store = store();
        let first = store.add_favorite(favorite(2, "alice"));
        let second = store.add_favorite(favorite(1, "bob"));
        assert_eq!((first.id, second.id), (1, 2));

        let alice: Vec<String> = store
            .favorites("alice")
            .expect("favorites")
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(alice, vec!["observer".to_string()]);
        assert!(store.is_favorite(2, "alice"));
        assert!(!store.is_favorite(2, "bob"));
    }

    #[test]
    fn remove_favorite_reports_missing() {
        let store = store();
        store.add_favorite(favorite(1, "alice"));
        assert!(!store.remove_favorite(1, "bob"));
        assert!(store.remove_favorite(1, "alice"));
        assert!(!store.remove_favorite(1, "alice"));
        assert!(store.favorites("alice").expect("favorites").is_empty());
    }

    #[test]
    fn dangling_favorite_is_an_error() {
        let store = store();
        store.add_favorite(favorite(99, "alice"));
        let err = store.favorites("alice").expect_err("dangling");
        assert!(err.to_string().contains("99"));
    }
}
