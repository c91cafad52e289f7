//! Shared application state for the UI server.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use anyhow::Result;
use playground::io::config::PlaygroundConfig;
use playground::io::store::{MemStore, Store};
use playground::session::{SessionController, SessionHost};
use playground::validate::load_catalog;
use tracing::{debug, info};

/// Bounds on the live session map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions kept at once; the least recently used is evicted beyond it.
    pub max_sessions: usize,
    /// Sessions not touched for this long are evicted.
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 256,
            idle_ttl: Duration::from_secs(30 * 60),
        }
    }
}

struct SessionEntry {
    controller: SessionController,
    last_touched: Instant,
}

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Patterns and favorites.
    pub store: Arc<dyn Store>,
    /// Executor, print channel and event bus shared by all sessions.
    pub host: SessionHost,
    limits: SessionLimits,
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, host: SessionHost, limits: SessionLimits) -> Self {
        Self {
            store,
            host,
            limits,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed the store from the configured catalog (or the built-in one).
    pub fn from_config(cfg: &PlaygroundConfig, limits: SessionLimits) -> Result<Self> {
        let patterns = load_catalog(cfg.catalog_path.as_deref())?;
        info!(patterns = patterns.len(), "catalog loaded");
        Ok(Self::new(
            Arc::new(MemStore::new(patterns)),
            SessionHost::from_config(cfg),
            limits,
        ))
    }

    /// Look up a session and mark it as used.
    pub fn session(&self, id: &str) -> Option<SessionController> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let entry = sessions.get_mut(id)?;
        entry.last_touched = Instant::now();
        Some(entry.controller.clone())
    }

    /// Store a session, first evicting idle ones and then the least recently
    /// used until there is room.
    pub fn insert_session(&self, session: SessionController) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_touched) < self.limits.idle_ttl);

        while !sessions.is_empty() && sessions.len() >= self.limits.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_touched)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "sessions evicted");
        }

        sessions.insert(
            session.id().to_string(),
            SessionEntry {
                controller: session,
                last_touched: now,
            },
        );
    }

    /// Forget a session. An in-flight run still finishes and publishes its
    /// events, but the result is no longer reachable.
    pub fn remove_session(&self, id: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
