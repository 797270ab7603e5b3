//! Process-wide session and search registry
//!
//! Sessions and the cancellation handles of in-flight searches share one
//! mutex. Every read-modify-write of a session, including the terminal commit
//! of a search, happens under it, so a user's transitions are totally ordered.

use crate::state_machine::{ChatId, Session, UserId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Identifies one search cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchId(u64);

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "search-{}", self.0)
    }
}

/// Cancellation handle of a user's in-flight search
#[derive(Debug, Clone)]
pub struct ActiveSearch {
    pub id: SearchId,
    cancel: CancellationToken,
}

impl ActiveSearch {
    pub fn new(id: SearchId, cancel: CancellationToken) -> Self {
        Self { id, cancel }
    }

    /// Signal the search to stop. Calling it again is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

/// Counters exposed on the status endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub sessions: usize,
    pub active_searches: usize,
}

/// State guarded by the registry lock
#[derive(Debug, Default)]
pub struct RegistryState {
    sessions: HashMap<UserId, Session>,
    searches: HashMap<UserId, ActiveSearch>,
}

impl RegistryState {
    /// The user's session, created on first contact with `chat_id`
    pub fn session_for(&mut self, user_id: UserId, chat_id: ChatId) -> &mut Session {
        self.sessions
            .entry(user_id)
            .or_insert_with(|| Session::new(chat_id))
    }

    pub fn session(&self, user_id: UserId) -> Option<&Session> {
        self.sessions.get(&user_id)
    }

    pub fn session_mut(&mut self, user_id: UserId) -> Option<&mut Session> {
        self.sessions.get_mut(&user_id)
    }

    /// Install the user's search handle, returning the one it replaced
    pub fn register_search(&mut self, user_id: UserId, search: ActiveSearch) -> Option<ActiveSearch> {
        self.searches.insert(user_id, search)
    }

    /// Cancel the user's search. The handle stays until its task removes it.
    pub fn cancel_search(&mut self, user_id: UserId) -> Option<SearchId> {
        self.searches.get(&user_id).map(|search| {
            search.cancel();
            search.id
        })
    }

    /// Mark the user's search as finished once its outcome is committed.
    /// The handle stays until its task removes it, but is no longer live.
    pub fn retire_search(&mut self, user_id: UserId, id: SearchId) -> bool {
        match self.searches.get(&user_id) {
            Some(search) if search.id == id => {
                search.cancel();
                true
            }
            _ => false,
        }
    }

    #[allow(dead_code)] // Inspection utility, used by tests
    pub fn active_search(&self, user_id: UserId) -> Option<&ActiveSearch> {
        self.searches.get(&user_id)
    }

    /// Whether `id` is still the user's live search
    pub fn is_current(&self, user_id: UserId, id: SearchId) -> bool {
        self.searches
            .get(&user_id)
            .is_some_and(|search| search.id == id && search.is_live())
    }

    /// Remove the user's handle if it still belongs to `id`
    pub fn remove_search(&mut self, user_id: UserId, id: SearchId) -> bool {
        if self.searches.get(&user_id).is_some_and(|s| s.id == id) {
            self.searches.remove(&user_id);
            true
        } else {
            false
        }
    }

    /// Cancel every in-flight search; returns how many were still live
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for search in self.searches.values().filter(|s| s.is_live()) {
            search.cancel();
            cancelled += 1;
        }
        cancelled
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            sessions: self.sessions.len(),
            active_searches: self.searches.values().filter(|s| s.is_live()).count(),
        }
    }
}

/// Owner of the lock and of search id allocation
#[derive(Debug, Default)]
pub struct SessionRegistry {
    state: Mutex<RegistryState>,
    next_search_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the registry lock.
    ///
    /// A panic while the lock was held only concerns one user's session, so a
    /// poisoned lock is recovered instead of taking every other user down.
    pub fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Session registry lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn next_search_id(&self) -> SearchId {
        SearchId(self.next_search_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn stats(&self) -> RegistryStats {
        self.lock().stats()
    }
}
