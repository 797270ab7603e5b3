//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the orchestrator with mock implementations.

use crate::provider::SearchError;
use crate::state_machine::{ChatId, SearchRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Terminal result of one search: number of vehicles found, or why it failed
pub type SearchOutcome = Result<u32, SearchError>;

/// Finds available vehicles
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search to completion.
    ///
    /// Must return promptly with `SearchError::cancelled()` once `cancel` fires,
    /// and must always return exactly one outcome.
    async fn search(&self, request: &SearchRequest, cancel: CancellationToken) -> SearchOutcome;
}

/// Sends text messages to a chat
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), String>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SearchProvider + ?Sized> SearchProvider for Arc<T> {
    async fn search(&self, request: &SearchRequest, cancel: CancellationToken) -> SearchOutcome {
        (**self).search(request, cancel).await
    }
}

#[async_trait]
impl<T: Outbox + ?Sized> Outbox for Arc<T> {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), String> {
        (**self).send_text(chat_id, text).await
    }
}
