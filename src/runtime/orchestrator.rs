//! Background search orchestration
//!
//! Each launched search runs as its own task: the provider call fills a
//! result slot, the task awaits it, commits `EndSearch` and notifies the user.

use super::registry::{ActiveSearch, RegistryState, SearchId, SessionRegistry};
use super::DeliveryTurn;
use super::slot::result_slot;
use super::traits::{Outbox, SearchOutcome, SearchProvider};
use crate::provider::SearchError;
use crate::state_machine::{ChatId, ConvState, Reply, SearchRequest, UserId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Launches searches and merges their outcomes back into sessions
pub struct SearchOrchestrator<P, O>
where
    P: SearchProvider + 'static,
    O: Outbox + 'static,
{
    registry: Arc<SessionRegistry>,
    provider: Arc<P>,
    outbox: Arc<O>,
    delivery: Arc<DeliveryTurn>,
}

impl<P, O> SearchOrchestrator<P, O>
where
    P: SearchProvider + 'static,
    O: Outbox + 'static,
{
    pub fn new(
        registry: Arc<SessionRegistry>,
        provider: P,
        outbox: O,
        delivery: Arc<DeliveryTurn>,
    ) -> Self {
        Self {
            registry,
            provider: Arc::new(provider),
            outbox: Arc::new(outbox),
            delivery,
        }
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    /// Register a fresh cancellation handle for the user and spawn the search.
    ///
    /// `state` is the caller's locked registry, so the handle appears together
    /// with the session's move to `Searching`. Must run inside a Tokio runtime.
    pub fn launch(
        &self,
        state: &mut RegistryState,
        user_id: UserId,
        chat_id: ChatId,
        request: SearchRequest,
    ) -> SearchId {
        let id = self.registry.next_search_id();
        let cancel = CancellationToken::new();

        let previous = state.register_search(user_id, ActiveSearch::new(id, cancel.clone()));
        match previous {
            Some(previous) if previous.is_live() => {
                tracing::warn!(
                    user_id = %user_id,
                    previous = %previous.id,
                    "Live search replaced without cancellation, cancelling it"
                );
                previous.cancel();
            }
            // Committed or cancelled, still delivering its outcome
            Some(previous) => {
                tracing::debug!(
                    user_id = %user_id,
                    previous = %previous.id,
                    "Replacing handle of a finished search"
                );
            }
            None => {}
        }

        tracing::info!(
            user_id = %user_id,
            chat_id = %chat_id,
            search_id = %id,
            mode = request.mode.label(),
            radius_km = request.radius_km,
            "Launching search"
        );

        let task = SearchTask {
            id,
            user_id,
            chat_id,
            request,
            cancel,
            registry: Arc::clone(&self.registry),
            provider: Arc::clone(&self.provider),
            outbox: Arc::clone(&self.outbox),
            delivery: Arc::clone(&self.delivery),
        };
        tokio::spawn(task.run());

        id
    }
}

/// One in-flight search and everything it needs to finish on its own
struct SearchTask<P, O> {
    id: SearchId,
    user_id: UserId,
    chat_id: ChatId,
    request: SearchRequest,
    cancel: CancellationToken,
    registry: Arc<SessionRegistry>,
    provider: Arc<P>,
    outbox: Arc<O>,
    delivery: Arc<DeliveryTurn>,
}

impl<P, O> SearchTask<P, O>
where
    P: SearchProvider + 'static,
    O: Outbox + 'static,
{
    async fn run(self) {
        let (writer, reader) = result_slot::<SearchOutcome>();

        let provider = Arc::clone(&self.provider);
        let request = self.request.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let outcome = provider.search(&request, cancel).await;
            writer.fill(outcome);
        });

        // A provider that panics drops the writer; that counts as a failure.
        let outcome = reader
            .wait()
            .await
            .unwrap_or_else(|| Err(SearchError::unknown("search ended without an outcome")));

        match &outcome {
            Ok(count) => {
                tracing::info!(user_id = %self.user_id, search_id = %self.id, count, "Search completed");
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!(user_id = %self.user_id, search_id = %self.id, "Search cancelled");
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %self.user_id,
                    search_id = %self.id,
                    error = %e,
                    "Search failed"
                );
            }
        }

        if let Some(reply) = self.commit(&outcome) {
            let _turn = self.delivery.lock().await;
            if let Err(e) = self.outbox.send_text(self.chat_id, &reply.to_string()).await {
                tracing::warn!(chat_id = %self.chat_id, error = %e, "Failed to send search outcome");
            }
        }

        // Only after the commit, so a concurrent cancel never sees a handle
        // for a search whose state is already final.
        if !self.registry.lock().remove_search(self.user_id, self.id) {
            tracing::debug!(search_id = %self.id, "Handle already replaced by a newer search");
        }
    }

    /// Move the session to `EndSearch` if this search is still the user's
    /// current one. Returns the reply to send, or `None` for a stale outcome.
    fn commit(&self, outcome: &SearchOutcome) -> Option<Reply> {
        let mut state = self.registry.lock();

        if !state.is_current(self.user_id, self.id) {
            tracing::info!(
                user_id = %self.user_id,
                search_id = %self.id,
                "Dropping outcome of superseded search"
            );
            return None;
        }

        let Some(session) = state.session_mut(self.user_id) else {
            tracing::error!(
                user_id = %self.user_id,
                search_id = %self.id,
                "No session for finished search"
            );
            return None;
        };

        if session.state != ConvState::Searching {
            tracing::error!(
                user_id = %self.user_id,
                search_id = %self.id,
                state = ?session.state,
                "Session left Searching while its search was live"
            );
            return None;
        }

        session.state = ConvState::EndSearch;
        state.retire_search(self.user_id, self.id);

        Some(match outcome {
            Ok(count) => Reply::Found { count: *count },
            Err(_) => Reply::SearchFailed,
        })
    }
}
