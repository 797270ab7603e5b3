//! Runtime for per-user conversations and their background searches

mod orchestrator;
mod registry;
mod slot;
pub mod traits;


pub use orchestrator::SearchOrchestrator;
pub use registry::{RegistryStats, SessionRegistry};
pub use traits::*;

use crate::provider::LoggingProvider;
use crate::state_machine::{transition, ChatId, Effect, Input, Location, Reply, Session, UserId};
use crate::telegram::TelegramClient;
use std::sync::Arc;

/// Held while a reply or a search outcome is being sent, so a reply always
/// reaches the chat before the outcome of the search it announced
pub type DeliveryTurn = tokio::sync::Mutex<()>;

/// Type alias for production manager with concrete implementations
pub type ProductionManager = SessionManager<LoggingProvider, Arc<TelegramClient>>;

/// An inbound chat message, transport-independent
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub text: Option<String>,
    pub location: Option<Location>,
}

/// Entry point for inbound messages: runs the state machine against the
/// user's session and applies its effects under the registry lock
pub struct SessionManager<P, O>
where
    P: SearchProvider + 'static,
    O: Outbox + 'static,
{
    registry: Arc<SessionRegistry>,
    orchestrator: SearchOrchestrator<P, O>,
    delivery: Arc<DeliveryTurn>,
}

impl<P, O> SessionManager<P, O>
where
    P: SearchProvider + 'static,
    O: Outbox + 'static,
{
    pub fn new(provider: P, outbox: O) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let delivery = Arc::new(DeliveryTurn::default());
        Self {
            orchestrator: SearchOrchestrator::new(
                Arc::clone(&registry),
                provider,
                outbox,
                Arc::clone(&delivery),
            ),
            registry,
            delivery,
        }
    }

    /// Shared handle on the registry (for the status endpoint)
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Process one message and return the reply text.
    ///
    /// Never waits on I/O: searches are spawned, not awaited. Must be called
    /// from within a Tokio runtime.
    pub fn handle_message(&self, message: &IncomingMessage) -> String {
        let user_id = message.user_id;
        let input = Input::from_parts(message.text.as_deref(), message.location);

        let mut state = self.registry.lock();
        let session = state.session_for(user_id, message.chat_id).clone();

        let result = match transition(&session, input) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(user_id = %user_id, state = ?session.state, error = %e, "Invalid transition");
                return Reply::NotUnderstood.to_string();
            }
        };

        for effect in result.effects {
            match effect {
                Effect::CancelSearch => match state.cancel_search(user_id) {
                    Some(id) => {
                        tracing::info!(user_id = %user_id, search_id = %id, "Cancelling search");
                    }
                    None => {
                        tracing::warn!(user_id = %user_id, "Searching without a registered search");
                    }
                },
                Effect::LaunchSearch { request } => {
                    self.orchestrator
                        .launch(&mut state, user_id, session.chat_id, request);
                }
            }
        }

        if result.new_session.state != session.state {
            tracing::info!(
                user_id = %user_id,
                from = ?session.state,
                to = ?result.new_session.state,
                "Conversation state changed"
            );
        }
        if let Some(stored) = state.session_mut(user_id) {
            *stored = result.new_session;
        }

        result.reply.to_string()
    }

    /// Handle a message and send its reply to the chat it came from.
    ///
    /// Outcomes of searches this message launches wait for the reply.
    pub async fn respond(&self, message: &IncomingMessage) -> Result<(), String> {
        let _turn = self.delivery.lock().await;
        let reply = self.handle_message(message);
        self.orchestrator
            .outbox()
            .send_text(message.chat_id, &reply)
            .await
    }

    /// Cancel every in-flight search; returns how many were live
    pub fn shutdown(&self) -> usize {
        self.registry.lock().cancel_all()
    }

    /// Snapshot of a user's session
    #[allow(dead_code)] // Inspection utility, used by tests
    pub fn session(&self, user_id: UserId) -> Option<Session> {
        self.registry.lock().session(user_id).cloned()
    }
}
