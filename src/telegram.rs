//! Telegram Bot API transport
//!
//! Long-polls `getUpdates`, feeds each message to the session manager and
//! sends the immediate reply back to the chat.

mod client;
mod types;

pub use client::TelegramClient;

use crate::runtime::ProductionManager;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay before polling again after a failed `getUpdates`
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Receive updates until `shutdown` fires
pub async fn run_polling(
    client: &TelegramClient,
    manager: &ProductionManager,
    shutdown: &CancellationToken,
) {
    let mut offset = 0;

    loop {
        let batch = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            batch = client.get_updates(offset) => batch,
        };

        let updates = match batch {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed");
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(POLL_ERROR_BACKOFF) => continue,
                }
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);

            let Some(incoming) = update.message.as_ref().and_then(types::Message::to_incoming)
            else {
                tracing::debug!(update_id = update.update_id, "Ignoring update without message");
                continue;
            };

            tracing::debug!(
                user_id = %incoming.user_id,
                has_text = incoming.text.is_some(),
                has_location = incoming.location.is_some(),
                "Message received"
            );

            if let Err(e) = manager.respond(&incoming).await {
                tracing::warn!(chat_id = %incoming.chat_id, error = %e, "Failed to send reply");
            }
        }
    }

    tracing::info!("Update polling stopped");
}
