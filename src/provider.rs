//! Vehicle search providers

mod communauto;
mod error;

pub use communauto::CommunautoFinder;
pub use error::SearchError;

use crate::runtime::{SearchOutcome, SearchProvider};
use crate::state_machine::SearchRequest;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Logging wrapper for search providers
pub struct LoggingProvider {
    inner: Arc<dyn SearchProvider>,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn SearchProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SearchProvider for LoggingProvider {
    async fn search(&self, request: &SearchRequest, cancel: CancellationToken) -> SearchOutcome {
        let start = std::time::Instant::now();
        let result = self.inner.search(request, cancel).await;
        let duration = start.elapsed();

        match &result {
            Ok(count) => {
                tracing::info!(
                    mode = request.mode.label(),
                    duration_ms = %duration.as_millis(),
                    count,
                    "Provider search completed"
                );
            }
            Err(e) => {
                tracing::info!(
                    mode = request.mode.label(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Provider search ended without result"
                );
            }
        }

        result
    }
}
