//! Effects produced by state transitions

use super::state::SearchRequest;

/// Side effects the session manager performs after a transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Cancel the user's in-flight search
    CancelSearch,

    /// Start a background search with these parameters
    LaunchSearch { request: SearchRequest },
}

impl Effect {
    pub fn launch(request: SearchRequest) -> Self {
        Effect::LaunchSearch { request }
    }
}
