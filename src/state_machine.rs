//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod reply;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Input;
pub use reply::Reply;
pub use state::{
    ChatId, ConvState, Location, SearchMode, SearchRequest, SearchWindow, Session, UserId,
};
pub use transition::transition;
