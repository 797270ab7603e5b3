//! Bot API wire types (only the fields the bot reads)

use crate::runtime::IncomingMessage;
use crate::state_machine::{ChatId, Location, UserId};
use serde::Deserialize;

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub location: Option<TgLocation>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TgLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl Message {
    /// Transport-independent view; `None` for messages without a sender
    /// (channel posts)
    pub fn to_incoming(&self) -> Option<IncomingMessage> {
        let from = self.from.as_ref()?;
        Some(IncomingMessage {
            user_id: UserId(from.id),
            chat_id: ChatId(self.chat.id),
            text: self.text.clone(),
            location: self
                .location
                .map(|loc| Location::new(loc.latitude, loc.longitude)),
        })
    }
}
