//! Inputs that drive the conversation

use super::state::Location;

/// Bot commands understood from any state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/chercher`
    BeginSearch,
    /// `/recommencer`
    RepeatSearch,
    /// `/aide` (and `/start`, which Telegram sends on first contact)
    Help,
}

impl Command {
    /// Recognize a command, ignoring case and surrounding whitespace
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "/chercher" => Some(Command::BeginSearch),
            "/recommencer" => Some(Command::RepeatSearch),
            "/aide" | "/start" => Some(Command::Help),
            _ => None,
        }
    }
}

/// One inbound user message, as the state machine sees it
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Text(String),
    Location(Location),
    /// Stickers, photos, anything without text or position
    Other,
}

impl Input {
    /// Classify a transport message. A shared position wins over any caption.
    pub fn from_parts(text: Option<&str>, location: Option<Location>) -> Self {
        if let Some(location) = location {
            return Input::Location(location);
        }
        match text {
            Some(text) => Command::parse(text)
                .map_or_else(|| Input::Text(text.to_string()), Input::Command),
            None => Input::Other,
        }
    }
}
