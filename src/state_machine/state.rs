//! Session and conversation state types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identities
// ============================================================================

/// Telegram user identity (the key sessions are stored under)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Telegram chat the bot answers into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Search parameters
// ============================================================================

/// The two kinds of Communauto vehicles a user can look for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Free-floating vehicles, no rental window
    ByFlexZone,
    /// Station vehicles, requires a rental window
    ByStation,
}

impl SearchMode {
    pub fn label(self) -> &'static str {
        match self {
            SearchMode::ByFlexZone => "flex",
            SearchMode::ByStation => "station",
        }
    }
}

/// A shared position (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Format users type rental dates in
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Example shown in date prompts, in `DATE_FORMAT`
pub const DATE_EXAMPLE: &str = "2023-11-21 20:12";

/// Rental window for station searches. `end` is always after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct SearchWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

/// Unchecked wire form of a `SearchWindow`
#[derive(Deserialize)]
struct WindowBounds {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TryFrom<WindowBounds> for SearchWindow {
    type Error = &'static str;

    fn try_from(bounds: WindowBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.start, bounds.end).ok_or("window end must be after its start")
    }
}

impl SearchWindow {
    /// Build a window, refusing empty or inverted ranges
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }
}

/// Everything the provider needs for one search, fully validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub mode: SearchMode,
    pub location: Location,
    pub radius_km: f64,
    /// Present iff `mode` is `ByStation`
    pub window: Option<SearchWindow>,
}

/// A parameter that has to be known before a search can start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingParameter {
    Mode,
    Radius,
    Location,
    WindowStart,
    WindowEnd,
}

impl fmt::Display for MissingParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingParameter::Mode => "search mode",
            MissingParameter::Radius => "radius",
            MissingParameter::Location => "location",
            MissingParameter::WindowStart => "window start",
            MissingParameter::WindowEnd => "window end",
        };
        f.write_str(name)
    }
}

/// Parameters collected during one conversation cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub mode: Option<SearchMode>,
    pub radius_km: Option<f64>,
    pub location: Option<Location>,
    pub window_start: Option<NaiveDateTime>,
    pub window_end: Option<NaiveDateTime>,
}

impl SearchParams {
    /// Assemble a provider request, or name the first parameter that is missing.
    ///
    /// An inverted station window is reported as a missing `WindowEnd`.
    pub fn to_request(&self) -> Result<SearchRequest, MissingParameter> {
        let mode = self.mode.ok_or(MissingParameter::Mode)?;
        let radius_km = self
            .radius_km
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or(MissingParameter::Radius)?;
        let location = self.location.ok_or(MissingParameter::Location)?;

        let window = match mode {
            SearchMode::ByFlexZone => None,
            SearchMode::ByStation => {
                let start = self.window_start.ok_or(MissingParameter::WindowStart)?;
                let end = self.window_end.ok_or(MissingParameter::WindowEnd)?;
                Some(SearchWindow::new(start, end).ok_or(MissingParameter::WindowEnd)?)
            }
        };

        Ok(SearchRequest {
            mode,
            location,
            radius_km,
            window,
        })
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Where a user is in the search conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvState {
    /// Never started a search
    #[default]
    NotSearching,
    AskingType,
    AskingMargin,
    AskingPosition,
    /// Station only
    AskingDateStart,
    /// Station only
    AskingDateEnd,
    /// A background search is in flight
    Searching,
    /// Last search finished; parameters kept for `/recommencer`
    EndSearch,
}

impl ConvState {
    /// Check if a search task owns this session
    pub fn is_searching(self) -> bool {
        matches!(self, ConvState::Searching)
    }
}

/// Per-user conversation state, the single source of truth for that user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub chat_id: ChatId,
    pub state: ConvState,
    pub params: SearchParams,
}

impl Session {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            state: ConvState::NotSearching,
            params: SearchParams::default(),
        }
    }
}
