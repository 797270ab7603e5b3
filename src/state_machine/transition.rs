//! Pure state transition function
//!
//! Given the same session and input, `transition` always produces the same
//! next session, reply and effects. It performs no I/O; cancelling and
//! launching searches is left to the caller through `Effect`s.

use super::event::{Command, Input};
use super::reply::Reply;
use super::state::{
    ConvState, MissingParameter, SearchMode, SearchParams, Session, DATE_FORMAT,
};
use super::Effect;
use chrono::NaiveDateTime;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: Session,
    pub reply: Reply,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session, reply: Reply) -> Self {
        Self {
            new_session: session,
            reply,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Invariant violations detected while transitioning
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot start a search without a {0}")]
    IncompleteSearch(MissingParameter),
}

/// Pure transition function
pub fn transition(session: &Session, input: Input) -> Result<TransitionResult, TransitionError> {
    match (session.state, input) {
        // ============================================================
        // Commands accepted from any state
        // ============================================================
        (_, Input::Command(Command::Help)) => Ok(unchanged(session, Reply::Help)),

        (state, Input::Command(Command::BeginSearch)) => {
            let next = Session {
                chat_id: session.chat_id,
                state: ConvState::AskingType,
                params: SearchParams::default(),
            };
            let result = TransitionResult::new(next, Reply::AskType);
            if state.is_searching() {
                Ok(result.with_effect(Effect::CancelSearch))
            } else {
                Ok(result)
            }
        }

        (ConvState::EndSearch, Input::Command(Command::RepeatSearch)) => {
            start_search(session.clone())
        }

        (_, Input::Command(Command::RepeatSearch)) => {
            Ok(unchanged(session, Reply::RepeatUnavailable))
        }

        // ============================================================
        // Parameter collection
        // ============================================================
        (ConvState::AskingType, Input::Text(text)) => {
            let mode = match text.trim().to_lowercase().as_str() {
                "station" => SearchMode::ByStation,
                "flex" => SearchMode::ByFlexZone,
                _ => return Ok(unchanged(session, Reply::NotUnderstood)),
            };
            let mut next = session.clone();
            next.params.mode = Some(mode);
            next.state = ConvState::AskingMargin;
            Ok(TransitionResult::new(next, Reply::AskRadius))
        }

        (ConvState::AskingMargin, input) => {
            let Some(radius_km) = radius_from(&input) else {
                return Ok(unchanged(session, Reply::AskRadiusAgain));
            };
            let mut next = session.clone();
            next.params.radius_km = Some(radius_km);
            next.state = ConvState::AskingPosition;
            Ok(TransitionResult::new(next, Reply::AskPosition))
        }

        (ConvState::AskingPosition, Input::Location(location)) => {
            let mut next = session.clone();
            next.params.location = Some(location);
            match next.params.mode {
                Some(SearchMode::ByFlexZone) => start_search(next),
                Some(SearchMode::ByStation) => {
                    next.state = ConvState::AskingDateStart;
                    Ok(TransitionResult::new(next, Reply::AskWindowStart))
                }
                None => Err(TransitionError::IncompleteSearch(MissingParameter::Mode)),
            }
        }

        (ConvState::AskingDateStart, Input::Text(text)) => {
            let Some(start) = parse_timestamp(&text) else {
                return Ok(unchanged(session, Reply::NotUnderstood));
            };
            let mut next = session.clone();
            next.params.window_start = Some(start);
            next.state = ConvState::AskingDateEnd;
            Ok(TransitionResult::new(next, Reply::AskWindowEnd))
        }

        (ConvState::AskingDateEnd, Input::Text(text)) => {
            let Some(end) = parse_timestamp(&text) else {
                return Ok(unchanged(session, Reply::NotUnderstood));
            };
            let start = session
                .params
                .window_start
                .ok_or(TransitionError::IncompleteSearch(MissingParameter::WindowStart))?;
            if end <= start {
                return Ok(unchanged(session, Reply::WindowInverted));
            }
            let mut next = session.clone();
            next.params.window_end = Some(end);
            start_search(next)
        }

        // ============================================================
        // Fallback: nothing changes
        // ============================================================
        _ => Ok(unchanged(session, Reply::NotUnderstood)),
    }
}

/// Move into `Searching`, refusing when the active mode lacks a parameter
fn start_search(mut next: Session) -> Result<TransitionResult, TransitionError> {
    let request = next
        .params
        .to_request()
        .map_err(TransitionError::IncompleteSearch)?;
    next.state = ConvState::Searching;
    Ok(TransitionResult::new(next, Reply::SearchStarted(request.clone()))
        .with_effect(Effect::launch(request)))
}

fn unchanged(session: &Session, reply: Reply) -> TransitionResult {
    TransitionResult::new(session.clone(), reply)
}

/// A strictly positive, finite number of kilometres. Accepts `,` as decimal separator.
fn radius_from(input: &Input) -> Option<f64> {
    let Input::Text(text) = input else {
        return None;
    };
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r > 0.0)
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT).ok()
}
