//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::event::{Command, Input};
use super::reply::Reply;
use super::state::*;
use super::transition::*;
use super::Effect;
use chrono::NaiveDateTime;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_state() -> impl Strategy<Value = ConvState> {
    prop_oneof![
        Just(ConvState::NotSearching),
        Just(ConvState::AskingType),
        Just(ConvState::AskingMargin),
        Just(ConvState::AskingPosition),
        Just(ConvState::AskingDateStart),
        Just(ConvState::AskingDateEnd),
        Just(ConvState::Searching),
        Just(ConvState::EndSearch),
    ]
}

fn arb_mode() -> impl Strategy<Value = SearchMode> {
    prop_oneof![Just(SearchMode::ByFlexZone), Just(SearchMode::ByStation)]
}

fn arb_location() -> impl Strategy<Value = Location> {
    (-90.0f64..90.0, -180.0f64..180.0).prop_map(|(lat, lon)| Location::new(lat, lon))
}

fn arb_timestamp() -> impl Strategy<Value = NaiveDateTime> {
    (0i64..72).prop_map(|hours| {
        NaiveDateTime::parse_from_str("2024-01-01 00:00", DATE_FORMAT).unwrap()
            + chrono::Duration::hours(hours)
    })
}

fn arb_params() -> impl Strategy<Value = SearchParams> {
    (
        proptest::option::of(arb_mode()),
        proptest::option::of(-5.0f64..50.0),
        proptest::option::of(arb_location()),
        proptest::option::of(arb_timestamp()),
        proptest::option::of(arb_timestamp()),
    )
        .prop_map(
            |(mode, radius_km, location, window_start, window_end)| SearchParams {
                mode,
                radius_km,
                location,
                window_start,
                window_end,
            },
        )
}

fn arb_complete_params() -> impl Strategy<Value = SearchParams> {
    (arb_mode(), 0.5f64..50.0, arb_location(), arb_timestamp(), 1i64..48).prop_map(
        |(mode, radius_km, location, start, hours)| SearchParams {
            mode: Some(mode),
            radius_km: Some(radius_km),
            location: Some(location),
            window_start: Some(start),
            window_end: Some(start + chrono::Duration::hours(hours)),
        },
    )
}

fn arb_session() -> impl Strategy<Value = Session> {
    (arb_state(), arb_params()).prop_map(|(state, params)| Session {
        chat_id: ChatId(7),
        state,
        params,
    })
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("flex".to_string()),
        Just("station".to_string()),
        Just("5".to_string()),
        Just("-2".to_string()),
        Just("2024-01-01 10:00".to_string()),
        Just("2024-01-01 08:00".to_string()),
        Just("2024-01-01 12:00".to_string()),
        "[a-z0-9 ]{0,12}",
    ]
}

fn arb_input() -> impl Strategy<Value = Input> {
    prop_oneof![
        Just(Input::Command(Command::BeginSearch)),
        Just(Input::Command(Command::RepeatSearch)),
        Just(Input::Command(Command::Help)),
        arb_text().prop_map(Input::Text),
        arb_location().prop_map(Input::Location),
        Just(Input::Other),
    ]
}

fn is_non_mutating_reply(reply: &Reply) -> bool {
    matches!(
        reply,
        Reply::Help
            | Reply::NotUnderstood
            | Reply::AskRadiusAgain
            | Reply::WindowInverted
            | Reply::RepeatUnavailable
    )
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Invariant 1: a session reached from scratch is never Searching with
    // parameters missing for its mode
    #[test]
    fn prop_searching_always_has_complete_params(
        inputs in proptest::collection::vec(arb_input(), 0..30)
    ) {
        let mut session = Session::new(ChatId(7));

        for input in inputs {
            let result = transition(&session, input);
            prop_assert!(result.is_ok(), "Reachable session errored: {:?}", session);
            session = result.unwrap().new_session;
            if session.state == ConvState::Searching {
                prop_assert!(
                    session.params.to_request().is_ok(),
                    "Searching with incomplete params: {:?}",
                    session.params
                );
            }
        }
    }

    // Invariant 2: a launch happens exactly when Searching is entered
    #[test]
    fn prop_launch_iff_entering_searching(session in arb_session(), input in arb_input()) {
        if let Ok(result) = transition(&session, input) {
            let launches = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::LaunchSearch { .. }))
                .count();
            let entering = session.state != ConvState::Searching
                && result.new_session.state == ConvState::Searching;
            prop_assert_eq!(launches, usize::from(entering));
        }
    }

    // Invariant 3: a cancel happens exactly when Searching is left
    #[test]
    fn prop_cancel_iff_leaving_searching(session in arb_session(), input in arb_input()) {
        if let Ok(result) = transition(&session, input) {
            let cancels = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::CancelSearch))
                .count();
            let leaving = session.state == ConvState::Searching
                && result.new_session.state != ConvState::Searching;
            prop_assert_eq!(cancels, usize::from(leaving));
            if leaving {
                prop_assert_eq!(result.new_session.state, ConvState::AskingType);
            }
        }
    }

    // Invariant 4: fallbacks, re-prompts and help leave the session untouched
    #[test]
    fn prop_rejections_do_not_mutate(session in arb_session(), input in arb_input()) {
        if let Ok(result) = transition(&session, input) {
            if is_non_mutating_reply(&result.reply) {
                prop_assert_eq!(&result.new_session, &session);
                prop_assert!(result.effects.is_empty());
            }
        }
    }

    // Invariant 5: repeat relaunches with the exact stored parameters
    #[test]
    fn prop_repeat_reproduces_previous_request(params in arb_complete_params()) {
        let session = Session {
            chat_id: ChatId(7),
            state: ConvState::EndSearch,
            params: params.clone(),
        };
        let result = transition(&session, Input::Command(Command::RepeatSearch)).unwrap();
        prop_assert_eq!(result.new_session.state, ConvState::Searching);
        prop_assert_eq!(&result.new_session.params, &params);
        prop_assert_eq!(
            result.effects,
            vec![Effect::launch(params.to_request().unwrap())]
        );
    }

    // Invariant 6: the chat a session answers into never changes
    #[test]
    fn prop_chat_id_is_stable(session in arb_session(), input in arb_input()) {
        if let Ok(result) = transition(&session, input) {
            prop_assert_eq!(result.new_session.chat_id, session.chat_id);
        }
    }
}
