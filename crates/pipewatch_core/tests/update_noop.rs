use chrono::{DateTime, Utc};
use pipewatch_core::{update, AppState, Msg, PollSettings};

#[test]
fn update_is_noop() {
    let state = AppState::new(PollSettings::default());
    let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    let (next, effects) = update(state.clone(), Msg::NoOp, now);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
