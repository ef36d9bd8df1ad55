use super::*;

#[test]
fn connection_state_displays_pascal_case() {
    let cases = [
        (ConnectionState::Unspecified, "Unspecified"),
        (ConnectionState::New, "New"),
        (ConnectionState::Checking, "Checking"),
        (ConnectionState::Connected, "Connected"),
        (ConnectionState::Completed, "Completed"),
        (ConnectionState::Failed, "Failed"),
        (ConnectionState::Disconnected, "Disconnected"),
        (ConnectionState::Closed, "Closed"),
    ];
    for (state, expected) in cases {
        assert_eq!(state.to_string(), expected);
    }
}

#[test]
fn gathering_state_displays_lower_case() {
    let cases = [
        (GatheringState::Unspecified, "unspecified"),
        (GatheringState::New, "new"),
        (GatheringState::Gathering, "gathering"),
        (GatheringState::Complete, "complete"),
    ];
    for (state, expected) in cases {
        assert_eq!(state.to_string(), expected);
    }
}

#[test]
fn gathering_state_from_u8_round_trips() {
    assert_eq!(GatheringState::from(1u8), GatheringState::New);
    assert_eq!(GatheringState::from(2u8), GatheringState::Gathering);
    assert_eq!(GatheringState::from(3u8), GatheringState::Complete);
    assert_eq!(GatheringState::from(9u8), GatheringState::Unspecified);
}
