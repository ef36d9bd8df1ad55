use super::*;
use stun::message::BINDING_REQUEST;

#[test]
fn is_set_reflects_attribute_presence() {
    let mut m = Message::new();
    assert!(!UseCandidateAttr::is_set(&m), "should not be set on a fresh message");

    m.build(&[Box::new(BINDING_REQUEST), Box::new(UseCandidateAttr::new())]).unwrap();

    let mut decoded = Message::new();
    decoded.write(&m.raw).unwrap();
    assert!(UseCandidateAttr::is_set(&decoded), "should be set after round-trip");
}
