use super::*;
use stun::message::BINDING_REQUEST;

#[test]
fn get_from_round_trips_through_a_message() {
    let mut m = Message::new();
    let mut p = PriorityAttr::default();
    assert!(p.get_from(&m).is_err(), "PRIORITY absent should error");

    let original = PriorityAttr(4_294_967_295);
    m.build(&[Box::new(BINDING_REQUEST), Box::new(original)]).unwrap();

    let mut decoded = Message::new();
    decoded.write(&m.raw).unwrap();

    let mut p1 = PriorityAttr::default();
    p1.get_from(&decoded).unwrap();
    assert_eq!(p1, original);
}

#[test]
fn get_from_rejects_wrong_size() {
    let mut m = Message::new();
    m.add(ATTR_PRIORITY, &[0; 100]);
    let mut p = PriorityAttr::default();
    assert!(p.get_from(&m).is_err());
}
