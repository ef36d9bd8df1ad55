use super::*;

#[test]
fn marshal_unmarshal_round_trips_a_host_candidate() {
    let c = Candidate::new_host("udp", "127.0.0.1".to_owned(), 9000, COMPONENT_RTP).unwrap();
    let wire = c.marshal();
    let back = Candidate::unmarshal(&wire).unwrap();
    assert_eq!(back.kind, CandidateType::Host);
    assert_eq!(back.address, "127.0.0.1");
    assert_eq!(back.port, 9000);
    assert_eq!(back.priority, c.priority);
}

#[test]
fn marshal_unmarshal_round_trips_related_address() {
    let related = CandidateRelatedAddress {
        address: "10.0.0.1".to_owned(),
        port: 5000,
    };
    let c = Candidate::new_server_reflexive("udp", "203.0.113.5".to_owned(), 4321, COMPONENT_RTP, related).unwrap();
    let wire = c.marshal();
    let back = Candidate::unmarshal(&wire).unwrap();
    assert_eq!(back.kind, CandidateType::ServerReflexive);
    let r = back.related_address.expect("related address preserved");
    assert_eq!(r.address, "10.0.0.1");
    assert_eq!(r.port, 5000);
}

#[test]
fn unmarshal_rejects_short_attribute() {
    assert!(Candidate::unmarshal("foo 1 udp").is_err());
}

#[test]
fn unmarshal_rejects_unknown_type() {
    let c = Candidate::new_host("udp", "127.0.0.1".to_owned(), 9000, COMPONENT_RTP).unwrap();
    let wire = c.marshal().replace("typ host", "typ bogus");
    assert!(Candidate::unmarshal(&wire).is_err());
}

#[test]
fn host_candidates_outrank_relayed_candidates() {
    let host = compute_priority(CandidateType::Host, NetworkType::UDP4, COMPONENT_RTP);
    let relay = compute_priority(CandidateType::Relay, NetworkType::UDP4, COMPONENT_RTP);
    assert!(host > relay);
}

#[test]
fn pair_priority_is_non_increasing_when_sorted() {
    let a = compute_pair_priority(100, 50, true);
    let b = compute_pair_priority(90, 80, true);
    let mut priorities = vec![a, b];
    priorities.sort_by(|x, y| y.cmp(x));
    assert!(priorities[0] >= priorities[1]);
}

#[test]
fn pair_priority_low_bit_follows_which_side_is_greater() {
    // RFC 8445 6.1.2.3's tie-break bit flips depending on which candidate
    // plays G (controlling) vs D (controlled), even for the same raw pair.
    let as_controlling = compute_pair_priority(100, 50, true);
    let as_controlled = compute_pair_priority(100, 50, false);
    assert_eq!(as_controlling, as_controlled + 1);
}

#[test]
fn candidate_pair_new_starts_frozen_and_unnominated() {
    let pair = CandidatePair::new(0, 0, 100, 100, true);
    assert_eq!(pair.state, PairState::Frozen);
    assert!(!pair.nominated);
    assert!(pair.first_request);
    assert_eq!(pair.retries, 0);
}
