use super::*;

#[test]
fn determine_network_type_matches_scheme_and_family() {
    let ipv4: IpAddr = "192.168.0.1".parse().unwrap();
    let ipv6: IpAddr = "fe80::a3:6ff:fec4:5454".parse().unwrap();

    assert_eq!(determine_network_type("udp", &ipv4).unwrap(), NetworkType::UDP4);
    assert_eq!(determine_network_type("UDP", &ipv4).unwrap(), NetworkType::UDP4);
    assert_eq!(determine_network_type("udp", &ipv6).unwrap(), NetworkType::UDP6);
    assert_eq!(determine_network_type("tcp", &ipv4).unwrap(), NetworkType::TCP4);
    assert_eq!(determine_network_type("tcp", &ipv6).unwrap(), NetworkType::TCP6);
}

#[test]
fn determine_network_type_rejects_unknown_scheme() {
    let ipv6: IpAddr = "fe80::a3:6ff:fec4:5454".parse().unwrap();
    assert!(determine_network_type("sctp", &ipv6).is_err());
}

#[test]
fn is_udp_is_tcp_partition_the_four_variants() {
    assert!(NetworkType::UDP4.is_udp() && !NetworkType::UDP4.is_tcp());
    assert!(NetworkType::UDP6.is_udp() && !NetworkType::UDP6.is_tcp());
    assert!(NetworkType::TCP4.is_tcp() && !NetworkType::TCP4.is_udp());
    assert!(NetworkType::TCP6.is_tcp() && !NetworkType::TCP6.is_udp());
}

#[test]
fn to_string_matches_short_network_names() {
    assert_eq!(NetworkType::UDP4.to_string(), "udp4");
    assert_eq!(NetworkType::TCP6.to_string(), "tcp6");
}
