pub mod candidate_related_address;
pub mod candidate_type;

#[cfg(test)]
mod candidate_test;

use crate::errors::*;
use crate::network_type::{determine_network_type, NetworkType};
use crate::turn_conn::TurnConnection;
pub use candidate_related_address::CandidateRelatedAddress;
pub use candidate_type::{contains_candidate_type, CandidateType};

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::SystemTime;

use rand::{thread_rng, Rng};
use util::Error;

pub(crate) const RECEIVE_MTU: usize = 8192;
pub(crate) const DEFAULT_LOCAL_PREFERENCE: u16 = 65535;

// COMPONENT_RTP indicates that the candidate is used for RTP. This crate
// never negotiates RTCP-mux-less media so component is always 1.
pub(crate) const COMPONENT_RTP: u16 = 1;

pub const MAX_LOCAL_CANDIDATES: usize = 100;
pub const MAX_REMOTE_CANDIDATES: usize = 100;
pub const MAX_RELAYED_CANDIDATES: usize = 4;

/// Lifecycle state of a single candidate, independent of any pair it takes
/// part in: `new` until it has been used in at least one successful check,
/// `invalid` once its owning transport (e.g. a failed `TurnConnection`) is
/// gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    New,
    Valid,
    Invalid,
}

impl Default for CandidateState {
    fn default() -> Self {
        CandidateState::New
    }
}

/// A network endpoint offered by either side of a session.
///
/// Earlier generations of this crate modeled each candidate kind as its own
/// struct behind `Arc<dyn Candidate>`; that bought nothing here because every
/// kind carries the same fields (only the `kind` and the optional relay
/// handle differ), so a single tagged struct replaces the four-way trait
/// hierarchy.
#[derive(Clone)]
pub struct Candidate {
    pub id: String,
    pub kind: CandidateType,
    pub address: String,
    pub port: u16,
    pub network_type: NetworkType,
    pub foundation: String,
    pub component: u16,
    pub priority: u32,
    pub related_address: Option<CandidateRelatedAddress>,
    pub state: CandidateState,
    /// Local-only: has this candidate been surfaced to the signaling layer yet?
    pub reported: bool,
    pub(crate) relay: Option<Arc<TurnConnection>>,
    pub(crate) last_received: Option<SystemTime>,
    pub(crate) last_sent: Option<SystemTime>,
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Candidate{{ id: {}, kind: {}, addr: {}:{}, prio: {} }}",
            self.id, self.kind, self.address, self.port, self.priority
        )
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{}{}",
            self.kind,
            self.address,
            self.port,
            self.related_address
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_default()
        )
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Candidate) -> bool {
        self.kind == other.kind
            && self.address == other.address
            && self.port == other.port
            && self.network_type == other.network_type
            && self.related_address == other.related_address
    }
}

impl Candidate {
    fn new(
        kind: CandidateType,
        network: &str,
        address: String,
        port: u16,
        component: u16,
        foundation: String,
        related_address: Option<CandidateRelatedAddress>,
    ) -> Result<Self, Error> {
        let ip: IpAddr = address
            .parse()
            .map_err(|_| ERR_ADDRESS_PARSE_FAILED.to_owned())?;
        let network_type = determine_network_type(network, &ip)?;
        let priority = compute_priority(kind, network_type, component);
        Ok(Candidate {
            id: generate_candidate_id(),
            kind,
            address,
            port,
            network_type,
            foundation,
            component,
            priority,
            related_address,
            state: CandidateState::default(),
            reported: false,
            relay: None,
            last_received: None,
            last_sent: None,
        })
    }

    pub fn new_host(network: &str, address: String, port: u16, component: u16) -> Result<Self, Error> {
        let foundation = format!("host_{}_{}", network, address);
        Candidate::new(CandidateType::Host, network, address, port, component, foundation, None)
    }

    pub fn new_server_reflexive(
        network: &str,
        address: String,
        port: u16,
        component: u16,
        related_address: CandidateRelatedAddress,
    ) -> Result<Self, Error> {
        let foundation = format!("srflx_{}_{}", network, related_address.address);
        Candidate::new(
            CandidateType::ServerReflexive,
            network,
            address,
            port,
            component,
            foundation,
            Some(related_address),
        )
    }

    pub fn new_peer_reflexive(
        network: &str,
        address: String,
        port: u16,
        component: u16,
        related_address: CandidateRelatedAddress,
    ) -> Result<Self, Error> {
        let foundation = format!("prflx_{}_{}", network, related_address.address);
        Candidate::new(
            CandidateType::PeerReflexive,
            network,
            address,
            port,
            component,
            foundation,
            Some(related_address),
        )
    }

    pub fn new_relay(
        network: &str,
        address: String,
        port: u16,
        component: u16,
        related_address: CandidateRelatedAddress,
        relay: Arc<TurnConnection>,
    ) -> Result<Self, Error> {
        let foundation = format!("relay_{}_{}", network, related_address.address);
        let mut c = Candidate::new(
            CandidateType::Relay,
            network,
            address,
            port,
            component,
            foundation,
            Some(related_address),
        )?;
        c.relay = Some(relay);
        Ok(c)
    }

    pub fn addr(&self) -> Result<SocketAddr, Error> {
        let ip: IpAddr = self
            .address
            .parse()
            .map_err(|_| ERR_ADDRESS_PARSE_FAILED.to_owned())?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn seen(&mut self, outbound: bool) {
        let now = SystemTime::now();
        if outbound {
            self.last_sent = Some(now);
        } else {
            self.last_received = Some(now);
        }
    }

    /// RFC 5245 §15.1 candidate-attribute wire form, restricted to the
    /// fields this crate actually round-trips (no tcptype: every candidate
    /// here is UDP, relayed traffic aside, which travels over its own TURN
    /// allocation instead of being expressed as a TCP candidate).
    pub fn marshal(&self) -> String {
        let mut s = format!(
            "{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component,
            self.network_type.network_short(),
            self.priority,
            self.address,
            self.port,
            self.kind,
        );
        if let Some(rel) = &self.related_address {
            s.push_str(&format!(" raddr {} rport {}", rel.address, rel.port));
        }
        s
    }

    pub fn unmarshal(raw: &str) -> Result<Candidate, Error> {
        let split: Vec<&str> = raw.split_whitespace().collect();
        if split.len() < 8 {
            return Err(Error::new(format!(
                "{} ({})",
                *ERR_ATTRIBUTE_TOO_SHORT_ICE_CANDIDATE,
                split.len()
            )));
        }

        let foundation = split[0].to_owned();
        let component: u16 = split[1].parse().map_err(|_| ERR_PARSE_COMPONENT.to_owned())?;
        let network = split[2].to_owned();
        let priority: u32 = split[3].parse().map_err(|_| ERR_PARSE_PRIORITY.to_owned())?;
        let address = split[4].to_owned();
        let port: u16 = split[5].parse().map_err(|_| ERR_PARSE_PORT.to_owned())?;
        let typ = split[7];

        let mut related_address = None;
        if split.len() > 9 && split[8] == "raddr" {
            let rel_addr = split[9].to_owned();
            let rel_port = if split.len() > 11 && split[10] == "rport" {
                split[11].parse().map_err(|_| ERR_PARSE_RELATED_ADDR.to_owned())?
            } else {
                0
            };
            related_address = Some(CandidateRelatedAddress {
                address: rel_addr,
                port: rel_port,
            });
        }

        let kind = match typ {
            "host" => CandidateType::Host,
            "srflx" => CandidateType::ServerReflexive,
            "prflx" => CandidateType::PeerReflexive,
            "relay" => CandidateType::Relay,
            _ => return Err(Error::new(format!("{} ({})", *ERR_UNKNOWN_CANDIDATE_TYPE, typ))),
        };

        let ip: IpAddr = address.parse().map_err(|_| ERR_ADDRESS_PARSE_FAILED.to_owned())?;
        let network_type = determine_network_type(&network, &ip)?;

        Ok(Candidate {
            id: generate_candidate_id(),
            kind,
            address,
            port,
            network_type,
            foundation,
            component,
            priority,
            related_address,
            state: CandidateState::default(),
            reported: false,
            relay: None,
            last_received: None,
            last_sent: None,
        })
    }
}

/// Candidate ids are a 64-bit random value rendered as lowercase hex, per the
/// C SDK's `UINT64 candidateId` (not the RFC 5245 `candidate:` foundation
/// string, which this crate tracks separately in `foundation`).
pub(crate) fn generate_candidate_id() -> String {
    let v: u64 = thread_rng().gen();
    format!("{:016x}", v)
}

/// RFC 8445 §5.1.2.1 recommended priority formula:
/// priority = (2^24)*type_pref + (2^8)*local_pref + (256 - component_id)
pub(crate) fn compute_priority(kind: CandidateType, network_type: NetworkType, component: u16) -> u32 {
    let type_pref = kind.preference() as u32;
    let local_pref = DEFAULT_LOCAL_PREFERENCE as u32;
    let _ = network_type;
    (type_pref << 24) + (local_pref << 8) + (256 - component as u32)
}

/// State of a connectivity check run against one candidate pair, RFC 8445
/// §6.1.2.6 plus the `Frozen` starting state the spec calls out explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Frozen,
    Waiting,
    InProgress,
    Succeeded,
    Failed,
}

impl fmt::Display for PairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            PairState::Frozen => "frozen",
            PairState::Waiting => "waiting",
            PairState::InProgress => "in-progress",
            PairState::Succeeded => "succeeded",
            PairState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A candidate pair, addressed by index into the agent's local/remote
/// candidate arenas rather than by `Arc<dyn Candidate>` pointer — the arena
/// + index approach this crate's REDESIGN section asks for, so pairs stay
/// plain data and don't need their own reference counting.
#[derive(Debug, Clone)]
pub struct CandidatePair {
    pub local: usize,
    pub remote: usize,
    pub priority: u64,
    pub state: PairState,
    pub nominated: bool,
    /// Set whenever a USE-CANDIDATE binding request has been sent on this
    /// pair and not yet answered; the controlling agent's binding-response
    /// handler checks this to know the just-succeeded request was the
    /// nomination itself rather than an ordinary connectivity check.
    pub nominate_in_flight: bool,
    /// True until the first binding request has been sent on this pair;
    /// gates the controlling-agent USE-CANDIDATE re-send rule.
    pub first_request: bool,
    pub retries: u16,
    /// Bounded to the same budget as the retry count (`MAX_BINDING_REQUESTS`),
    /// per the C SDK's `MAX_STORED_TRANSACTION_ID_COUNT`.
    pub outstanding: Vec<stun::agent::TransactionId>,
    pub rtt_samples: Vec<std::time::Duration>,
}

impl CandidatePair {
    pub fn new(local: usize, remote: usize, local_priority: u32, remote_priority: u32, controlling: bool) -> Self {
        CandidatePair {
            local,
            remote,
            priority: compute_pair_priority(local_priority, remote_priority, controlling),
            state: PairState::Frozen,
            nominated: false,
            nominate_in_flight: false,
            first_request: true,
            retries: 0,
            outstanding: Vec::new(),
            rtt_samples: Vec::new(),
        }
    }

    pub fn cumulative_rtt(&self) -> std::time::Duration {
        self.rtt_samples.iter().sum()
    }
}

/// RFC 8445 §6.1.2.3: pair priority = 2^32*MIN(G,D) + 2*MAX(G,D) + (G>D?1:0),
/// where G is the controlling agent's candidate priority and D the
/// controlled agent's.
pub(crate) fn compute_pair_priority(local_priority: u32, remote_priority: u32, controlling: bool) -> u64 {
    let (g, d) = if controlling {
        (local_priority, remote_priority)
    } else {
        (remote_priority, local_priority)
    };
    ((1u64 << 32) - 1) * std::cmp::min(g, d) as u64 + 2 * std::cmp::max(g, d) as u64 + if g > d { 1 } else { 0 }
}
