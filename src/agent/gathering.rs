//! Candidate gathering: host, server-reflexive, and relayed candidates, and
//! the pair-formation step re-run whenever either candidate list changes.

use super::{Agent, CANDIDATE_BATCH_SIZE, GATHERING_TIMEOUT};
use crate::candidate::{
    compute_pair_priority, Candidate, CandidatePair, CandidateRelatedAddress, MAX_LOCAL_CANDIDATES, MAX_PAIRS,
    MAX_RELAYED_CANDIDATES,
};
use crate::error::Error;
use crate::socket::SocketConnection;
use crate::state::GatheringState;
use crate::turn_conn::TurnConnection;
use crate::url::SchemeType;
use crate::util::{get_xormapped_addr, listen_udp_in_port_range};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use turn::client::{Client as TurnClient, ClientConfig as TurnClientConfig};

impl Agent {
    /// Begins host/srflx/relay discovery. Ends when either all probes
    /// resolve or `GATHERING_TIMEOUT` elapses, whichever is first; either
    /// way a final `on_candidate(None)` marks gathering complete.
    pub async fn start_gathering(self: &Arc<Self>) -> Result<(), Error> {
        {
            let mut inner = self.inner.lock().await;
            if inner.gathering_state == GatheringState::Gathering {
                return Err(Error::InvalidState("already gathering".into()));
            }
            inner.gathering_state = GatheringState::Gathering;
        }

        let agent = self.clone();
        tokio::spawn(async move {
            let _ = tokio::time::timeout(GATHERING_TIMEOUT, agent.gather_all()).await;
            let mut inner = agent.inner.lock().await;
            inner.gathering_state = GatheringState::Complete;
            drop(inner);
            if let Some(cb) = agent.on_candidate.lock().await.as_ref() {
                cb(None);
            }
        });

        Ok(())
    }

    async fn gather_all(self: &Arc<Self>) {
        self.gather_host().await;
        self.gather_server_reflexive().await;
        self.gather_relay().await;
    }

    async fn gather_host(self: &Arc<Self>) {
        // A production agent enumerates every up, non-loopback interface;
        // this crate binds one UDP socket per requested network type on the
        // loopback address instead. A wildcard bind would report 0.0.0.0 as
        // the candidate's own address, which isn't a usable destination for
        // the peer's connectivity checks, so the concrete loopback address
        // is used even though it narrows reachability to same-host peers.
        for network_type in self.config.network_types.clone() {
            if network_type.is_tcp() {
                continue; // TCP host candidates are out of scope here
            }
            let bind_ip = if network_type.is_ipv6() { "::1" } else { "127.0.0.1" };
            let laddr: SocketAddr = format!("{}:0", bind_ip).parse().unwrap();
            let conn = match listen_udp_in_port_range(0, 0, laddr).await {
                Ok(c) => Arc::new(c),
                Err(err) => {
                    log::warn!("failed to bind host candidate socket: {}", err);
                    continue;
                }
            };
            let local_addr = match conn.local_addr().await {
                Ok(a) => a,
                Err(_) => continue,
            };

            let candidate = match Candidate::new_host(
                network_type.network_short().as_str(),
                local_addr.ip().to_string(),
                local_addr.port(),
                crate::candidate::COMPONENT_RTP,
            ) {
                Ok(c) => c,
                Err(err) => {
                    log::warn!("failed to build host candidate: {}", err);
                    continue;
                }
            };

            self.add_local_candidate(candidate, Arc::new(SocketConnection::new(conn, None))).await;
        }
    }

    async fn gather_server_reflexive(self: &Arc<Self>) {
        let urls: Vec<_> = self
            .config
            .urls
            .iter()
            .filter(|u| matches!(u.scheme(), SchemeType::STUN | SchemeType::STUNS))
            .cloned()
            .collect();
        if urls.is_empty() {
            return;
        }

        let sockets: Vec<(usize, Arc<dyn util::Conn + Send + Sync>)> = {
            let inner = self.inner.lock().await;
            inner
                .local_candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.kind == crate::candidate::CandidateType::Host)
                .filter_map(|(idx, _)| inner.sockets.get(&idx).map(|s| (idx, s.local_conn())))
                .collect()
        };

        for url in urls {
            let server_addr: SocketAddr = match format!("{}:{}", url.host(), url.port()).parse() {
                Ok(a) => a,
                Err(_) => continue,
            };
            for (_, conn) in &sockets {
                let mapped = match get_xormapped_addr(conn, server_addr, Duration::from_secs(3)).await {
                    Ok(m) => m,
                    Err(err) => {
                        log::debug!("srflx probe to {} failed: {}", server_addr, err);
                        continue;
                    }
                };
                let host_local = match conn.local_addr().await {
                    Ok(a) => a,
                    Err(_) => continue,
                };
                let related = CandidateRelatedAddress {
                    address: host_local.ip().to_string(),
                    port: host_local.port(),
                };
                let candidate = match Candidate::new_server_reflexive(
                    if mapped.ip.is_ipv4() { "udp4" } else { "udp6" },
                    mapped.ip.to_string(),
                    mapped.port,
                    crate::candidate::COMPONENT_RTP,
                    related,
                ) {
                    Ok(c) => c,
                    Err(_) => continue,
                };
                self.add_local_candidate(candidate, Arc::new(SocketConnection::new(conn.clone(), None))).await;
            }
        }
    }

    async fn gather_relay(self: &Arc<Self>) {
        let urls: Vec<_> = self
            .config
            .urls
            .iter()
            .filter(|u| matches!(u.scheme(), SchemeType::TURN | SchemeType::TURNS))
            .cloned()
            .collect();

        for url in urls.into_iter().take(MAX_RELAYED_CANDIDATES) {
            let server_addr: SocketAddr = match format!("{}:{}", url.host(), url.port()).parse() {
                Ok(a) => a,
                Err(_) => continue,
            };
            let turn_conn = Arc::new(TurnConnection::new(server_addr));
            {
                let mut inner = self.inner.lock().await;
                inner.turn_conns.push(turn_conn.clone());
            }

            let conn = match listen_udp_in_port_range(0, 0, "0.0.0.0:0".parse().unwrap()).await {
                Ok(c) => Arc::new(c),
                Err(err) => {
                    log::warn!("failed to bind relay socket: {}", err);
                    continue;
                }
            };

            let client_cfg = TurnClientConfig {
                stun_serv_addr: server_addr.to_string(),
                turn_serv_addr: server_addr.to_string(),
                username: url.username().to_owned(),
                password: url.password().to_owned(),
                realm: String::new(),
                software: String::new(),
                rto_in_ms: 0,
                conn: conn.clone(),
            };

            let client = match TurnClient::new(client_cfg).await {
                Ok(c) => Arc::new(c),
                Err(err) => {
                    log::warn!("turn client setup failed for {}: {}", server_addr, err);
                    continue;
                }
            };

            if let Err(err) = client.listen().await {
                log::warn!("turn client listen failed for {}: {}", server_addr, err);
                continue;
            }

            let relayed = match client.allocate().await {
                Ok(addr) => addr,
                Err(err) => {
                    log::warn!("turn allocate failed for {}: {}", server_addr, err);
                    continue;
                }
            };

            turn_conn.attach(client, relayed, Duration::from_secs(600)).await;
            turn_conn.mark_ready().await;

            let host_local = match conn.local_addr().await {
                Ok(a) => a,
                Err(_) => continue,
            };
            let related = CandidateRelatedAddress {
                address: host_local.ip().to_string(),
                port: host_local.port(),
            };
            let candidate = match Candidate::new_relay(
                if relayed.is_ipv4() { "udp4" } else { "udp6" },
                relayed.ip().to_string(),
                relayed.port(),
                crate::candidate::COMPONENT_RTP,
                related,
                turn_conn.clone(),
            ) {
                Ok(c) => c,
                Err(_) => continue,
            };
            self.add_local_candidate(candidate, Arc::new(SocketConnection::new(conn, Some(turn_conn)))).await;
        }
    }

    /// Adds a local candidate, registers its transport with the connection
    /// listener, and reports it upstream. Candidates are dispatched to the
    /// caller in batches of `CANDIDATE_BATCH_SIZE`; this is a single
    /// candidate at a time here because each one resolves independently,
    /// but the cap on outstanding un-reported candidates is enforced below.
    async fn add_local_candidate(self: &Arc<Self>, candidate: Candidate, socket: Arc<SocketConnection>) {
        let idx = {
            let mut inner = self.inner.lock().await;
            if inner.local_candidates.len() >= MAX_LOCAL_CANDIDATES {
                return;
            }
            let idx = inner.local_candidates.len();
            inner.local_candidates.push(candidate.clone());
            inner.sockets.insert(idx, socket.clone());
            idx
        };

        if let Err(err) = self.listener.add(idx, socket.local_conn()).await {
            log::warn!("failed to register candidate socket with listener: {}", err);
        }

        let mut reported = candidate;
        reported.reported = true;
        {
            let mut inner = self.inner.lock().await;
            if let Some(c) = inner.local_candidates.get_mut(idx) {
                c.reported = true;
            }
        }

        if let Some(cb) = self.on_candidate.lock().await.as_ref() {
            cb(Some(reported));
        }

        self.reform_pairs().await;
    }

    /// Re-forms the cartesian product of local × remote candidates on every
    /// candidate-list change: filters by matching address family and
    /// transport, computes pair priority using the controlling-agent rule,
    /// and keeps only the highest-priority `MAX_PAIRS` entries.
    pub(crate) async fn reform_pairs(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        let controlling = matches!(inner.role, Some(crate::control::Role::Controlling));
        let relay_only = self.config.relay_only;

        let mut new_pairs = Vec::new();
        for (li, local) in inner.local_candidates.iter().enumerate() {
            if relay_only && local.kind != crate::candidate::CandidateType::Relay {
                continue;
            }
            for (ri, remote) in inner.remote_candidates.iter().enumerate() {
                if local.network_type.is_ipv4() != remote.network_type.is_ipv4() {
                    continue;
                }
                if local.network_type.is_tcp() != remote.network_type.is_tcp() {
                    continue;
                }
                let already_exists = inner.pairs.iter().any(|p| p.local == li && p.remote == ri);
                if already_exists {
                    continue;
                }
                new_pairs.push(CandidatePair::new(li, ri, local.priority, remote.priority, controlling));
            }
        }

        inner.pairs.extend(new_pairs);
        inner.pairs.sort_by(|a, b| b.priority.cmp(&a.priority));
        if inner.pairs.len() > MAX_PAIRS {
            inner.pairs.truncate(MAX_PAIRS);
        }

        // mark the lowest-priority waiting pairs as eligible for promotion
        for pair in inner.pairs.iter_mut() {
            if pair.state == crate::candidate::PairState::Frozen {
                pair.state = crate::candidate::PairState::Waiting;
            }
        }
    }
}
