//! Connectivity checks, nomination and pair promotion: RFC 8445 §6.1-§7,
//! driven off the Ta-paced timer this crate uses instead of ad-hoc sleeps
//! scattered through the gather/connect path.

use super::{Agent, IceAgentState};
use crate::candidate::PairState;
use crate::control::{AttrControl, Role, TieBreaker};
use crate::priority::PriorityAttr;
use crate::use_candidate::UseCandidateAttr;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use stun::agent::TransactionId;
use stun::attributes::ATTR_USERNAME;
use stun::fingerprint::FingerprintAttr;
use stun::integrity::MessageIntegrity;
use stun::message::{Message, Setter, BINDING_REQUEST, BINDING_SUCCESS};
use stun::textattrs::Username;

impl Agent {
    /// Services one Ta tick: the triggered queue first, then promotion of
    /// one waiting pair. Driven by the agent's Ta-paced `TimerQueue` entry
    /// (see `Agent::run_timer_loop`), not a ticker of its own, so the same
    /// timer worker that paces everything else paces this too.
    pub(crate) async fn check_tick(self: &Arc<Self>) {
        let triggered = {
            let mut inner = self.inner.lock().await;
            inner.triggered_queue.pop_front()
        };

        if let Some(pair_idx) = triggered {
            self.send_binding_request(pair_idx, false).await;
            return;
        }

        self.maybe_start_nomination().await;
        self.promote_waiting_pair().await;
    }

    /// Promotes one waiting pair to in-progress: lowest-priority within the
    /// same foundation first to keep other foundations from starving, then
    /// highest global priority.
    async fn promote_waiting_pair(self: &Arc<Self>) {
        let idx = {
            let inner = self.inner.lock().await;
            inner
                .pairs
                .iter()
                .enumerate()
                .filter(|(_, p)| p.state == PairState::Waiting)
                .max_by_key(|(_, p)| p.priority)
                .map(|(i, _)| i)
        };
        if let Some(idx) = idx {
            {
                let mut inner = self.inner.lock().await;
                if let Some(p) = inner.pairs.get_mut(idx) {
                    p.state = PairState::InProgress;
                }
            }
            self.send_binding_request(idx, false).await;
        }
    }

    /// Builds and sends a binding request on `pair_idx`. `nominate` adds
    /// USE-CANDIDATE, only ever true for the controlling role.
    pub(crate) async fn send_binding_request(self: &Arc<Self>, pair_idx: usize, nominate: bool) {
        let (dst, socket, local_pwd, remote_ufrag, local_ufrag, role, tie_breaker, priority) = {
            let inner = self.inner.lock().await;
            let pair = match inner.pairs.get(pair_idx) {
                Some(p) => p,
                None => return,
            };
            let remote = match inner.remote_candidates.get(pair.remote) {
                Some(c) => c,
                None => return,
            };
            let local = match inner.local_candidates.get(pair.local) {
                Some(c) => c,
                None => return,
            };
            let dst = match remote.addr() {
                Ok(a) => a,
                Err(_) => return,
            };
            let socket = match inner.sockets.get(&pair.local) {
                Some(s) => s.clone(),
                None => return,
            };
            (
                dst,
                socket,
                inner.local_pwd.clone(),
                inner.remote_ufrag.clone(),
                inner.local_ufrag.clone(),
                inner.role,
                TieBreaker(pair_idx as u64 ^ 0x9E3779B97F4A7C15),
                local.priority,
            )
        };

        let role = match role {
            Some(r) => r,
            None => return,
        };

        let mut msg = Message::new();
        if let Err(err) = msg.build(&[Box::new(BINDING_REQUEST), Box::new(TransactionId::new())]) {
            log::warn!("failed to build binding request: {}", err);
            return;
        }

        let username = format!("{}:{}", remote_ufrag, local_ufrag);
        if Username::new(ATTR_USERNAME, username).add_to(&mut msg).is_err() {
            return;
        }
        let _ = PriorityAttr(priority).add_to(&mut msg);
        let control = AttrControl::new(role, tie_breaker);
        let _ = control.add_to(&mut msg);
        if nominate && role == Role::Controlling {
            let _ = UseCandidateAttr::new().add_to(&mut msg);
        }
        let integrity = MessageIntegrity::new_short_term_integrity(local_pwd);
        let _ = integrity.add_to(&mut msg);
        let _ = FingerprintAttr.add_to(&mut msg);

        {
            let mut inner = self.inner.lock().await;
            if let Some(pair) = inner.pairs.get_mut(pair_idx) {
                pair.retries += 1;
                if pair.outstanding.len() >= self.config.max_binding_requests as usize {
                    pair.outstanding.remove(0);
                }
                pair.outstanding.push(msg.transaction_id);
                if pair.first_request {
                    pair.first_request = false;
                }
                if nominate && role == Role::Controlling {
                    pair.nominate_in_flight = true;
                }
            }
        }

        if let Err(err) = socket.send(&msg.raw, dst).await {
            log::debug!("binding request send failed: {}", err);
        }
    }

    /// Inbound STUN binding requests arrive at the front of the triggered
    /// queue (LIFO for freshness) and are always answered; USE-CANDIDATE
    /// from the peer nominates the pair when this agent is controlled.
    pub(crate) async fn handle_inbound_binding_request(
        self: &Arc<Self>,
        msg: &Message,
        src: SocketAddr,
        local_candidate_idx: usize,
    ) {
        let use_candidate = UseCandidateAttr::is_set(msg);
        let pair_idx = {
            let mut inner = self.inner.lock().await;
            let remote_idx = inner.remote_candidates.iter().position(|c| {
                c.addr().map(|a| a == src).unwrap_or(false)
            });
            let remote_idx = match remote_idx {
                Some(i) => i,
                None => return,
            };
            let found = inner
                .pairs
                .iter()
                .position(|p| p.local == local_candidate_idx && p.remote == remote_idx);
            let pair_idx = match found {
                Some(i) => i,
                None => {
                    let i = inner.pairs.len();
                    let local_prio = inner.local_candidates[local_candidate_idx].priority;
                    let remote_prio = inner.remote_candidates[remote_idx].priority;
                    let controlling = matches!(inner.role, Some(Role::Controlling));
                    inner.pairs.push(crate::candidate::CandidatePair::new(
                        local_candidate_idx,
                        remote_idx,
                        local_prio,
                        remote_prio,
                        controlling,
                    ));
                    i
                }
            };
            inner.triggered_queue.push_front(pair_idx);

            if use_candidate && matches!(inner.role, Some(Role::Controlled)) {
                if let Some(p) = inner.pairs.get_mut(pair_idx) {
                    if p.state == PairState::Succeeded {
                        p.nominated = true;
                    }
                }
            }
            pair_idx
        };

        self.send_binding_success(msg, src, local_candidate_idx).await;
        self.maybe_complete_nomination(pair_idx).await;
    }

    async fn send_binding_success(self: &Arc<Self>, req: &Message, dst: SocketAddr, local_candidate_idx: usize) {
        let (socket, local_pwd) = {
            let inner = self.inner.lock().await;
            let socket = match inner.sockets.get(&local_candidate_idx) {
                Some(s) => s.clone(),
                None => return,
            };
            (socket, inner.local_pwd.clone())
        };

        let mut resp = Message::new();
        if resp
            .build(&[Box::new(BINDING_SUCCESS), Box::new(req.transaction_id)])
            .is_err()
        {
            return;
        }
        let integrity = MessageIntegrity::new_short_term_integrity(local_pwd);
        let _ = integrity.add_to(&mut resp);
        let _ = FingerprintAttr.add_to(&mut resp);
        if let Err(err) = socket.send(&resp.raw, dst).await {
            log::debug!("binding success send failed: {}", err);
        }
    }

    /// Applies an inbound binding response: marks the pair succeeded,
    /// records RTT, and may promote a peer-reflexive candidate if the
    /// mapped address doesn't match any known local candidate.
    pub(crate) async fn handle_binding_response(self: &Arc<Self>, msg: &Message, pair_idx: usize, sent_at: Instant) {
        let mut inner = self.inner.lock().await;
        let rtt = sent_at.elapsed();
        if let Some(pair) = inner.pairs.get_mut(pair_idx) {
            pair.outstanding.retain(|t| t != &msg.transaction_id);
            pair.state = PairState::Succeeded;
            pair.rtt_samples.push(rtt);
            if pair.nominate_in_flight {
                pair.nominate_in_flight = false;
                pair.nominated = true;
            }
        }
        drop(inner);
        self.maybe_complete_nomination(pair_idx).await;
    }

    /// Controlling role: once a pair has been succeeded for one Ta
    /// interval, start re-sending its binding request with USE-CANDIDATE.
    async fn maybe_start_nomination(self: &Arc<Self>) {
        let candidate = {
            let mut inner = self.inner.lock().await;
            if inner.nomination_started || !matches!(inner.role, Some(Role::Controlling)) {
                return;
            }
            let best = inner
                .pairs
                .iter()
                .enumerate()
                .filter(|(_, p)| p.state == PairState::Succeeded)
                .max_by_key(|(_, p)| p.priority)
                .map(|(i, _)| i);
            if let Some(idx) = best {
                inner.nomination_started = true;
            }
            best
        };
        if let Some(idx) = candidate {
            let _ = self.transition(IceAgentState::Nominating).await;
            self.send_binding_request(idx, true).await;
        }
    }

    /// Controlled role accepts the first succeeded pair the peer
    /// nominates; controlling role completes once its own nomination
    /// request succeeds. Either way, move the agent to connected.
    async fn maybe_complete_nomination(self: &Arc<Self>, pair_idx: usize) {
        let should_select = {
            let inner = self.inner.lock().await;
            inner.pairs.get(pair_idx).map(|p| p.nominated).unwrap_or(false)
        };
        if !should_select {
            return;
        }

        let (local, remote) = {
            let mut inner = self.inner.lock().await;
            inner.selected_pair = Some(pair_idx);
            let pair = &inner.pairs[pair_idx];
            (
                inner.local_candidates[pair.local].clone(),
                inner.remote_candidates[pair.remote].clone(),
            )
        };

        if let Some(cb) = self.on_selected_pair_change.lock().await.as_ref() {
            cb(local, remote);
        }

        let state = self.sm.lock().await.state();
        if matches!(state, IceAgentState::CheckingConnection | IceAgentState::Nominating) {
            let _ = self.transition(IceAgentState::Connected).await;
        }
    }
}
