//! Keepalive, disconnect/failure detection, and the inbound-packet
//! dispatch loop that feeds both connectivity checks and keepalive state
//! off the same `ConnectionListener` stream.

use super::{Agent, IceAgentState};
use crate::candidate::PairState;
use crate::use_candidate::UseCandidateAttr;

use std::sync::Arc;
use std::time::Instant;

use stun::agent::TransactionId;
use stun::attributes::BINDING_INDICATION;
use stun::message::{Message, MessageClass, Setter, BINDING_REQUEST as _};

impl Agent {
    /// Sends a STUN binding indication on the selected pair while connected.
    /// Driven by the agent's 15s keepalive `TimerQueue` entry.
    pub(crate) async fn keepalive_tick(self: &Arc<Self>) {
        let state = self.sm.lock().await.state();
        let selected = self.inner.lock().await.selected_pair;

        if let Some(idx) = selected {
            if matches!(state, IceAgentState::Connected | IceAgentState::Ready) {
                self.send_keepalive_indication(idx).await;
            }
        }
    }

    /// Evaluates the disconnect/failed timeout against the last inbound
    /// packet's timestamp. Driven by the Ta-paced check timer (not the
    /// slower keepalive one) so detection resolves within one Ta interval,
    /// per invariant 10.
    pub(crate) async fn check_liveness(self: &Arc<Self>) {
        let state = self.sm.lock().await.state();
        let last_inbound = self.inner.lock().await.last_inbound;

        if let Some(last) = last_inbound {
            let since = last.elapsed();
            if since > self.config.failed_timeout && matches!(state, IceAgentState::Disconnected) {
                self.sm.lock().await.force_state(IceAgentState::Failed);
                if let Some(cb) = self.on_state_change.lock().await.as_ref() {
                    cb(IceAgentState::Failed.into());
                }
            } else if since > self.config.disconnected_timeout
                && matches!(state, IceAgentState::Connected | IceAgentState::Ready)
            {
                let _ = self.transition(IceAgentState::Disconnected).await;
            }
        }
    }

    async fn send_keepalive_indication(self: &Arc<Self>, pair_idx: usize) {
        let (dst, socket) = {
            let inner = self.inner.lock().await;
            let pair = match inner.pairs.get(pair_idx) {
                Some(p) => p,
                None => return,
            };
            let remote = match inner.remote_candidates.get(pair.remote) {
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
            (dst, socket)
        };

        let mut msg = Message::new();
        if msg
            .build(&[Box::new(BINDING_INDICATION), Box::new(TransactionId::new())])
            .is_err()
        {
            return;
        }
        if let Err(err) = socket.send(&msg.raw, dst).await {
            log::debug!("keepalive indication send failed: {}", err);
        }
    }

    /// Single long-running task that reads every inbound packet the
    /// connection listener surfaces and routes it: STUN goes to the
    /// connectivity-check handlers, everything else just refreshes the
    /// liveness timestamp for the caller's upper transport layers to
    /// consume via `send`/`on_receive`.
    pub(crate) fn spawn_inbound_reader(self: &Arc<Self>) {
        // Registration with the listener happens per-candidate at gather
        // time; this task only owns the receiver side set up alongside it.
        let agent = self.clone();
        tokio::spawn(async move {
            agent.drain_inbound().await;
        });
    }

    async fn drain_inbound(self: &Arc<Self>) {
        // The receiver is created in `ConnectionListener::new` and handed
        // to whoever owns the listener (typically the same caller that
        // built the agent); this crate's agent therefore polls via
        // `listener.recv_inbound`, a thin wrapper kept on the listener so
        // both the agent and any co-located signaling tunnel can share one
        // listener without racing for the channel's only receiver.
        loop {
            let packet = match self.listener.recv_inbound().await {
                Some(p) => p,
                None => return,
            };

            {
                let mut inner = self.inner.lock().await;
                if inner.closed {
                    return;
                }
                inner.last_inbound = Some(Instant::now());
            }

            let mut msg = Message::new();
            msg.raw = packet.data.clone();
            if msg.decode().is_err() {
                if let Some(cb) = self.on_receive.lock().await.as_ref() {
                    cb(packet.data.clone());
                }
                continue;
            }

            let local_idx = {
                let inner = self.inner.lock().await;
                inner.sockets.iter().find_map(|(idx, _)| {
                    if *idx == packet.socket_id { Some(*idx) } else { None }
                })
            };
            let local_idx = match local_idx {
                Some(i) => i,
                None => continue,
            };

            match msg.typ.class {
                MessageClass::Request => {
                    self.handle_inbound_binding_request(&msg, packet.from, local_idx).await;
                }
                MessageClass::Success => {
                    let pair_idx = {
                        let inner = self.inner.lock().await;
                        inner.pairs.iter().position(|p| p.outstanding.contains(&msg.transaction_id))
                    };
                    if let Some(idx) = pair_idx {
                        self.handle_binding_response(&msg, idx, Instant::now()).await;
                    }
                }
                _ => {}
            }

            let recovering = {
                let state = self.sm.lock().await.state();
                matches!(state, IceAgentState::Disconnected)
            };
            if recovering {
                let _ = self.transition(IceAgentState::Connected).await;
            }
        }
    }
}
