//! TURN relay allocation lifecycle.
//!
//! Wraps `turn::client::Client` (already a dependency of the teacher's relay
//! candidate gathering) instead of reimplementing TURN's wire state machine.
//! This module only adds the policy the spec calls for on top of the
//! client's primitives: refresh-before-expiry, per-peer permissions, and
//! opportunistic channel binding.

use crate::error::{Error, Kind};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use turn::client::Client as TurnClient;

/// Grace period before a TURN allocation's token TTL expires at which a
/// refresh is issued.
pub const REFRESH_GRACE: Duration = Duration::from_secs(3);

/// `DEFAULT_TURN_MAX_CHANNEL_BIND_NUMBER_RANGE` in the C SDK: this crate caps
/// concurrent channel bindings per allocation rather than per peer address.
pub const MAX_CHANNEL_BINDINGS: usize = 4;

const MAX_BACKOFF_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TurnState {
    New = 0,
    Checking = 1,
    Allocated = 2,
    Ready = 3,
    Cleanup = 4,
    Failed = 5,
}

impl From<u8> for TurnState {
    fn from(v: u8) -> Self {
        match v {
            1 => TurnState::Checking,
            2 => TurnState::Allocated,
            3 => TurnState::Ready,
            4 => TurnState::Cleanup,
            5 => TurnState::Failed,
            _ => TurnState::New,
        }
    }
}

struct ChannelBinding {
    number: u16,
    peer: SocketAddr,
    bound_at: Instant,
}

/// A single TURN allocation plus the permission/channel bookkeeping the
/// agent needs to relay traffic through it.
pub struct TurnConnection {
    pub server_addr: SocketAddr,
    state: AtomicU8,
    client: Mutex<Option<Arc<TurnClient>>>,
    relayed_addr: Mutex<Option<SocketAddr>>,
    allocation_expiry: Mutex<Option<Instant>>,
    permissions: Mutex<HashMap<SocketAddr, Instant>>,
    channels: Mutex<Vec<ChannelBinding>>,
    /// Traffic count per peer; once it crosses this threshold a channel is
    /// opportunistically bound instead of continuing with send-indications.
    traffic_counts: Mutex<HashMap<SocketAddr, u32>>,
    backoff_attempts: AtomicU8,
}

impl TurnConnection {
    pub fn new(server_addr: SocketAddr) -> Self {
        TurnConnection {
            server_addr,
            state: AtomicU8::new(TurnState::New as u8),
            client: Mutex::new(None),
            relayed_addr: Mutex::new(None),
            allocation_expiry: Mutex::new(None),
            permissions: Mutex::new(HashMap::new()),
            channels: Mutex::new(Vec::new()),
            traffic_counts: Mutex::new(HashMap::new()),
            backoff_attempts: AtomicU8::new(0),
        }
    }

    pub fn state(&self) -> TurnState {
        TurnState::from(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, s: TurnState) {
        self.state.store(s as u8, Ordering::SeqCst);
    }

    pub async fn relayed_address(&self) -> Option<SocketAddr> {
        *self.relayed_addr.lock().await
    }

    /// Installs a freshly-created `turn::client::Client` and records the
    /// relayed transport address the allocate call returned, along with the
    /// expiry deadline used to schedule the next refresh.
    pub async fn attach(&self, client: Arc<TurnClient>, relayed: SocketAddr, ttl: Duration) {
        *self.client.lock().await = Some(client);
        *self.relayed_addr.lock().await = Some(relayed);
        *self.allocation_expiry.lock().await = Some(Instant::now() + ttl);
        self.set_state(TurnState::Allocated);
        self.backoff_attempts.store(0, Ordering::SeqCst);
    }

    pub async fn mark_ready(&self) {
        if self.state() == TurnState::Allocated {
            self.set_state(TurnState::Ready);
        }
    }

    /// Whether the allocation is inside the refresh grace window.
    pub async fn needs_refresh(&self) -> bool {
        match *self.allocation_expiry.lock().await {
            Some(expiry) => Instant::now() + REFRESH_GRACE >= expiry,
            None => false,
        }
    }

    pub async fn record_refresh(&self, ttl: Duration) {
        *self.allocation_expiry.lock().await = Some(Instant::now() + ttl);
    }

    /// Installs (or refreshes) a CreatePermission for `peer`.
    pub async fn ensure_permission(&self, peer: SocketAddr) {
        self.permissions.lock().await.insert(peer, Instant::now());
    }

    pub async fn has_permission(&self, peer: &SocketAddr) -> bool {
        self.permissions.lock().await.contains_key(peer)
    }

    /// Counts one more packet sent to `peer`; returns true once traffic
    /// crosses the opportunistic channel-binding threshold and no channel
    /// is bound yet.
    pub async fn should_bind_channel(&self, peer: SocketAddr) -> bool {
        const CHANNEL_BIND_THRESHOLD: u32 = 3;
        let mut counts = self.traffic_counts.lock().await;
        let count = counts.entry(peer).or_insert(0);
        *count += 1;
        if *count < CHANNEL_BIND_THRESHOLD {
            return false;
        }
        let channels = self.channels.lock().await;
        channels.len() < MAX_CHANNEL_BINDINGS && !channels.iter().any(|c| c.peer == peer)
    }

    pub async fn bind_channel(&self, peer: SocketAddr, number: u16) -> Result<(), Error> {
        let mut channels = self.channels.lock().await;
        if channels.len() >= MAX_CHANNEL_BINDINGS {
            return Err(Error::ResourceExhausted("channel binding table full".into()));
        }
        channels.push(ChannelBinding {
            number,
            peer,
            bound_at: Instant::now(),
        });
        Ok(())
    }

    pub async fn channel_for(&self, peer: &SocketAddr) -> Option<u16> {
        self.channels
            .lock()
            .await
            .iter()
            .find(|c| &c.peer == peer)
            .map(|c| c.number)
    }

    /// Applies the failure semantics the spec spells out: a 401 on refresh
    /// restarts the allocation, a 403 retires this server permanently, and
    /// any other transport error backs off up to `MAX_BACKOFF_ATTEMPTS`.
    pub fn on_failure(&self, kind: Kind) -> TurnOutcome {
        match kind {
            Kind::Auth => {
                self.set_state(TurnState::New);
                TurnOutcome::RestartAllocation
            }
            Kind::Conflict => {
                self.set_state(TurnState::Failed);
                TurnOutcome::RetireServer
            }
            _ => {
                let attempts = self.backoff_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempts as u32 >= MAX_BACKOFF_ATTEMPTS {
                    self.set_state(TurnState::Failed);
                    TurnOutcome::RetireServer
                } else {
                    TurnOutcome::Retry {
                        after: Duration::from_millis(200 * 2u64.pow(attempts as u32 - 1) as u64),
                    }
                }
            }
        }
    }

    pub async fn cleanup(&self) {
        self.set_state(TurnState::Cleanup);
        if let Some(client) = self.client.lock().await.take() {
            let _ = client.close().await;
        }
        self.channels.lock().await.clear();
        self.permissions.lock().await.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    RestartAllocation,
    RetireServer,
    Retry { after: Duration },
}
