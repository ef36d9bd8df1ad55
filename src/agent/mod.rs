pub mod checks;
pub mod gathering;
pub mod keepalive;

#[cfg(test)]
mod agent_test;

use crate::candidate::{Candidate, CandidatePair};
use crate::control::Role;
use crate::error::Error;
use crate::listener::ConnectionListener;
use crate::network_type::NetworkType;
use crate::rand::{generate_pwd, generate_ufrag};
use crate::socket::SocketConnection;
use crate::state::{ConnectionState, GatheringState};
use crate::state_machine::{RetryPolicy, StateMachine, StateTable};
use crate::timer::{Fired, TimerId, TimerQueue};
use crate::turn_conn::TurnConnection;
use crate::url::URL;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};

pub(crate) const MAX_BINDING_REQUESTS: u16 = 7;
pub(crate) const CHECK_INTERVAL: Duration = Duration::from_millis(50); // Ta
pub(crate) const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);
pub(crate) const DISCONNECTED_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const FAILED_TIMEOUT: Duration = Duration::from_secs(45);
pub(crate) const MAX_PAIRS: usize = 1024;
pub(crate) const GATHERING_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const CANDIDATE_BATCH_SIZE: usize = 10;

/// Explicit, caller-constructed configuration; nothing here is read from
/// process globals.
#[derive(Clone)]
pub struct AgentConfig {
    pub urls: Vec<URL>,
    pub network_types: Vec<NetworkType>,
    pub lite: bool,
    pub relay_only: bool,
    pub max_binding_requests: u16,
    pub check_interval: Duration,
    pub keepalive_interval: Duration,
    pub disconnected_timeout: Duration,
    pub failed_timeout: Duration,
    pub max_pairs: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            urls: Vec::new(),
            network_types: vec![NetworkType::UDP4, NetworkType::UDP6],
            lite: false,
            relay_only: false,
            max_binding_requests: MAX_BINDING_REQUESTS,
            check_interval: CHECK_INTERVAL,
            keepalive_interval: KEEPALIVE_INTERVAL,
            disconnected_timeout: DISCONNECTED_TIMEOUT,
            failed_timeout: FAILED_TIMEOUT,
            max_pairs: MAX_PAIRS,
        }
    }
}

/// Agent-level state ladder. `connected <-> disconnected` loops freely as
/// traffic comes and goes (recovery resumes without a restart per §4.5);
/// `disconnected -> checking-connection` is the restart path instead. Every
/// other edge is taken once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceAgentState {
    New,
    CheckingConnection,
    Nominating,
    Connected,
    Ready,
    Disconnected,
    Failed,
    Closed,
}

impl From<IceAgentState> for ConnectionState {
    fn from(s: IceAgentState) -> Self {
        match s {
            IceAgentState::New => ConnectionState::New,
            IceAgentState::CheckingConnection | IceAgentState::Nominating => ConnectionState::Checking,
            IceAgentState::Connected => ConnectionState::Connected,
            IceAgentState::Ready => ConnectionState::Completed,
            IceAgentState::Disconnected => ConnectionState::Disconnected,
            IceAgentState::Failed => ConnectionState::Failed,
            IceAgentState::Closed => ConnectionState::Closed,
        }
    }
}

struct AgentStateTable;

impl StateTable<IceAgentState> for AgentStateTable {
    fn accepts(&self, from: IceAgentState, to: IceAgentState) -> bool {
        use IceAgentState::*;
        // Controlled-role agents never enter `Nominating` (only the controlling
        // side drives a nomination cycle) but still reach `Connected` the moment
        // the peer's USE-CANDIDATE nominates a pair, straight from
        // `CheckingConnection`.
        matches!(
            (from, to),
            (New, CheckingConnection)
                | (CheckingConnection, Nominating)
                | (Nominating, Connected)
                | (CheckingConnection, Connected)
                | (Connected, Ready)
                | (Ready, Disconnected)
                | (Connected, Disconnected)
                | (Disconnected, CheckingConnection)
                | (Disconnected, Connected)
                | (Disconnected, Failed)
        )
    }

    fn is_terminal(&self, s: IceAgentState) -> bool {
        matches!(s, IceAgentState::Failed | IceAgentState::Closed)
    }
}

pub type OnCandidateHdlrFn = Box<dyn Fn(Option<Candidate>) + Send + Sync>;
pub type OnConnectionStateChangeHdlrFn = Box<dyn Fn(ConnectionState) + Send + Sync>;
pub type OnSelectedCandidatePairChangeHdlrFn = Box<dyn Fn(Candidate, Candidate) + Send + Sync>;
/// Bearer hand-off to the upper transport layer (DTLS/SRTP/SCTP): every
/// inbound packet that doesn't decode as STUN is handed here verbatim.
pub type OnReceiveHdlrFn = Box<dyn Fn(Vec<u8>) + Send + Sync>;

pub(crate) struct Inner {
    pub(crate) role: Option<Role>,
    pub(crate) local_ufrag: String,
    pub(crate) local_pwd: String,
    pub(crate) remote_ufrag: String,
    pub(crate) remote_pwd: String,
    pub(crate) local_candidates: Vec<Candidate>,
    pub(crate) remote_candidates: Vec<Candidate>,
    pub(crate) pairs: Vec<CandidatePair>,
    pub(crate) selected_pair: Option<usize>,
    pub(crate) triggered_queue: VecDeque<usize>,
    pub(crate) sockets: HashMap<usize, Arc<SocketConnection>>,
    pub(crate) turn_conns: Vec<Arc<TurnConnection>>,
    pub(crate) gathering_state: GatheringState,
    pub(crate) last_inbound: Option<Instant>,
    pub(crate) check_timer: Option<TimerId>,
    pub(crate) keepalive_timer: Option<TimerId>,
    pub(crate) nomination_started: bool,
    pub(crate) started: bool,
    pub(crate) closed: bool,
}

impl Inner {
    fn new(local_ufrag: String, local_pwd: String) -> Self {
        Inner {
            role: None,
            local_ufrag,
            local_pwd,
            remote_ufrag: String::new(),
            remote_pwd: String::new(),
            local_candidates: Vec::new(),
            remote_candidates: Vec::new(),
            pairs: Vec::new(),
            selected_pair: None,
            triggered_queue: VecDeque::new(),
            sockets: HashMap::new(),
            turn_conns: Vec::new(),
            gathering_state: GatheringState::New,
            last_inbound: None,
            check_timer: None,
            keepalive_timer: None,
            nomination_started: false,
            started: false,
            closed: false,
        }
    }
}

/// The connectivity and transport engine: candidate gathering, connectivity
/// checks, pair selection, keepalive and restart, all driven by callbacks
/// rather than the caller polling state.
pub struct Agent {
    pub(crate) config: AgentConfig,
    pub(crate) sm: Mutex<StateMachine<IceAgentState, ()>>,
    pub(crate) inner: Mutex<Inner>,
    pub(crate) listener: Arc<ConnectionListener>,
    pub(crate) timers: TimerQueue,
    pub(crate) timer_events: Mutex<Option<mpsc::UnboundedReceiver<Fired>>>,
    pub(crate) on_candidate: Mutex<Option<OnCandidateHdlrFn>>,
    pub(crate) on_state_change: Mutex<Option<OnConnectionStateChangeHdlrFn>>,
    pub(crate) on_selected_pair_change: Mutex<Option<OnSelectedCandidatePairChangeHdlrFn>>,
    pub(crate) on_receive: Mutex<Option<OnReceiveHdlrFn>>,
}

impl Agent {
    /// Creates a new agent with a freshly-generated local ufrag/pwd, wired
    /// to the given connection listener and timer queue. `timer_events` is
    /// the receiver half `TimerQueue::start()` returned alongside `timers` —
    /// the agent is the sole consumer of timers it registers on that queue,
    /// so it owns the receiver outright rather than sharing it. Callers
    /// register callbacks with `on_candidate`/`on_connection_state_change`/
    /// `on_selected_candidate_pair_change` before calling `start`.
    pub fn new(
        config: AgentConfig,
        listener: Arc<ConnectionListener>,
        timers: TimerQueue,
        timer_events: mpsc::UnboundedReceiver<Fired>,
    ) -> Arc<Agent> {
        let local_ufrag = generate_ufrag();
        let local_pwd = generate_pwd();
        let retry_policy = RetryPolicy {
            base: Duration::from_millis(50),
            max_attempts: config.max_binding_requests as u32,
        };
        Arc::new(Agent {
            config,
            sm: Mutex::new(StateMachine::new(IceAgentState::New, retry_policy, ())),
            inner: Mutex::new(Inner::new(local_ufrag, local_pwd)),
            listener,
            timers,
            timer_events: Mutex::new(Some(timer_events)),
            on_candidate: Mutex::new(None),
            on_state_change: Mutex::new(None),
            on_selected_pair_change: Mutex::new(None),
            on_receive: Mutex::new(None),
        })
    }

    pub async fn on_candidate(&self, f: OnCandidateHdlrFn) {
        *self.on_candidate.lock().await = Some(f);
    }

    pub async fn on_connection_state_change(&self, f: OnConnectionStateChangeHdlrFn) {
        *self.on_state_change.lock().await = Some(f);
    }

    pub async fn on_selected_candidate_pair_change(&self, f: OnSelectedCandidatePairChangeHdlrFn) {
        *self.on_selected_pair_change.lock().await = Some(f);
    }

    /// Registers the bearer hand-off for inbound application data (anything
    /// that doesn't decode as a STUN message). Mirrors `send`'s symmetry:
    /// the upper transport layer gets `send(bytes)` / `on_receive(bytes)`
    /// without needing to know about STUN at all.
    pub async fn on_receive(&self, f: OnReceiveHdlrFn) {
        *self.on_receive.lock().await = Some(f);
    }

    pub async fn get_local_user_credentials(&self) -> (String, String) {
        let inner = self.inner.lock().await;
        (inner.local_ufrag.clone(), inner.local_pwd.clone())
    }

    pub async fn get_remote_user_credentials(&self) -> (String, String) {
        let inner = self.inner.lock().await;
        (inner.remote_ufrag.clone(), inner.remote_pwd.clone())
    }

    pub async fn get_local_candidates(&self) -> Vec<Candidate> {
        self.inner.lock().await.local_candidates.clone()
    }

    pub async fn get_selected_candidate_pair(&self) -> Option<(Candidate, Candidate)> {
        let inner = self.inner.lock().await;
        let idx = inner.selected_pair?;
        let pair = inner.pairs.get(idx)?;
        Some((
            inner.local_candidates.get(pair.local)?.clone(),
            inner.remote_candidates.get(pair.remote)?.clone(),
        ))
    }

    /// Latches role and remote credentials, then transitions into
    /// connectivity checking. Candidate gathering must already be underway
    /// (or complete) via `start_gathering`.
    pub async fn start(self: &Arc<Self>, remote_ufrag: String, remote_pwd: String, is_controlling: bool) -> Result<(), Error> {
        if remote_ufrag.is_empty() {
            return Err(Error::InvalidArgument("remote ufrag is empty".into()));
        }
        if remote_pwd.is_empty() {
            return Err(Error::InvalidArgument("remote pwd is empty".into()));
        }
        {
            let mut inner = self.inner.lock().await;
            if inner.started {
                return Err(Error::InvalidState("agent already started".into()));
            }
            inner.started = true;
            inner.remote_ufrag = remote_ufrag;
            inner.remote_pwd = remote_pwd;
            inner.role = Some(if is_controlling { Role::Controlling } else { Role::Controlled });
        }
        self.transition(IceAgentState::CheckingConnection).await?;
        self.spawn_driver_loops().await;
        Ok(())
    }

    /// Idempotent by (kind, address, port): re-adding a candidate the agent
    /// has already accepted is a no-op.
    pub async fn add_remote_candidate(self: &Arc<Self>, raw: &str) -> Result<(), Error> {
        let candidate = Candidate::unmarshal(raw)?;
        let mut inner = self.inner.lock().await;
        if inner
            .remote_candidates
            .iter()
            .any(|c| c.kind == candidate.kind && c.address == candidate.address && c.port == candidate.port)
        {
            return Ok(());
        }
        if inner.remote_candidates.len() >= crate::candidate::MAX_REMOTE_CANDIDATES {
            return Err(Error::ResourceExhausted("remote candidate cap reached".into()));
        }
        inner.remote_candidates.push(candidate);
        drop(inner);
        self.reform_pairs().await;
        Ok(())
    }

    /// Requires state `connected` (or later); forwards over the selected pair.
    pub async fn send(&self, bytes: &[u8]) -> Result<usize, Error> {
        let state = self.sm.lock().await.state();
        if !matches!(state, IceAgentState::Connected | IceAgentState::Ready) {
            return Err(Error::InvalidState(format!("cannot send in state {:?}", state)));
        }
        let inner = self.inner.lock().await;
        let idx = inner.selected_pair.ok_or_else(|| Error::InvalidState("no selected pair".into()))?;
        let pair = &inner.pairs[idx];
        let local = &inner.local_candidates[pair.local];
        let remote = &inner.remote_candidates[pair.remote];
        let socket = inner
            .sockets
            .get(&pair.local)
            .ok_or_else(|| Error::InvalidState("no socket for selected pair".into()))?
            .clone();
        let dst = remote.addr()?;
        let _ = local;
        drop(inner);
        socket.send(bytes, dst).await
    }

    /// Applies the peer's refreshed ufrag/pwd after it restarts on its own
    /// end, delivered out of band via the signaling channel. Outbound
    /// binding requests immediately start authenticating against these.
    pub async fn update_remote_credentials(&self, remote_ufrag: String, remote_pwd: String) {
        let mut inner = self.inner.lock().await;
        inner.remote_ufrag = remote_ufrag;
        inner.remote_pwd = remote_pwd;
    }

    /// Rotates local ufrag/pwd atomically, resets retry counters, and
    /// re-unfreezes the existing pair list so checks resume immediately.
    /// The selected pair keeps carrying data until a replacement is chosen.
    pub async fn restart(self: &Arc<Self>, new_local_ufrag: String, new_local_pwd: String) -> Result<(), Error> {
        {
            let inner = self.inner.lock().await;
            if inner.gathering_state == GatheringState::Gathering {
                return Err(Error::InvalidState("cannot restart while gathering".into()));
            }
        }
        {
            let mut inner = self.inner.lock().await;
            inner.local_ufrag = new_local_ufrag;
            inner.local_pwd = new_local_pwd;
            inner.nomination_started = false;
            for pair in inner.pairs.iter_mut() {
                pair.retries = 0;
                pair.state = crate::candidate::PairState::Waiting;
                pair.nominated = false;
                pair.nominate_in_flight = false;
            }
        }
        self.sm.lock().await.reset_retry_count();
        self.sm.lock().await.force_state(IceAgentState::CheckingConnection);
        Ok(())
    }

    /// Idempotent; after return no callbacks fire.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        inner.closed = true;
        if let Some(id) = inner.check_timer.take() {
            self.timers.cancel(id);
        }
        if let Some(id) = inner.keepalive_timer.take() {
            self.timers.cancel(id);
        }
        for turn in inner.turn_conns.drain(..) {
            turn.cleanup().await;
        }
        drop(inner);
        self.listener.remove_all().await;
        *self.on_candidate.lock().await = None;
        *self.on_state_change.lock().await = None;
        *self.on_selected_pair_change.lock().await = None;
        *self.on_receive.lock().await = None;
        self.sm.lock().await.force_state(IceAgentState::Closed);
    }

    pub(crate) async fn transition(self: &Arc<Self>, to: IceAgentState) -> Result<(), Error> {
        {
            let mut sm = self.sm.lock().await;
            sm.step(&AgentStateTable, to)?;
        }
        if let Some(cb) = self.on_state_change.lock().await.as_ref() {
            cb(to.into());
        }
        Ok(())
    }

    /// Registers the Ta-paced check timer and the 15s keepalive timer on
    /// the shared `TimerQueue`, spawns the inbound-packet dispatch loop, and
    /// spawns the task draining fired timers back into `check_tick`/
    /// `keepalive_tick`/`check_liveness`. Called once `start` has latched
    /// role and remote credentials.
    async fn spawn_driver_loops(self: &Arc<Self>) {
        let check_id = self.timers.add(self.config.check_interval, Some(self.config.check_interval)).await;
        let keepalive_id = self.timers.add(self.config.keepalive_interval, Some(self.config.keepalive_interval)).await;
        {
            let mut inner = self.inner.lock().await;
            inner.check_timer = Some(check_id);
            inner.keepalive_timer = Some(keepalive_id);
        }

        self.spawn_inbound_reader();

        let events = self.timer_events.lock().await.take();
        if let Some(events) = events {
            let agent = self.clone();
            tokio::spawn(async move {
                agent.run_timer_loop(events).await;
            });
        }
    }

    /// Drains the `TimerQueue`'s fired events and dispatches each one by id:
    /// the check timer services the triggered-check queue and promotes a
    /// waiting pair (§4.5's Ta-paced checks) and also re-evaluates the
    /// disconnect/failed timeout so detection resolves within one Ta
    /// interval (invariant 10); the keepalive timer sends the periodic
    /// binding indication on the selected pair.
    async fn run_timer_loop(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<Fired>) {
        while let Some(fired) = events.recv().await {
            if self.inner.lock().await.closed {
                return;
            }
            let (is_check, is_keepalive) = {
                let inner = self.inner.lock().await;
                (inner.check_timer == Some(fired.id), inner.keepalive_timer == Some(fired.id))
            };
            if is_check {
                self.check_tick().await;
                self.check_liveness().await;
            } else if is_keepalive {
                self.keepalive_tick().await;
            }
        }
    }
}
