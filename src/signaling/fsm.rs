//! The signaling client's own state ladder, built on the shared
//! `state_machine` engine the same way the ICE agent builds its internal
//! one. Grounded in `original_source/src/source/signaling/signaling_fsm.c`'s
//! state names and transition table.

use crate::error::{Error, Kind};
use crate::state_machine::{RetryPolicy, StateMachine, StateTable};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    New,
    GetToken,
    Describe,
    Create,
    GetEndpoint,
    GetIceConfig,
    Ready,
    Connect,
    Connected,
    Disconnected,
    Delete,
}

/// States whose retry budget is infinite per spec §4.6 — everything else
/// (the API-performing states) uses the FSM's shared 5-attempt budget.
fn has_infinite_budget(s: SignalingState) -> bool {
    matches!(
        s,
        SignalingState::New | SignalingState::Ready | SignalingState::Connect | SignalingState::Connected
    )
}

/// Outcome of the last API call or tunnel frame, fed into `next_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOutcome {
    Success,
    Unauthorized,
    NotFound,
    ServerError,
    Timeout,
    GoAway,
    ReconnectIce,
}

fn success_advance(current: SignalingState) -> SignalingState {
    use SignalingState::*;
    match current {
        New => GetToken,
        GetToken => Describe,
        Describe => GetEndpoint,
        Create => Describe,
        GetEndpoint => GetIceConfig,
        GetIceConfig => Ready,
        Ready => Connect,
        Connect => Connected,
        Connected => Connected,
        Disconnected => Connected,
        Delete => Delete,
    }
}

/// Computes the desired successor state given the last outcome, honoring
/// the forced-ICE-config-refresh override (which wins over everything else
/// when exiting `ready`/`connected`, per the resolved open question).
pub fn next_state(current: SignalingState, outcome: ApiOutcome, force_refresh: bool) -> SignalingState {
    use SignalingState::*;

    if force_refresh && matches!(current, Ready | Connected) {
        return GetIceConfig;
    }

    match outcome {
        ApiOutcome::Unauthorized => GetToken,
        ApiOutcome::NotFound if current == Describe => Create,
        ApiOutcome::NotFound => GetEndpoint,
        ApiOutcome::ServerError | ApiOutcome::Timeout => GetEndpoint,
        ApiOutcome::GoAway => Describe,
        ApiOutcome::ReconnectIce => GetIceConfig,
        ApiOutcome::Success => success_advance(current),
    }
}

pub struct SignalingStateTable;

impl StateTable<SignalingState> for SignalingStateTable {
    fn accepts(&self, from: SignalingState, to: SignalingState) -> bool {
        use SignalingState::*;
        if from == Delete {
            return false;
        }
        if to == Delete {
            return true;
        }
        matches!(
            (from, to),
            (New, GetToken)
                | (GetToken, Describe)
                | (Describe, Create)
                | (Describe, GetEndpoint)
                | (Create, Describe)
                | (GetEndpoint, GetIceConfig)
                | (GetIceConfig, Ready)
                | (Ready, Connect)
                | (Connect, Connected)
                | (Connected, Disconnected)
                | (Disconnected, Connected)
        ) || (to == GetToken
            && matches!(from, Describe | Create | GetEndpoint | GetIceConfig | Ready | Connect | Connected | Disconnected))
            || (to == Describe && matches!(from, Create | GetEndpoint | GetIceConfig | Ready | Connect | Connected | Disconnected))
            || (to == GetEndpoint && matches!(from, GetIceConfig | Ready | Connect | Connected | Disconnected))
            || (to == GetIceConfig && matches!(from, Ready | Connect | Connected | Disconnected))
    }

    fn is_terminal(&self, s: SignalingState) -> bool {
        s == SignalingState::Delete
    }
}

#[derive(Debug, Clone, Default)]
pub struct FsmCtx {
    pub force_refresh_ice_config: bool,
    pub describe_attempts: u32,
}

/// Wraps the shared `StateMachine` engine with the signaling-specific
/// next-state function and the infinite/finite retry-budget split.
pub struct SignalingFsm {
    sm: StateMachine<SignalingState, FsmCtx>,
}

impl SignalingFsm {
    pub fn new() -> SignalingFsm {
        let retry_policy = RetryPolicy {
            base: Duration::from_millis(10),
            max_attempts: 5,
        };
        SignalingFsm {
            sm: StateMachine::new(SignalingState::New, retry_policy, FsmCtx::default()),
        }
    }

    pub fn state(&self) -> SignalingState {
        self.sm.state()
    }

    pub fn retry_count(&self) -> u32 {
        self.sm.retry_count()
    }

    pub fn request_ice_config_refresh(&mut self) {
        self.sm.ctx.force_refresh_ice_config = true;
    }

    /// Applies an outcome: computes the successor, validates it against the
    /// accept mask, and installs it. Resets the retry counter on every
    /// state change (matching the shared engine's idempotence contract);
    /// on failure outcomes hitting a finite-budget state with exhausted
    /// retries, returns the terminal error instead of transitioning.
    pub fn apply(&mut self, outcome: ApiOutcome) -> Result<SignalingState, Error> {
        let current = self.sm.state();
        if current == SignalingState::Describe {
            self.sm.ctx.describe_attempts += 1;
        }

        let is_failure = !matches!(outcome, ApiOutcome::Success);
        if is_failure && !has_infinite_budget(current) {
            let kind = match outcome {
                ApiOutcome::Unauthorized => Kind::Auth,
                ApiOutcome::NotFound => Kind::NotFound,
                ApiOutcome::Timeout => Kind::Timeout,
                _ => Kind::Transport,
            };
            self.sm.record_failure(kind)?;
        }

        let force_refresh = self.sm.ctx.force_refresh_ice_config;
        let next = next_state(current, outcome, force_refresh);
        if next == SignalingState::GetIceConfig && force_refresh {
            self.sm.ctx.force_refresh_ice_config = false;
        }

        self.sm.step(&SignalingStateTable, next)?;
        if next != current {
            self.sm.reset_retry_count();
        }
        Ok(next)
    }

    /// Direct transitions not driven by an API outcome: the WebSocket
    /// reader observing the tunnel drop, or recovering.
    pub fn mark_disconnected(&mut self) -> Result<(), Error> {
        self.sm.step(&SignalingStateTable, SignalingState::Disconnected)
    }

    pub fn mark_reconnected(&mut self) -> Result<(), Error> {
        self.sm.step(&SignalingStateTable, SignalingState::Connected)
    }

    pub fn mark_deleted(&mut self) {
        self.sm.force_state(SignalingState::Delete);
    }

    pub fn describe_attempts(&self) -> u32 {
        self.sm.ctx.describe_attempts
    }
}

impl Default for SignalingFsm {
    fn default() -> Self {
        Self::new()
    }
}
