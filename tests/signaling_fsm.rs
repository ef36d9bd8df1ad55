//! Signaling FSM scenarios S3/S4, driven entirely through the public
//! `SignalingClient` API against a scripted HTTP transport and a real (but
//! otherwise inert) local WebSocket endpoint standing in for the cloud
//! data-plane tunnel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpListener;

use rendezvous_ice::signaling::fsm::{ApiOutcome, SignalingState};
use rendezvous_ice::signaling::{
    ApiResult, ChannelDescriptor, ChannelRole, ClientConfig, ControlPlaneTransport, Credentials,
    CredentialProvider, IceServerConfig, NoopHooks, SignalingClient, StaticCredentialProvider,
};

/// Accepts exactly one WebSocket handshake and then idles, just enough for
/// `connect()`'s `open_websocket` step to succeed.
async fn spawn_inert_ws_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                let (_write, mut read) = ws.split();
                while read.next().await.is_some() {}
            }
        }
    });
    format!("ws://{addr}")
}

struct ScriptedTransport {
    describe_calls: AtomicUsize,
    describe_responses: Vec<ApiOutcome>,
    wss_endpoint: String,
}

impl ScriptedTransport {
    fn new(describe_responses: Vec<ApiOutcome>, wss_endpoint: String) -> ScriptedTransport {
        ScriptedTransport { describe_calls: AtomicUsize::new(0), describe_responses, wss_endpoint }
    }

    fn describe_call_count(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlaneTransport for ScriptedTransport {
    async fn get_token(&self, _creds: &Credentials) -> ApiResult {
        ApiResult { outcome: ApiOutcome::Success, status_code: Some(200) }
    }

    async fn describe(&self, _channel_name: &str) -> (ApiResult, Option<ChannelDescriptor>) {
        let call = self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.describe_responses[call.min(self.describe_responses.len() - 1)];
        let descriptor = matches!(outcome, ApiOutcome::Success).then(|| ChannelDescriptor {
            channel_arn: "arn:aws:kinesisvideo:test".to_owned(),
            https_endpoint: "https://example.test".to_owned(),
            wss_endpoint: self.wss_endpoint.clone(),
        });
        (ApiResult { outcome, status_code: Some(200) }, descriptor)
    }

    async fn create(&self, _channel_name: &str) -> ApiResult {
        ApiResult { outcome: ApiOutcome::Success, status_code: Some(200) }
    }

    async fn get_endpoint(&self, _channel_arn: &str) -> (ApiResult, Option<ChannelDescriptor>) {
        (
            ApiResult { outcome: ApiOutcome::Success, status_code: Some(200) },
            Some(ChannelDescriptor {
                channel_arn: "arn:aws:kinesisvideo:test".to_owned(),
                https_endpoint: "https://example.test".to_owned(),
                wss_endpoint: self.wss_endpoint.clone(),
            }),
        )
    }

    async fn get_ice_config(&self, _channel_arn: &str) -> (ApiResult, Vec<IceServerConfig>) {
        (
            ApiResult { outcome: ApiOutcome::Success, status_code: Some(200) },
            vec![IceServerConfig {
                uris: vec!["stun:example.test:3478".to_owned()],
                username: "u".to_owned(),
                password: "p".to_owned(),
                ttl: Duration::from_secs(600),
                fetched_at: Instant::now(),
            }],
        )
    }
}

fn test_config(dir: &tempfile::TempDir) -> ClientConfig {
    ClientConfig {
        channel_name: "test-channel".to_owned(),
        role: ChannelRole::Viewer,
        region: "us-west-2".to_owned(),
        cache_path: dir.path().join(".SignalingCache_v0"),
        cache_max_age: Duration::from_secs(3600),
        call_timeout: Duration::from_secs(1),
        tls_handshake_timeout: Duration::from_secs(1),
    }
}

fn static_credentials() -> Arc<dyn CredentialProvider> {
    Arc::new(StaticCredentialProvider::new(Credentials {
        access_key: "AKIA".to_owned(),
        secret_key: "secret".to_owned(),
        session_token: None,
        expiration: Instant::now() + Duration::from_secs(3600),
    }))
}

#[tokio::test]
async fn s3_signaling_fsm_happy_path_reaches_connected() {
    let dir = tempfile::tempdir().unwrap();
    let wss = spawn_inert_ws_endpoint().await;
    let transport = Arc::new(ScriptedTransport::new(vec![ApiOutcome::Success], wss));

    let client = Arc::new(SignalingClient::new(
        test_config(&dir),
        transport.clone(),
        static_credentials(),
        Arc::new(NoopHooks),
    ));

    client.connect().await.unwrap();

    assert_eq!(client.state().await, SignalingState::Connected);
    assert_eq!(transport.describe_call_count(), 1);
    assert_eq!(client.get_ice_config_info_count().await, 1);
    let metrics = client.get_metrics().await;
    assert_eq!(metrics.ice_refresh_count, 1);
}

#[tokio::test]
async fn s4_not_found_on_describe_branches_through_create() {
    let dir = tempfile::tempdir().unwrap();
    let wss = spawn_inert_ws_endpoint().await;
    let transport = Arc::new(ScriptedTransport::new(
        vec![ApiOutcome::NotFound, ApiOutcome::Success],
        wss,
    ));

    let client = Arc::new(SignalingClient::new(
        test_config(&dir),
        transport.clone(),
        static_credentials(),
        Arc::new(NoopHooks),
    ));

    client.connect().await.unwrap();

    assert_eq!(client.state().await, SignalingState::Connected);
    // one 404 plus the follow-up success: two describe round-trips total.
    assert_eq!(transport.describe_call_count(), 2);
}
