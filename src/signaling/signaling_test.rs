use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex as TokioMutex;

struct ScriptedTransport {
    describe_calls: AtomicUsize,
    describe_responses: Vec<ApiOutcome>,
    ice_config: TokioMutex<Vec<IceServerConfig>>,
}

impl ScriptedTransport {
    fn happy_path() -> ScriptedTransport {
        ScriptedTransport {
            describe_calls: AtomicUsize::new(0),
            describe_responses: vec![ApiOutcome::Success],
            ice_config: TokioMutex::new(vec![IceServerConfig {
                uris: vec!["stun:example.test:3478".to_owned()],
                username: "u".to_owned(),
                password: "p".to_owned(),
                ttl: Duration::from_secs(600),
                fetched_at: Instant::now(),
            }]),
        }
    }

    fn describe_then_create() -> ScriptedTransport {
        ScriptedTransport {
            describe_calls: AtomicUsize::new(0),
            describe_responses: vec![ApiOutcome::NotFound, ApiOutcome::Success],
            ice_config: TokioMutex::new(Vec::new()),
        }
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
            wss_endpoint: "wss://example.test".to_owned(),
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
                wss_endpoint: "wss://example.test".to_owned(),
            }),
        )
    }

    async fn get_ice_config(&self, _channel_arn: &str) -> (ApiResult, Vec<IceServerConfig>) {
        let configs = self.ice_config.lock().await.clone();
        (ApiResult { outcome: ApiOutcome::Success, status_code: Some(200) }, configs)
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
async fn fsm_drives_to_ready_without_a_real_websocket() {
    let dir = tempfile::tempdir().unwrap();
    let client = SignalingClient::new(
        test_config(&dir),
        Arc::new(ScriptedTransport::happy_path()),
        static_credentials(),
        Arc::new(NoopHooks),
    );

    // Drive everything up to (but not through) `connect`, since opening a
    // real websocket needs a live server; `Ready` is as far as pure HTTP
    // control-plane orchestration goes.
    loop {
        let state = client.state().await;
        match state {
            SignalingState::New => client.step(ApiOutcome::Success).await.unwrap(),
            SignalingState::GetToken => client.step(ApiOutcome::Success).await.unwrap(),
            SignalingState::Describe => client.do_describe().await.unwrap(),
            SignalingState::Create => client.step(ApiOutcome::Success).await.unwrap(),
            SignalingState::GetEndpoint => client.do_get_endpoint().await.unwrap(),
            SignalingState::GetIceConfig => client.do_get_ice_config().await.unwrap(),
            SignalingState::Ready => break,
            other => panic!("unexpected state {other:?}"),
        }
    }
    assert_eq!(client.state().await, SignalingState::Ready);
    assert_eq!(client.get_ice_config_info_count().await, 1);
}

#[tokio::test]
async fn not_found_on_describe_branches_to_create_then_retries_describe() {
    let dir = tempfile::tempdir().unwrap();
    let client = SignalingClient::new(
        test_config(&dir),
        Arc::new(ScriptedTransport::describe_then_create()),
        static_credentials(),
        Arc::new(NoopHooks),
    );

    client.step(ApiOutcome::Success).await.unwrap(); // New -> GetToken
    client.step(ApiOutcome::Success).await.unwrap(); // GetToken -> Describe
    client.do_describe().await.unwrap(); // 404 -> Create
    assert_eq!(client.state().await, SignalingState::Create);
    client.step(ApiOutcome::Success).await.unwrap(); // Create -> Describe
    client.do_describe().await.unwrap(); // 200 -> GetEndpoint
    assert_eq!(client.state().await, SignalingState::GetEndpoint);
}

#[tokio::test]
async fn send_before_connected_is_invalid_state() {
    let dir = tempfile::tempdir().unwrap();
    let client = SignalingClient::new(
        test_config(&dir),
        Arc::new(ScriptedTransport::happy_path()),
        static_credentials(),
        Arc::new(NoopHooks),
    );
    let message = OutboundMessage {
        version: "1.0".to_owned(),
        message_type: MessageType::Offer,
        peer_client_id: None,
        correlation_id: None,
        payload: b"hello".to_vec(),
    };
    let err = client.send(message).await.unwrap_err();
    assert_eq!(err.kind(), Kind::InvalidState);
}

#[tokio::test]
async fn get_endpoint_writes_through_to_the_disk_cache() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let cache_path = config.cache_path.clone();
    let client = SignalingClient::new(
        config,
        Arc::new(ScriptedTransport::happy_path()),
        static_credentials(),
        Arc::new(NoopHooks),
    );

    client.step(ApiOutcome::Success).await.unwrap(); // New -> GetToken
    client.step(ApiOutcome::Success).await.unwrap(); // GetToken -> Describe
    client.do_describe().await.unwrap(); // Describe -> GetEndpoint
    client.do_get_endpoint().await.unwrap(); // GetEndpoint -> GetIceConfig

    let cache = cache::SignalingCache::new(&cache_path);
    let entry = cache.load("test-channel", "us-west-2", cache::Role::Viewer).await;
    assert!(entry.is_some());
}

#[tokio::test]
async fn metrics_report_ice_refresh_count() {
    let dir = tempfile::tempdir().unwrap();
    let client = SignalingClient::new(
        test_config(&dir),
        Arc::new(ScriptedTransport::happy_path()),
        static_credentials(),
        Arc::new(NoopHooks),
    );
    client.step(ApiOutcome::Success).await.unwrap();
    client.step(ApiOutcome::Success).await.unwrap();
    client.do_describe().await.unwrap();
    client.do_get_endpoint().await.unwrap();
    client.do_get_ice_config().await.unwrap();

    let metrics = client.get_metrics().await;
    assert_eq!(metrics.ice_refresh_count, 1);
}
