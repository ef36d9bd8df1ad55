//! Cross-module end-to-end scenarios, exercising real two-agent traffic
//! over loopback UDP rather than mocked transports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use rendezvous_ice::agent::{Agent, AgentConfig};
use rendezvous_ice::candidate::Candidate;
use rendezvous_ice::listener::ConnectionListener;
use rendezvous_ice::network_type::NetworkType;
use rendezvous_ice::rolling_buffer::RollingBuffer;
use rendezvous_ice::signaling::wire;
use rendezvous_ice::timer::TimerQueue;

fn loopback_config() -> AgentConfig {
    AgentConfig {
        network_types: vec![NetworkType::UDP4],
        ..AgentConfig::default()
    }
}

/// Spins up one agent with its own listener and timer queue, wired to
/// collect every gathered host candidate into `candidates`.
async fn spawn_agent(candidates: Arc<Mutex<Vec<Candidate>>>) -> Arc<Agent> {
    let listener = Arc::new(ConnectionListener::new());
    listener.start();
    let (timers, fired) = TimerQueue::start();
    let agent = Agent::new(loopback_config(), listener, timers, fired);

    agent
        .on_candidate(Box::new(move |c| {
            if let Some(c) = c {
                let candidates = candidates.clone();
                tokio::spawn(async move {
                    candidates.lock().await.push(c);
                });
            }
        }))
        .await;

    agent.start_gathering().await.unwrap();
    agent
}

async fn wait_for_one_candidate(candidates: &Arc<Mutex<Vec<Candidate>>>) -> Candidate {
    for _ in 0..100 {
        {
            let guard = candidates.lock().await;
            if let Some(c) = guard.first() {
                return c.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no host candidate gathered within 2s");
}

async fn wait_until_connected(agent: &Arc<Agent>, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if agent.get_selected_candidate_pair().await.is_some() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn s1_two_agents_connect_over_loopback_and_exchange_data() {
    let cands_a = Arc::new(Mutex::new(Vec::new()));
    let cands_b = Arc::new(Mutex::new(Vec::new()));
    let agent_a = spawn_agent(cands_a.clone()).await;
    let agent_b = spawn_agent(cands_b.clone()).await;

    let received = Arc::new(Mutex::new(Vec::<u8>::new()));
    let received_clone = received.clone();
    agent_b
        .on_receive(Box::new(move |bytes| {
            let received = received_clone.clone();
            tokio::spawn(async move {
                *received.lock().await = bytes;
            });
        }))
        .await;

    let cand_a = wait_for_one_candidate(&cands_a).await;
    let cand_b = wait_for_one_candidate(&cands_b).await;

    agent_a.add_remote_candidate(&cand_b.marshal()).await.unwrap();
    agent_b.add_remote_candidate(&cand_a.marshal()).await.unwrap();

    let (_, _) = tokio::join!(
        agent_a.start("uB".to_owned(), "pB".to_owned(), true),
        agent_b.start("uA".to_owned(), "pA".to_owned(), false),
    );

    assert!(wait_until_connected(&agent_a, Duration::from_secs(2)).await, "A never reached connected");
    assert!(wait_until_connected(&agent_b, Duration::from_secs(2)).await, "B never reached connected");

    agent_a.send(b"hello").await.unwrap();

    let mut delivered = Vec::new();
    for _ in 0..100 {
        {
            let guard = received.lock().await;
            if !guard.is_empty() {
                delivered = guard.clone();
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(delivered, b"hello");

    agent_a.shutdown().await;
    agent_b.shutdown().await;
}

#[tokio::test]
async fn s2_candidate_restart_keeps_data_flowing_and_reconnects() {
    let cands_a = Arc::new(Mutex::new(Vec::new()));
    let cands_b = Arc::new(Mutex::new(Vec::new()));
    let agent_a = spawn_agent(cands_a.clone()).await;
    let agent_b = spawn_agent(cands_b.clone()).await;

    let receive_count = Arc::new(AtomicUsize::new(0));
    let count_clone = receive_count.clone();
    agent_b
        .on_receive(Box::new(move |_bytes| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }))
        .await;

    let cand_a = wait_for_one_candidate(&cands_a).await;
    let cand_b = wait_for_one_candidate(&cands_b).await;
    agent_a.add_remote_candidate(&cand_b.marshal()).await.unwrap();
    agent_b.add_remote_candidate(&cand_a.marshal()).await.unwrap();

    let (_, _) = tokio::join!(
        agent_a.start("uB".to_owned(), "pB".to_owned(), true),
        agent_b.start("uA".to_owned(), "pA".to_owned(), false),
    );
    assert!(wait_until_connected(&agent_a, Duration::from_secs(2)).await);
    assert!(wait_until_connected(&agent_b, Duration::from_secs(2)).await);

    agent_a.restart("uA2".to_owned(), "pA2".to_owned()).await.unwrap();

    // data sent within 500ms of the restart must still land, since the
    // selected pair keeps carrying traffic until a replacement is chosen.
    agent_a.send(b"still-flowing").await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(receive_count.load(Ordering::SeqCst) >= 1);

    // B must learn the refreshed credentials out of band (the restarted
    // agent's local ufrag/pwd are what the remote peer authenticates
    // against) before a fresh binding exchange can re-nominate a pair.
    let (new_ufrag, new_pwd) = agent_a.get_local_user_credentials().await;
    agent_b.update_remote_credentials(new_ufrag, new_pwd).await;

    assert!(wait_until_connected(&agent_a, Duration::from_secs(2)).await);
    assert!(wait_until_connected(&agent_b, Duration::from_secs(2)).await);

    agent_a.shutdown().await;
    agent_b.shutdown().await;
}

#[test]
fn s5_sdp_deserialization_error_table() {
    use wire::{parse_sdp, WireError};

    assert!(matches!(parse_sdp("helloWorld"), Err(WireError::Protocol(_))));
    assert!(matches!(parse_sdp("{}"), Err(WireError::Protocol(_))));
    assert!(matches!(parse_sdp(r#"{"type":"offer"}"#), Err(WireError::MissingSdp)));
    assert!(matches!(parse_sdp(r#"{"sdp":"v=0\r\n"}"#), Err(WireError::MissingType)));
    assert!(matches!(
        parse_sdp(r#"{"sdp":"v=0\r\n","type":"foobar"}"#),
        Err(WireError::InvalidType(_))
    ));

    let ok = parse_sdp(r#"{"type":"offer","sdp":"v=0\r\nWebRTC\r\n"}"#).unwrap();
    assert_eq!(ok.sdp_type, wire::SdpType::Offer);
    assert_eq!(ok.sdp, "v=0\r\nWebRTC\r\n");
}

#[test]
fn s6_rolling_buffer_eviction_matches_the_spec_table() {
    let freed = Arc::new(std::sync::Mutex::new(Vec::new()));
    let freed_clone = freed.clone();
    let mut buf = RollingBuffer::new(
        4,
        Box::new(move |p: u32| freed_clone.lock().unwrap().push(p)),
    );

    let payloads: Vec<u64> = (0..7).map(|p| buf.append(p)).collect();
    assert_eq!(payloads, vec![0, 1, 2, 3, 4, 5, 6]);

    assert!(buf.get(0).is_none());
    assert!(buf.get(2).is_none());
    assert_eq!(buf.get(3).copied(), Some(3));
    assert_eq!(buf.get(6).copied(), Some(6));
    assert_eq!(*freed.lock().unwrap(), vec![0, 1, 2]);
}
