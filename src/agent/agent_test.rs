use super::*;
use std::sync::Arc;

fn new_test_agent() -> Arc<Agent> {
    let listener = Arc::new(ConnectionListener::new());
    let (timers, fired) = TimerQueue::start();
    Agent::new(AgentConfig::default(), listener, timers, fired)
}

#[tokio::test]
async fn start_rejects_empty_remote_credentials() {
    let agent = new_test_agent();
    assert!(agent.start(String::new(), "pwd".into(), true).await.is_err());
    assert!(agent.start("ufrag".into(), String::new(), true).await.is_err());
}

#[tokio::test]
async fn start_latches_role_and_is_not_reentrant() {
    let agent = new_test_agent();
    agent.start("ufrag".into(), "password-that-is-long-enough".into(), true).await.unwrap();
    let (ufrag, pwd) = agent.get_remote_user_credentials().await;
    assert_eq!(ufrag, "ufrag");
    assert_eq!(pwd, "password-that-is-long-enough");

    let err = agent.start("ufrag2".into(), "password-that-is-long-enough".into(), true).await;
    assert!(err.is_err(), "starting twice must fail");
}

#[tokio::test]
async fn send_before_connected_is_invalid_state() {
    let agent = new_test_agent();
    let err = agent.send(b"hello").await.unwrap_err();
    assert_eq!(err.kind(), crate::error::Kind::InvalidState);
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let agent = new_test_agent();
    agent.shutdown().await;
    agent.shutdown().await;
}

#[tokio::test]
async fn add_remote_candidate_dedupes_by_kind_and_address() {
    let agent = new_test_agent();
    let raw = Candidate::new_host("udp", "127.0.0.1".to_owned(), 5000, crate::candidate::COMPONENT_RTP)
        .unwrap()
        .marshal();
    agent.add_remote_candidate(&raw).await.unwrap();
    agent.add_remote_candidate(&raw).await.unwrap();
    let inner = agent.inner.lock().await;
    assert_eq!(inner.remote_candidates.len(), 1);
}

#[test]
fn state_table_only_allows_the_spec_loopbacks() {
    use IceAgentState::*;
    let table = AgentStateTable;
    // forward ladder
    assert!(table.accepts(New, CheckingConnection));
    assert!(table.accepts(CheckingConnection, Nominating));
    assert!(table.accepts(Nominating, Connected));
    assert!(table.accepts(Connected, Ready));
    // the loopable edges: a disconnect can resolve either by traffic
    // resuming directly or by a fresh connectivity check round
    assert!(table.accepts(Connected, Disconnected));
    assert!(table.accepts(Disconnected, Connected));
    assert!(table.accepts(Disconnected, CheckingConnection));
    assert!(table.accepts(Disconnected, Failed));
    // everything else is a one-way ladder: Ready cannot go back to Connected
    assert!(!table.accepts(Ready, Connected));
    assert!(!table.accepts(New, Connected));
}

#[test]
fn failed_and_closed_are_terminal() {
    let table = AgentStateTable;
    assert!(table.is_terminal(IceAgentState::Failed));
    assert!(table.is_terminal(IceAgentState::Closed));
    assert!(!table.is_terminal(IceAgentState::Connected));
}
