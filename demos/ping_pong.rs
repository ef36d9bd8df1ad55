//! Manual-exchange ping/pong demo: gathers one local host candidate, prints
//! it (plus ufrag/pwd) as a line of JSON to copy into the peer's stdin, and
//! once the peer's line is pasted back starts the agent and pings the peer
//! over the pair it nominates.

use std::error::Error;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use clap::{App, AppSettings, Arg};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use rendezvous_ice::agent::{Agent, AgentConfig};
use rendezvous_ice::listener::ConnectionListener;
use rendezvous_ice::network_type::NetworkType;
use rendezvous_ice::timer::TimerQueue;

#[derive(Serialize, Deserialize)]
struct PeerInfo {
    candidate: String,
    ufrag: String,
    pwd: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let app = App::new("ICE ping/pong demo")
        .version("0.1.0")
        .author("Rain Liu <yliu@webrtc.rs>")
        .about("Exchanges one host candidate by hand, then pings over the nominated pair")
        .setting(AppSettings::DeriveDisplayOrder)
        .arg(
            Arg::with_name("controlling")
                .takes_value(false)
                .long("controlling")
                .help("run as the ICE-controlling agent"),
        );

    let matches = app.get_matches();
    let is_controlling = matches.is_present("controlling");

    let listener = Arc::new(ConnectionListener::new());
    listener.start();
    let (timers, fired) = TimerQueue::start();
    let config = AgentConfig {
        network_types: vec![NetworkType::UDP4],
        ..AgentConfig::default()
    };
    let agent = Agent::new(config, listener, timers, fired);

    let gathered = Arc::new(Notify::new());
    let gathered_signal = gathered.clone();
    let local_candidate = Arc::new(tokio::sync::Mutex::new(None));
    let local_candidate_store = local_candidate.clone();
    agent
        .on_candidate(Box::new(move |c| {
            if let Some(c) = c {
                let store = local_candidate_store.clone();
                let signal = gathered_signal.clone();
                tokio::spawn(async move {
                    *store.lock().await = Some(c.marshal());
                    signal.notify_one();
                });
            }
        }))
        .await;

    agent
        .on_receive(Box::new(|bytes| {
            println!("recv: {}", String::from_utf8_lossy(&bytes));
        }))
        .await;

    agent.start_gathering().await?;
    gathered.notified().await;

    let (ufrag, pwd) = agent.get_local_user_credentials().await;
    let candidate = local_candidate.lock().await.clone().expect("candidate gathered");
    let info = PeerInfo { candidate, ufrag, pwd };
    println!("{}", serde_json::to_string(&info)?);
    println!("paste the peer's line below and press enter:");

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let peer: PeerInfo = serde_json::from_str(line.trim())?;

    agent.add_remote_candidate(&peer.candidate).await?;
    agent.start(peer.ufrag, peer.pwd, is_controlling).await?;

    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if agent.get_selected_candidate_pair().await.is_some() {
            break;
        }
    }
    println!("connected");

    if is_controlling {
        loop {
            agent.send(b"ping").await?;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    } else {
        std::future::pending::<()>().await;
    }

    Ok(())
}
