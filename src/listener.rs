//! Multiplexed socket readiness polling.
//!
//! Every candidate's transport ends up registered here once gathered, so
//! the agent has one inbound-packet path regardless of how many sockets it
//! opened. Sockets come in over `util::Conn`, the same trait the teacher's
//! candidates already hold, so no adapter layer is needed between the two.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use util::Conn;

pub const MAX_SOCKETS: usize = 64;
pub const POLL_CYCLE: Duration = Duration::from_millis(200);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub struct InboundPacket {
    pub socket_id: usize,
    pub data: Vec<u8>,
    pub from: std::net::SocketAddr,
}

struct Socket {
    id: usize,
    conn: Arc<dyn Conn + Send + Sync>,
}

/// Owns a bounded set of sockets and reads from all of them concurrently,
/// forwarding everything onto a single channel.
pub struct ConnectionListener {
    sockets: Arc<Mutex<Vec<Socket>>>,
    running: Arc<AtomicBool>,
    inbound_tx: mpsc::UnboundedSender<InboundPacket>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<InboundPacket>>,
}

impl ConnectionListener {
    /// Returns the listener already wired to its own inbound channel: the
    /// receiver lives behind a mutex on the listener itself so the agent
    /// (and any co-located signaling tunnel sharing the same listener) can
    /// both call `recv_inbound` without fighting over a channel half.
    pub fn new() -> ConnectionListener {
        let (tx, rx) = mpsc::unbounded_channel();
        ConnectionListener {
            sockets: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            inbound_tx: tx,
            inbound_rx: Mutex::new(rx),
        }
    }

    /// Pulls the next inbound packet off the shared channel. `None` once
    /// the poll loop has shut down and drained.
    pub async fn recv_inbound(&self) -> Option<InboundPacket> {
        self.inbound_rx.lock().await.recv().await
    }

    /// Registers a socket for polling under the caller-supplied id (e.g. an
    /// agent passes its local candidate index), so that inbound packets can
    /// be routed back to the right candidate without the listener and its
    /// caller needing two separate id spaces. Errors if the cap is reached.
    pub async fn add(&self, id: usize, conn: Arc<dyn Conn + Send + Sync>) -> Result<(), crate::error::Error> {
        let mut sockets = self.sockets.lock().await;
        if sockets.len() >= MAX_SOCKETS {
            return Err(crate::error::Error::ResourceExhausted(
                "connection listener socket cap reached".into(),
            ));
        }
        sockets.push(Socket { id, conn });
        Ok(())
    }

    pub async fn remove(&self, id: usize) {
        self.sockets.lock().await.retain(|s| s.id != id);
    }

    pub async fn remove_all(&self) {
        self.sockets.lock().await.clear();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the poll loop. Each cycle takes a snapshot of the current
    /// socket set (so `add`/`remove` mid-cycle never races a read) and
    /// races all of their `recv_from` calls with the cycle deadline.
    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        let sockets = self.sockets.clone();
        let running = self.running.clone();
        let tx = self.inbound_tx.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; crate::candidate::RECEIVE_MTU];
            while running.load(Ordering::SeqCst) {
                let snapshot: Vec<(usize, Arc<dyn Conn + Send + Sync>)> = {
                    let guard = sockets.lock().await;
                    guard.iter().map(|s| (s.id, s.conn.clone())).collect()
                };

                if snapshot.is_empty() {
                    tokio::time::sleep(POLL_CYCLE).await;
                    continue;
                }

                let reads = snapshot.into_iter().map(|(id, conn)| {
                    let mut local_buf = buf.clone();
                    async move {
                        let res = tokio::time::timeout(POLL_CYCLE, conn.recv_from(&mut local_buf)).await;
                        match res {
                            Ok(Ok((n, from))) => Some(InboundPacket {
                                socket_id: id,
                                data: local_buf[..n].to_vec(),
                                from,
                            }),
                            _ => None,
                        }
                    }
                });

                let results = futures_util::future::join_all(reads).await;
                for packet in results.into_iter().flatten() {
                    if tx.send(packet).is_err() {
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                let _ = &mut buf;
            }
        });
    }

    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10).min(SHUTDOWN_GRACE)).await;
        self.remove_all().await;
    }
}
