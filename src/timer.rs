//! Single-worker deferred-callback executor.
//!
//! One `tokio::time::sleep` driven task owns a min-heap of deadlines;
//! callers get a handle back and post cancellations/updates to it rather
//! than spawning their own timer task per callback (the "single timer
//! worker with a min-heap of deadlines" pattern this crate follows instead
//! of a cooperative-plus-blocking mix of sleeps).

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant};

pub type TimerId = u64;

enum Command {
    Add {
        delay: Duration,
        period: Option<Duration>,
        reply: oneshot::Sender<TimerId>,
    },
    Cancel(TimerId),
    Update {
        id: TimerId,
        period: Option<Duration>,
    },
    Shutdown,
}

/// A single fired timer; `id` lets the receiver match it back to whatever
/// it registered the timer for.
pub struct Fired {
    pub id: TimerId,
}

struct Entry {
    deadline: Instant,
    id: TimerId,
    period: Option<Duration>,
    seq: u64,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // ties broken by enqueue order so same-deadline timers fire FIFO
        (self.deadline, self.seq).cmp(&(other.deadline, other.seq))
    }
}

/// Handle to the background timer worker.
#[derive(Clone)]
pub struct TimerQueue {
    commands: mpsc::UnboundedSender<Command>,
}

impl TimerQueue {
    /// Spawns the worker task and returns a handle plus the channel on which
    /// fired timers are delivered.
    pub fn start() -> (TimerQueue, mpsc::UnboundedReceiver<Fired>) {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
        let (fired_tx, fired_rx) = mpsc::unbounded_channel::<Fired>();

        tokio::spawn(async move {
            let mut heap: BinaryHeap<Reverse<Entry>> = BinaryHeap::new();
            let mut tombstoned: std::collections::HashSet<TimerId> = std::collections::HashSet::new();
            let mut periods: std::collections::HashMap<TimerId, Duration> = std::collections::HashMap::new();
            let mut next_id: TimerId = 1;
            let mut next_seq: u64 = 0;

            loop {
                let sleep_fut = async {
                    match heap.peek() {
                        Some(Reverse(e)) => tokio::time::sleep_until(e.deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(Command::Add { delay, period, reply }) => {
                                let id = next_id;
                                next_id += 1;
                                next_seq += 1;
                                if let Some(p) = period {
                                    periods.insert(id, p);
                                }
                                heap.push(Reverse(Entry {
                                    deadline: Instant::now() + delay,
                                    id,
                                    period,
                                    seq: next_seq,
                                }));
                                let _ = reply.send(id);
                            }
                            Some(Command::Cancel(id)) => {
                                tombstoned.insert(id);
                                periods.remove(&id);
                            }
                            Some(Command::Update { id, period }) => {
                                match period {
                                    Some(p) => { periods.insert(id, p); }
                                    None => { periods.remove(&id); }
                                }
                            }
                            Some(Command::Shutdown) | None => break,
                        }
                    }
                    _ = sleep_fut => {
                        if let Some(Reverse(entry)) = heap.pop() {
                            if tombstoned.remove(&entry.id) {
                                continue;
                            }
                            if fired_tx.send(Fired { id: entry.id }).is_err() {
                                break;
                            }
                            let period = periods.get(&entry.id).copied().or(entry.period);
                            if let Some(p) = period {
                                next_seq += 1;
                                heap.push(Reverse(Entry {
                                    deadline: Instant::now() + p,
                                    id: entry.id,
                                    period: Some(p),
                                    seq: next_seq,
                                }));
                            }
                        }
                    }
                }
            }
        });

        (TimerQueue { commands: cmd_tx }, fired_rx)
    }

    /// Registers a one-shot (or, with `period` set, repeating) timer and
    /// returns its id.
    pub async fn add(&self, delay: Duration, period: Option<Duration>) -> TimerId {
        let (tx, rx) = oneshot::channel();
        let _ = self.commands.send(Command::Add { delay, period, reply: tx });
        rx.await.unwrap_or(0)
    }

    /// Cancellation is tombstone-based: if the timer already fired and is
    /// sitting in the channel buffer, the receiver still sees it once, but
    /// no further re-arm happens for a periodic timer.
    pub fn cancel(&self, id: TimerId) {
        let _ = self.commands.send(Command::Cancel(id));
    }

    pub fn update_period(&self, id: TimerId, period: Option<Duration>) {
        let _ = self.commands.send(Command::Update { id, period });
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

#[cfg(test)]
mod timer_test {
    use super::*;

    #[tokio::test]
    async fn fires_after_delay() {
        let (q, mut fired) = TimerQueue::start();
        let id = q.add(Duration::from_millis(10), None).await;
        let f = fired.recv().await.expect("timer fired");
        assert_eq!(f.id, id);
    }

    #[tokio::test]
    async fn cancel_suppresses_repeat() {
        let (q, mut fired) = TimerQueue::start();
        let id = q.add(Duration::from_millis(5), Some(Duration::from_millis(5))).await;
        let first = fired.recv().await.expect("first tick");
        assert_eq!(first.id, id);
        q.cancel(id);
        // drain whatever is already queued, then make sure nothing more shows
        // up for a window comfortably longer than the period.
        tokio::time::sleep(Duration::from_millis(40)).await;
        while fired.try_recv().is_ok() {}
        assert!(fired.try_recv().is_err());
    }
}
