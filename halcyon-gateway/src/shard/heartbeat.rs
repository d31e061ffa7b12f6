use futures_channel::mpsc::UnboundedSender;
use halcyon_model::gateway::{payload::OutboundPayload, OpCode};
use rand::Rng;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::{
    sync::{Mutex, Notify},
    time::sleep,
};
use tokio_tungstenite::tungstenite::Message;

const RECENT_LATENCIES: usize = 5;

/// A snapshot of heartbeat round-trip timing for a shard.
#[derive(Clone, Debug, Default)]
pub struct Latency {
    pub average: Option<Duration>,
    pub heartbeats: u32,
    pub recent: VecDeque<Duration>,
    pub received: Option<Instant>,
    pub sent: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct Heartbeats {
    received: Mutex<Option<Instant>>,
    recent: Mutex<VecDeque<Duration>>,
    sent: Mutex<Option<Instant>>,
    total_iterations: AtomicU32,
    total_time: AtomicU64,
}

impl Heartbeats {
    pub async fn last_acked(&self) -> bool {
        let received = self.received.lock().await;
        let sent = self.sent.lock().await;

        match (*received, *sent) {
            (Some(received), Some(sent)) => received >= sent,
            (Some(_), None) => true,
            (None, None) => true,
            (None, Some(_)) => false,
        }
    }

    pub async fn receive(&self) {
        let now = Instant::now();
        let mut received = self.received.lock().await;
        let sent = *self.sent.lock().await;

        if let Some(sent) = sent {
            let elapsed = now.saturating_duration_since(sent);

            self.total_iterations.fetch_add(1, Ordering::Relaxed);
            self.total_time.fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);

            let mut recent = self.recent.lock().await;
            recent.push_back(elapsed);

            while recent.len() > RECENT_LATENCIES {
                recent.pop_front();
            }
        }

        received.replace(now);
    }

    pub async fn send(&self) {
        *self.received.lock().await = None;
        self.sent.lock().await.replace(Instant::now());
    }

    pub async fn latency(&self) -> Latency {
        let iterations = self.total_iterations.load(Ordering::Relaxed);
        let total = self.total_time.load(Ordering::Relaxed);

        Latency {
            average: (iterations > 0).then(|| Duration::from_millis(total / u64::from(iterations))),
            heartbeats: iterations,
            recent: self.recent.lock().await.clone(),
            received: *self.received.lock().await,
            sent: *self.sent.lock().await,
        }
    }
}

/// Drives the heartbeat loop for one shard session.
///
/// Sends opcode 1 every `interval` milliseconds (jittered on the first
/// tick to desynchronize shards that started together), tracking whether
/// the previous heartbeat was acknowledged. Two consecutive un-acked
/// heartbeats end the loop and notify `heartbeat_failed`, which the
/// shard's read loop watches so it can proactively close the socket with
/// code 4000 and reconnect rather than waiting on the server or the OS to
/// notice the dead connection.
pub struct Heartbeater {
    heartbeats: Arc<Heartbeats>,
    interval: u64,
    seq: Arc<AtomicU64>,
    tx: UnboundedSender<Message>,
    heartbeat_failed: Arc<Notify>,
}

impl Heartbeater {
    pub fn new(
        heartbeats: Arc<Heartbeats>,
        interval: u64,
        seq: Arc<AtomicU64>,
        tx: UnboundedSender<Message>,
        heartbeat_failed: Arc<Notify>,
    ) -> Self {
        Self {
            heartbeats,
            interval,
            seq,
            tx,
            heartbeat_failed,
        }
    }

    /// Runs until two consecutive heartbeats go unacknowledged, or the
    /// socket sender is gone (shard shutting down).
    pub async fn run(self) {
        let jitter = rand::thread_rng().gen_range(0.0..1.0);
        sleep(Duration::from_secs_f64(self.interval as f64 / 1000.0 * jitter)).await;

        let mut missed_acks = 0u8;

        loop {
            if !self.heartbeats.last_acked().await {
                missed_acks += 1;

                if missed_acks >= 2 {
                    tracing::warn!("two heartbeats went unacknowledged, ending heartbeater");
                    self.heartbeat_failed.notify_one();
                    return;
                }
            } else {
                missed_acks = 0;
            }

            if self.send().is_err() {
                tracing::debug!("heartbeat sender gone, ending heartbeater");
                return;
            }

            self.heartbeats.send().await;
            sleep(Duration::from_millis(self.interval)).await;
        }
    }

    fn send(&self) -> Result<(), ()> {
        let seq = self.seq.load(Ordering::Relaxed);
        let payload = OutboundPayload::new(OpCode::Heartbeat, if seq == 0 { None } else { Some(seq) });
        let bytes = serde_json::to_vec(&payload).map_err(|_| ())?;

        self.tx.unbounded_send(Message::Binary(bytes)).map_err(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::{Heartbeater, Heartbeats, Notify};
    use std::{
        sync::{atomic::AtomicU64, Arc},
        time::Duration,
    };

    #[tokio::test]
    async fn unsent_heartbeat_counts_as_acked() {
        let heartbeats = Heartbeats::default();
        assert!(heartbeats.last_acked().await);
    }

    #[tokio::test]
    async fn sent_without_receive_is_unacked() {
        let heartbeats = Heartbeats::default();
        heartbeats.send().await;
        assert!(!heartbeats.last_acked().await);
    }

    #[tokio::test]
    async fn receive_after_send_acks() {
        let heartbeats = Heartbeats::default();
        heartbeats.send().await;
        heartbeats.receive().await;
        assert!(heartbeats.last_acked().await);
    }

    #[tokio::test]
    async fn two_missed_acks_notifies_heartbeat_failed() {
        let heartbeats = Arc::new(Heartbeats::default());
        let seq = Arc::new(AtomicU64::new(0));
        let heartbeat_failed = Arc::new(Notify::new());
        let (tx, _rx) = futures_channel::mpsc::unbounded();

        let heartbeater =
            Heartbeater::new(Arc::clone(&heartbeats), 10, Arc::clone(&seq), tx, Arc::clone(&heartbeat_failed));

        tokio::spawn(heartbeater.run());

        // Nothing ever acks, so the heartbeater should give up after two
        // consecutive unacknowledged beats and notify the read loop.
        tokio::time::timeout(Duration::from_secs(2), heartbeat_failed.notified())
            .await
            .expect("heartbeat_failed was never notified");
    }
}
