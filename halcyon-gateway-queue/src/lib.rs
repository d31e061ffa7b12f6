//! The identify gate: throttles gateway login ("Identify") events across
//! shards so the client never exceeds Discord's `max_concurrency` rule.
//!
//! Shards are bucketed by `shard_id % max_concurrency`. Shards in different
//! buckets may identify in parallel; shards sharing a bucket must wait for
//! one another, spaced out by [`IdentifyGate::WINDOW`].

use std::{fmt::Debug, future::Future, pin::Pin, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    time::sleep,
};

/// A concurrency-limiting gate for gateway identify events.
///
/// Implementations must be safe to share across every shard; the default
/// [`ConcurrentIdentifyGate`] is the one a [`ShardManager`](https://docs.rs/halcyon-gateway)
/// uses unless the embedder supplies its own (e.g. to proxy identify
/// concurrency through a centralized service for a multi-process bot).
pub trait IdentifyGate: Debug + Send + Sync {
    /// Blocks until `shard_id` is admitted to identify.
    fn acquire(&self, shard_id: u64) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// The default identify gate: one FIFO queue per `shard_id % max_concurrency`
/// bucket, each paced at one admission per [`ConcurrentIdentifyGate::WINDOW`].
#[derive(Debug)]
pub struct ConcurrentIdentifyGate {
    buckets: Vec<mpsc::UnboundedSender<oneshot::Sender<()>>>,
}

impl ConcurrentIdentifyGate {
    /// The gateway's identify rate limit window.
    pub const WINDOW: Duration = Duration::from_secs(5);

    /// Creates a gate with `max_concurrency` buckets, spawning one waiter
    /// task per bucket.
    pub fn new(max_concurrency: u64) -> Arc<Self> {
        let max_concurrency = max_concurrency.max(1);
        let mut buckets = Vec::with_capacity(max_concurrency as usize);

        for bucket_id in 0..max_concurrency {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(waiter(bucket_id, rx));
            buckets.push(tx);
        }

        Arc::new(Self { buckets })
    }
}

impl IdentifyGate for ConcurrentIdentifyGate {
    fn acquire(&self, shard_id: u64) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let bucket = (shard_id % self.buckets.len() as u64) as usize;
            let (tx, rx) = oneshot::channel();

            if self.buckets[bucket].send(tx).is_err() {
                tracing::warn!(shard_id, bucket, "identify gate bucket task gone, admitting immediately");
                return;
            }

            let _ = rx.await;
        })
    }
}

async fn waiter(bucket_id: u64, mut rx: mpsc::UnboundedReceiver<oneshot::Sender<()>>) {
    while let Some(tx) = rx.recv().await {
        let _ = tx.send(());
        tracing::debug!(bucket_id, "identify admitted, pacing next admission");
        sleep(ConcurrentIdentifyGate::WINDOW).await;
    }
}

/// A gate that never throttles, for proxy/gateway-in-front-of-you setups
/// where something else already enforces `max_concurrency`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpIdentifyGate;

impl IdentifyGate for NoOpIdentifyGate {
    fn acquire(&self, _shard_id: u64) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::{ConcurrentIdentifyGate, IdentifyGate, NoOpIdentifyGate};
    use static_assertions::assert_impl_all;
    use std::time::{Duration, Instant};

    assert_impl_all!(ConcurrentIdentifyGate: IdentifyGate, Send, Sync);
    assert_impl_all!(NoOpIdentifyGate: IdentifyGate, Send, Sync);

    #[tokio::test]
    async fn different_buckets_admit_concurrently() {
        let gate = ConcurrentIdentifyGate::new(2);
        let start = Instant::now();

        gate.acquire(0).await;
        gate.acquire(1).await;

        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn same_bucket_serializes_with_spacing() {
        let gate = ConcurrentIdentifyGate::new(1);

        gate.acquire(0).await;
        let start = Instant::now();
        gate.acquire(1).await;

        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn no_op_gate_never_blocks() {
        let gate = NoOpIdentifyGate;
        let start = Instant::now();
        gate.acquire(42).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
