use crate::{global::GlobalLane, headers::RatelimitHeaders, routing::RouteKey};
use futures_channel::{
    mpsc::{self, UnboundedReceiver, UnboundedSender},
    oneshot::{self, Sender},
};
use futures_util::{lock::Mutex, stream::StreamExt};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex as SyncMutex,
    },
    time::{Duration, Instant},
};
use tokio::time::{sleep, timeout};

#[derive(Clone, Debug)]
pub enum TimeRemaining {
    Finished,
    NotStarted,
    Some(Duration),
}

/// Per-route token bucket, mutated only from its [`BucketQueueTask`].
#[derive(Debug)]
pub struct Bucket {
    pub limit: AtomicU64,
    pub route: RouteKey,
    pub queue: BucketQueue,
    pub remaining: AtomicU64,
    pub reset_after: AtomicU64,
    pub started_at: Mutex<Option<Instant>>,
}

impl Bucket {
    /// A freshly created bucket has never seen a response, so it allows
    /// exactly one request through before it knows the real limit.
    pub fn new(route: RouteKey) -> Self {
        Self {
            limit: AtomicU64::new(1),
            route,
            queue: BucketQueue::default(),
            remaining: AtomicU64::new(1),
            reset_after: AtomicU64::new(0),
            started_at: Mutex::new(None),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit.load(Ordering::Relaxed)
    }

    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }

    pub fn reset_after(&self) -> u64 {
        self.reset_after.load(Ordering::Relaxed)
    }

    pub async fn time_remaining(&self) -> TimeRemaining {
        let reset_after = self.reset_after();
        let started_at = match *self.started_at.lock().await {
            Some(v) => v,
            None => return TimeRemaining::NotStarted,
        };
        let elapsed = started_at.elapsed();

        if elapsed > Duration::from_millis(reset_after) {
            return TimeRemaining::Finished;
        }

        TimeRemaining::Some(Duration::from_millis(reset_after) - elapsed)
    }

    pub async fn try_reset(&self) -> bool {
        if self.started_at.lock().await.is_none() {
            return false;
        }

        if let TimeRemaining::Finished = self.time_remaining().await {
            self.remaining.store(self.limit(), Ordering::Relaxed);
            *self.started_at.lock().await = None;

            true
        } else {
            false
        }
    }

    /// Applies a response's rate-limit headers, or (when none were present)
    /// optimistically decrements `remaining` so a burst of un-headered
    /// requests still eventually backs off.
    pub async fn update(&self, ratelimits: Option<(u64, u64, u64)>) {
        {
            let mut started_at = self.started_at.lock().await;

            if started_at.is_none() {
                started_at.replace(Instant::now());
            }
        }

        if let Some((limit, remaining, reset_after)) = ratelimits {
            self.limit.store(limit, Ordering::SeqCst);
            self.reset_after.store(reset_after, Ordering::SeqCst);
            self.remaining.store(remaining, Ordering::Relaxed);
        } else {
            self.remaining.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

type HeaderResponder = Sender<Option<RatelimitHeaders>>;

#[derive(Debug)]
pub struct BucketQueue {
    rx: Mutex<UnboundedReceiver<Sender<HeaderResponder>>>,
    tx: UnboundedSender<Sender<HeaderResponder>>,
}

impl BucketQueue {
    pub fn push(&self, tx: Sender<HeaderResponder>) {
        let _ = self.tx.unbounded_send(tx);
    }

    pub async fn pop(&self, timeout_duration: Duration) -> Option<Sender<HeaderResponder>> {
        let mut rx = self.rx.lock().await;

        timeout(timeout_duration, StreamExt::next(&mut *rx)).await.ok().flatten()
    }
}

impl Default for BucketQueue {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded();

        Self {
            rx: Mutex::new(rx),
            tx,
        }
    }
}

/// The background task owning one bucket: pops queued tickets one at a
/// time, waits out the bucket's reset and the global lane, hands the
/// caller a one-shot to report back the response headers, then applies
/// them before popping the next ticket.
pub(crate) struct BucketQueueTask {
    bucket: Arc<Bucket>,
    buckets: Arc<SyncMutex<HashMap<RouteKey, Arc<Bucket>>>>,
    global: Arc<GlobalLane>,
    route: RouteKey,
}

impl BucketQueueTask {
    const WAIT: Duration = Duration::from_secs(10);

    pub fn new(
        bucket: Arc<Bucket>,
        buckets: Arc<SyncMutex<HashMap<RouteKey, Arc<Bucket>>>>,
        global: Arc<GlobalLane>,
        route: RouteKey,
    ) -> Self {
        Self {
            bucket,
            buckets,
            global,
            route,
        }
    }

    pub async fn run(self) {
        let span = tracing::debug_span!("ratelimit bucket queue", template = %self.route.template);

        while let Some(queue_tx) = self.next().await {
            if let Some(wait) = self.global.wait_duration() {
                tracing::debug!(parent: &span, millis = %wait.as_millis(), "waiting for global lane");
                sleep(wait).await;
            }

            let (tx, rx) = oneshot::channel();
            let _ = queue_tx.send(tx);

            match timeout(Self::WAIT, rx).await {
                Ok(Ok(Some(headers))) => self.handle_headers(&headers).await,
                Ok(Err(_)) | Err(_) | Ok(Ok(None)) => {
                    tracing::debug!(parent: &span, "ticket holder never reported back");
                }
            }
        }

        tracing::debug!(parent: &span, "bucket idle, removing");
        self.buckets
            .lock()
            .expect("ratelimit buckets poisoned")
            .remove(&self.route);
    }

    async fn handle_headers(&self, headers: &RatelimitHeaders) {
        let ratelimits = match headers {
            RatelimitHeaders::GlobalLimited { retry_after } => {
                self.global.limit_for(Duration::from_millis(*retry_after));
                None
            }
            RatelimitHeaders::None => return,
            RatelimitHeaders::Present {
                limit,
                remaining,
                reset_after,
                global_scope,
                ..
            } => {
                if *global_scope {
                    self.global.limit_for(Duration::from_millis(*reset_after));
                }

                Some((*limit, *remaining, *reset_after))
            }
        };

        self.bucket.update(ratelimits).await;
    }

    async fn next(&self) -> Option<Sender<HeaderResponder>> {
        self.wait_if_needed().await;
        self.bucket.queue.pop(Self::WAIT).await
    }

    async fn wait_if_needed(&self) {
        let wait = {
            if self.bucket.remaining() > 0 {
                return;
            }

            match self.bucket.time_remaining().await {
                TimeRemaining::Finished => {
                    self.bucket.try_reset().await;
                    return;
                }
                TimeRemaining::NotStarted => return,
                TimeRemaining::Some(dur) => dur,
            }
        };

        sleep(wait).await;
        self.bucket.try_reset().await;
    }
}
