//! The REST rate-limit engine: per-route token buckets driven by response
//! headers, and a process-wide global lane shared by all routes.

mod bucket;
mod global;
pub mod headers;
pub mod routing;

pub use self::{headers::RatelimitHeaders, routing::{Method, RouteKey}};

use self::{
    bucket::{Bucket, BucketQueueTask, TimeRemaining},
    global::GlobalLane,
};
use futures_channel::oneshot::{self, Receiver, Sender};
use std::{
    collections::hash_map::{Entry, HashMap},
    sync::{Arc, Mutex},
    time::Duration,
};

/// A ticket received before issuing a request: the caller awaits it, then
/// makes the HTTP call, then sends the parsed response headers back
/// through the inner [`Sender`] so the bucket can update its state before
/// releasing the next queued ticket.
pub type Ticket = Receiver<Sender<Option<RatelimitHeaders>>>;

/// Enforces Discord's per-route token-bucket limits and the shared global
/// lane. One `RateLimiter` is meant to be shared (it is cheaply `Clone`)
/// across every request a [`Requester`](https://docs.rs/halcyon-http) makes.
#[derive(Clone, Debug, Default)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<RouteKey, Arc<Bucket>>>>,
    global: Arc<GlobalLane>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a request for `route` and returns a ticket. The background
    /// bucket task spawned on first reference to a route drains the queue
    /// one entry at a time, so at most one request per `(template,
    /// majorParam)` is in flight.
    pub fn ticket(&self, route: RouteKey) -> Ticket {
        tracing::debug!(template = %route.template, "queuing for route");

        let (tx, rx) = oneshot::channel();
        let (bucket, fresh) = self.entry(route.clone(), tx);

        if fresh {
            tokio::spawn(
                BucketQueueTask::new(bucket, Arc::clone(&self.buckets), Arc::clone(&self.global), route).run(),
            );
        }

        rx
    }

    /// Estimates the time left until `route` can be used without waiting,
    /// or `None` if the route is unknown or currently has tokens free.
    ///
    /// This is a best-effort estimate based on the bucket's last known
    /// `reset_after` window; it does not account for elapsed time since the
    /// window started, since that requires awaiting the bucket's internal
    /// lock. Callers that need an exact wait should just queue a ticket.
    pub fn time_until_available(&self, route: &RouteKey) -> Option<Duration> {
        let buckets = self.buckets.lock().expect("ratelimit buckets poisoned");
        let bucket = buckets.get(route)?;

        (bucket.remaining() == 0).then(|| Duration::from_millis(bucket.reset_after()))
    }

    fn entry(&self, route: RouteKey, tx: Sender<Sender<Option<RatelimitHeaders>>>) -> (Arc<Bucket>, bool) {
        let mut buckets = self.buckets.lock().expect("ratelimit buckets poisoned");

        match buckets.entry(route.clone()) {
            Entry::Occupied(bucket) => {
                let bucket = bucket.into_mut();
                bucket.queue.push(tx);

                (Arc::clone(bucket), false)
            }
            Entry::Vacant(entry) => {
                let bucket = Bucket::new(route);
                bucket.queue.push(tx);

                let bucket = Arc::new(bucket);
                entry.insert(Arc::clone(&bucket));

                (bucket, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Method, RateLimiter, RouteKey};
    use static_assertions::assert_impl_all;
    use std::time::Duration;

    assert_impl_all!(RateLimiter: Clone, Send, Sync);

    #[tokio::test]
    async fn ticket_round_trips_without_a_known_limit() {
        let limiter = RateLimiter::new();
        let route = RouteKey::normalize(Method::Get, "/users/@me");

        let ticket = limiter.ticket(route);
        let responder = ticket.await.expect("bucket task alive");
        let _ = responder.send(None);
    }

    #[tokio::test]
    async fn distinct_routes_get_distinct_buckets() {
        let limiter = RateLimiter::new();

        let a = limiter.ticket(RouteKey::normalize(Method::Get, "/users/@me"));
        let b = limiter.ticket(RouteKey::normalize(Method::Get, "/gateway/bot"));

        let ra = tokio::time::timeout(Duration::from_secs(1), a).await;
        let rb = tokio::time::timeout(Duration::from_secs(1), b).await;

        assert!(ra.is_ok());
        assert!(rb.is_ok());
    }
}
