use once_cell::sync::Lazy;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

fn now_millis() -> u64 {
    EPOCH.elapsed().as_millis() as u64
}

/// The process-wide global rate-limit lane.
///
/// Holds a single "not before" timestamp, advanced only forward via
/// compare-and-swap. A 429 with `X-RateLimit-Scope: shared` (or the legacy
/// `X-RateLimit-Global` header) advances it; every route consults it before
/// issuing a request.
#[derive(Debug, Default)]
pub struct GlobalLane {
    not_before_millis: AtomicU64,
}

impl GlobalLane {
    pub fn new() -> Self {
        Self {
            not_before_millis: AtomicU64::new(0),
        }
    }

    /// Advances the lane so no request starts before `now + retry_after`,
    /// unless a later deadline is already in effect.
    pub fn limit_for(&self, retry_after: Duration) {
        let candidate = now_millis() + retry_after.as_millis() as u64;
        let mut current = self.not_before_millis.load(Ordering::SeqCst);

        while candidate > current {
            match self.not_before_millis.compare_exchange_weak(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// Returns how long the caller must wait before the global lane opens,
    /// or `None` if it is already clear.
    pub fn wait_duration(&self) -> Option<Duration> {
        let not_before = self.not_before_millis.load(Ordering::SeqCst);
        let now = now_millis();

        (not_before > now).then(|| Duration::from_millis(not_before - now))
    }
}

#[cfg(test)]
mod tests {
    use super::GlobalLane;
    use std::time::Duration;

    #[test]
    fn stays_clear_until_limited() {
        let lane = GlobalLane::new();
        assert!(lane.wait_duration().is_none());
    }

    #[test]
    fn limit_moves_deadline_forward_only() {
        let lane = GlobalLane::new();
        lane.limit_for(Duration::from_millis(50));
        let first = lane.wait_duration().unwrap();

        // A shorter retry-after must not move the deadline backwards.
        lane.limit_for(Duration::from_millis(1));
        let second = lane.wait_duration().unwrap();

        assert!(second >= first - Duration::from_millis(5));
    }
}
