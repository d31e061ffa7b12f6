use crate::registry::BoxFuture;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{mpsc, Mutex as AsyncMutex},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// A unit of async work submitted to a [`WorkerPool`].
pub type Task = BoxFuture;

/// Tuning for a [`WorkerPool`].
#[derive(Clone, Debug)]
pub struct WorkerPoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub queue_capacity: usize,
    /// Queue occupancy (0.0-1.0) above which `submit` spawns an extra
    /// worker beyond `min_workers`, up to `max_workers`.
    pub growth_threshold: f64,
    /// How long a worker spawned beyond `min_workers` waits for a task
    /// before exiting.
    pub idle_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 16,
            queue_capacity: 256,
            growth_threshold: 0.75,
            idle_timeout: Duration::from_secs(10),
        }
    }
}

struct PoolRef {
    tx: mpsc::Sender<Task>,
    rx: AsyncMutex<mpsc::Receiver<Task>>,
    active_workers: AtomicUsize,
    cancel: CancellationToken,
    config: WorkerPoolConfig,
}

/// A bounded, elastic pool of workers draining a shared task queue.
///
/// `min_workers` run for the pool's lifetime; `submit` spawns additional
/// workers, up to `max_workers`, once queue occupancy crosses
/// `growth_threshold`. Workers beyond the minimum exit after sitting idle
/// for `idle_timeout`. A full queue causes `submit` to drop the task rather
/// than block or grow unbounded — there is no retry.
///
/// Cheaply [`Clone`]-able; every clone shares the same queue and workers.
#[derive(Clone)]
pub struct WorkerPool(Arc<PoolRef>);

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));

        let pool = Self(Arc::new(PoolRef {
            tx,
            rx: AsyncMutex::new(rx),
            active_workers: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
            config,
        }));

        for _ in 0..pool.0.config.min_workers {
            pool.spawn_worker(true);
        }

        pool
    }

    /// Enqueues a task, spawning an extra worker first if the queue is
    /// crowded. Returns `false` (the task is dropped) if the queue is full
    /// or the pool has been shut down.
    pub fn submit(&self, task: Task) -> bool {
        if self.0.cancel.is_cancelled() {
            return false;
        }

        if self.should_grow() {
            self.spawn_worker(false);
        }

        self.0.tx.try_send(task).is_ok()
    }

    /// Signals every worker to stop and stops accepting new tasks.
    /// Idempotent: calling this more than once is a no-op after the first.
    pub fn shutdown(&self) {
        self.0.cancel.cancel();
    }

    pub fn active_workers(&self) -> usize {
        self.0.active_workers.load(Ordering::Relaxed)
    }

    fn should_grow(&self) -> bool {
        let capacity = self.0.config.queue_capacity.max(1);
        let occupied = capacity.saturating_sub(self.0.tx.capacity());
        let occupancy = occupied as f64 / capacity as f64;

        occupancy >= self.0.config.growth_threshold
            && self.0.active_workers.load(Ordering::Relaxed) < self.0.config.max_workers
    }

    fn spawn_worker(&self, core: bool) {
        let pool = Arc::clone(&self.0);
        pool.active_workers.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            loop {
                let next = {
                    let mut rx = pool.rx.lock().await;

                    if core {
                        tokio::select! {
                            _ = pool.cancel.cancelled() => None,
                            task = rx.recv() => task,
                        }
                    } else {
                        tokio::select! {
                            _ = pool.cancel.cancelled() => None,
                            result = timeout(pool.config.idle_timeout, rx.recv()) => result.ok().flatten(),
                        }
                    }
                };

                match next {
                    Some(task) => task.await,
                    None => break,
                }
            }

            pool.active_workers.fetch_sub(1, Ordering::SeqCst);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{WorkerPool, WorkerPoolConfig};
    use static_assertions::assert_impl_all;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    assert_impl_all!(WorkerPool: Clone, Send, Sync);

    #[tokio::test]
    async fn submitted_tasks_run() {
        let pool = WorkerPool::new(WorkerPoolConfig { min_workers: 1, ..WorkerPoolConfig::default() });
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);

        assert!(pool.submit(Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn full_queue_drops_the_task() {
        let pool = WorkerPool::new(WorkerPoolConfig {
            min_workers: 0,
            max_workers: 0,
            queue_capacity: 1,
            ..WorkerPoolConfig::default()
        });

        assert!(pool.submit(Box::pin(async {})));
        assert!(!pool.submit(Box::pin(async {})));
    }

    #[tokio::test]
    async fn shutdown_stops_accepting_tasks() {
        let pool = WorkerPool::new(WorkerPoolConfig::default());
        pool.shutdown();
        assert!(!pool.submit(Box::pin(async {})));
    }
}
