//! Typed event dispatch for the Halcyon ecosystem: parses raw gateway
//! payloads into [`halcyon_model::gateway::Event`], updates the cache ahead
//! of user handlers, and runs those handlers either inline or through a
//! bounded [`WorkerPool`].
//!
//! Entity schemas, cache replacement policy, and the transport the raw
//! bytes arrive over are out of scope here; see `halcyon-model`,
//! `halcyon-cache-inmemory`, and `halcyon-gateway` respectively.

mod pool;
mod registry;

pub use self::{
    pool::{Task, WorkerPool, WorkerPoolConfig},
    registry::{Handler, HandlerRegistry, HandlerRegistryBuilder},
};

use futures_util::FutureExt;
use halcyon_model::{gateway::Event, Cache};
use serde_json::value::RawValue;
use std::{panic::AssertUnwindSafe, sync::Arc};

/// How a [`Dispatcher`] runs handlers once an event is ready.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExecutionMode {
    /// Run every handler sequentially on the task that called `dispatch`.
    #[default]
    Sync,
    /// Submit each handler invocation to the dispatcher's [`WorkerPool`].
    Async,
}

/// Fans a shard's raw dispatch payloads out to registered handlers.
///
/// Cheaply [`Clone`]-able; every clone shares the same registry, cache, and
/// worker pool.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    cache: Option<Arc<dyn Cache>>,
    mode: ExecutionMode,
    pool: Option<WorkerPool>,
}

impl Dispatcher {
    /// # Panics
    ///
    /// Panics if `mode` is [`ExecutionMode::Async`] and `pool` is `None`.
    pub fn new(registry: HandlerRegistry, cache: Option<Arc<dyn Cache>>, mode: ExecutionMode, pool: Option<WorkerPool>) -> Self {
        assert!(
            mode != ExecutionMode::Async || pool.is_some(),
            "async execution mode requires a worker pool"
        );

        Self { registry: Arc::new(registry), cache, mode, pool }
    }

    /// Parses a raw dispatch payload, applies it to the cache, then runs
    /// every handler registered for `event_name`.
    ///
    /// Unknown event names and events with no registered handlers return
    /// immediately after the cache update, if any. A handler's parsing and
    /// cache-update effects always complete before any handler for that
    /// event is invoked, in both execution modes.
    pub async fn dispatch(&self, shard_id: u64, event_name: &str, data: &RawValue) {
        let event = match Event::from_raw(event_name, data) {
            Some(Ok(event)) => event,
            Some(Err(error)) => {
                tracing::warn!(shard_id, event_name, %error, "dropping unparseable dispatch payload");
                return;
            }
            None => return,
        };

        if let Some(cache) = &self.cache {
            cache.update(&event);
        }

        let Some(handlers) = self.registry.handlers(event_name) else {
            return;
        };

        let event = Arc::new(event);

        match self.mode {
            ExecutionMode::Sync => {
                for handler in handlers {
                    Self::run_guarded(shard_id, event_name, Arc::clone(&event), Arc::clone(handler)).await;
                }
            }
            ExecutionMode::Async => {
                let pool = self.pool.as_ref().expect("async execution mode requires a worker pool");

                for handler in handlers {
                    let event = Arc::clone(&event);
                    let handler = Arc::clone(handler);
                    let owned_event_name = event_name.to_owned();

                    let submitted = pool.submit(Box::pin(async move {
                        Self::run_guarded(shard_id, &owned_event_name, event, handler).await;
                    }));

                    if !submitted {
                        tracing::warn!(shard_id, event_name, "dropped handler task: worker pool queue full");
                    }
                }
            }
        }
    }

    /// Runs a single handler behind a panic boundary. A fault is caught,
    /// logged with the event name, shard ID, and fault value, and does not
    /// propagate to the caller.
    async fn run_guarded(shard_id: u64, event_name: &str, event: Arc<Event>, handler: Handler) {
        match AssertUnwindSafe(handler(event)).catch_unwind().await {
            Ok(()) => {}
            Err(fault) => {
                let message = fault
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| fault.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_owned());

                tracing::error!(shard_id, event_name, fault = %message, "handler panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Dispatcher, ExecutionMode, HandlerRegistry};
    use halcyon_model::{gateway::Event, Cache, Id};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    #[derive(Debug, Default)]
    struct RecordingCache {
        updates: Mutex<Vec<&'static str>>,
    }

    impl Cache for RecordingCache {
        fn update(&self, event: &Event) {
            self.updates.lock().unwrap().push(event.name());
        }

        fn guild(&self, _guild_id: Id) -> Option<halcyon_model::entity::Guild> {
            None
        }

        fn channel(&self, _channel_id: Id) -> Option<halcyon_model::entity::Channel> {
            None
        }

        fn session_id(&self) -> Option<String> {
            None
        }
    }

    fn message_create_payload() -> Box<serde_json::value::RawValue> {
        serde_json::value::RawValue::from_string(
            r#"{"id":"1","channel_id":"2","author":{"id":"3","username":"a","discriminator":"0001"},"content":"hi"}"#.to_owned(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn cache_updates_before_handler_runs() {
        let cache = Arc::new(RecordingCache::default());
        let seen_cache_update = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&seen_cache_update);
        let cache_for_assert = Arc::clone(&cache);

        let registry = HandlerRegistry::builder().on("MESSAGE_CREATE", move |_event| {
            let flag = Arc::clone(&flag);
            let cache = Arc::clone(&cache_for_assert);
            async move {
                assert_eq!(cache.updates.lock().unwrap().len(), 1);
                flag.fetch_add(1, Ordering::SeqCst);
            }
        }).build();

        let dispatcher = Dispatcher::new(registry, Some(cache), ExecutionMode::Sync, None);
        let data = message_create_payload();

        dispatcher.dispatch(0, "MESSAGE_CREATE", &data).await;

        assert_eq!(seen_cache_update.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_abort_dispatch() {
        let ran_after = Arc::new(AtomicUsize::new(0));
        let after = Arc::clone(&ran_after);

        let registry = HandlerRegistry::builder()
            .on("MESSAGE_CREATE", |_event| async { panic!("boom") })
            .on("MESSAGE_CREATE", move |_event| {
                let after = Arc::clone(&after);
                async move {
                    after.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build();

        let dispatcher = Dispatcher::new(registry, None, ExecutionMode::Sync, None);
        let data = message_create_payload();

        dispatcher.dispatch(0, "MESSAGE_CREATE", &data).await;

        assert_eq!(ran_after.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unregistered_event_name_is_a_no_op() {
        let registry = HandlerRegistry::builder().build();
        let dispatcher = Dispatcher::new(registry, None, ExecutionMode::Sync, None);
        let data = message_create_payload();

        dispatcher.dispatch(0, "MESSAGE_CREATE", &data).await;
    }
}
