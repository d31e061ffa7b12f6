//! A Discord chat client library.
//!
//! [`Client`] is a thin façade over the rest of the Halcyon workspace: it
//! wires a [`halcyon_http::Client`] requester, a [`halcyon_gateway::ShardManager`],
//! a [`halcyon_dispatch::Dispatcher`] with its optional [`halcyon_dispatch::WorkerPool`],
//! and an optional [`halcyon_model::Cache`] together, and exposes `start`/
//! `shutdown` under a single [`tokio_util::sync::CancellationToken`].
//!
//! Entity schema coverage, CDN URL construction, message builders, voice
//! streaming, and persistent storage are all out of scope; see the
//! member crates for what each of them actually does.

mod builder;
mod error;

pub use self::{
    builder::ClientBuilder,
    error::{Error, ErrorType},
};

pub use halcyon_cache_inmemory::InMemoryCache;
pub use halcyon_dispatch::{ExecutionMode, WorkerPoolConfig};
pub use halcyon_gateway::{ClusterStartError, ShardScheme, ShardState};
pub use halcyon_model::Intents;

use futures_channel::mpsc::UnboundedReceiver;
use futures_util::StreamExt;
use halcyon_dispatch::{Dispatcher, WorkerPool};
use halcyon_gateway::{RawDispatch, ShardManager};
use halcyon_http::Client as HttpClient;
use halcyon_model::Cache;
use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Arc,
};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

struct ClientRef {
    http: HttpClient,
    shard_manager: ShardManager,
    dispatcher: Dispatcher,
    cache: Option<Arc<dyn Cache>>,
    pool: Option<WorkerPool>,
    dispatch_rx: AsyncMutex<Option<UnboundedReceiver<RawDispatch>>>,
}

/// The Discord chat client: shards, a requester, an event dispatcher, and
/// (optionally) a cache, started and stopped together.
///
/// Cheaply [`Clone`]-able; every clone shares the same shards, requester,
/// and dispatcher.
#[derive(Clone)]
pub struct Client(Arc<ClientRef>);

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Client").field("shards", self.0.shard_manager.config().shard_scheme()).finish()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn http(&self) -> &HttpClient {
        &self.0.http
    }

    pub fn shard_manager(&self) -> &ShardManager {
        &self.0.shard_manager
    }

    pub fn cache(&self) -> Option<&Arc<dyn Cache>> {
        self.0.cache.as_ref()
    }

    /// Connects every shard and runs the dispatch loop until `cancel` is
    /// cancelled or the raw dispatch channel closes because every shard
    /// exited. Calling `start` a second time on the same client is a
    /// programmer error: the dispatch receiver is consumed on first use.
    ///
    /// # Panics
    ///
    /// Panics if called more than once on the same client.
    pub async fn start(&self, cancel: CancellationToken) {
        self.0.shard_manager.up();

        let mut rx = self.0.dispatch_rx.lock().await.take().expect("client already started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                dispatch = rx.next() => {
                    match dispatch {
                        Some(dispatch) => {
                            self.0.dispatcher.dispatch(dispatch.shard_id, &dispatch.event_name, &dispatch.data).await;
                        }
                        None => break,
                    }
                }
            }
        }

        self.shutdown();
    }

    /// Stops every shard from reconnecting and shuts down the worker pool,
    /// if one is running. Idempotent.
    pub fn shutdown(&self) {
        self.0.shard_manager.down();

        if let Some(pool) = &self.0.pool {
            pool.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, ClientBuilder};
    use static_assertions::assert_impl_all;
    use std::fmt::Debug;

    assert_impl_all!(Client: Clone, Debug, Send, Sync);
    assert_impl_all!(ClientBuilder: Send, Sync);

    #[tokio::test]
    async fn build_without_token_fails() {
        let result = ClientBuilder::new().build().await;
        assert!(result.is_err());
    }
}
