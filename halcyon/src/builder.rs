use crate::{
    error::{Error, ErrorType},
    Client, ClientRef,
};
use halcyon_dispatch::{Dispatcher, ExecutionMode, HandlerRegistry, HandlerRegistryBuilder, WorkerPool, WorkerPoolConfig};
use halcyon_gateway::{ClusterConfig, ShardScheme};
use halcyon_http::Client as HttpClient;
use halcyon_model::{gateway::Event, Cache, Intents};
use std::{future::Future, sync::Arc};
use tokio::sync::Mutex as AsyncMutex;

/// Builds a [`Client`].
///
/// Mirrors the shape of this workspace's other builders
/// (`ClusterConfigBuilder`, `InMemoryCacheBuilder`): chained setters, a
/// `build()` that fills in defaults and performs the one-time async setup
/// (resolving the shard count, opening the shard manager) a plain struct
/// literal couldn't.
pub struct ClientBuilder {
    token: Option<String>,
    intents: Intents,
    compression: bool,
    shard_scheme: ShardScheme,
    max_concurrency: Option<u64>,
    max_retries: u32,
    cache: Option<Arc<dyn Cache>>,
    execution_mode: ExecutionMode,
    worker_pool_config: WorkerPoolConfig,
    handlers: HandlerRegistryBuilder,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            token: None,
            intents: Intents::default(),
            compression: true,
            shard_scheme: ShardScheme::Auto,
            max_concurrency: None,
            max_retries: 5,
            cache: None,
            execution_mode: ExecutionMode::default(),
            worker_pool_config: WorkerPoolConfig::default(),
            handlers: HandlerRegistry::builder(),
        }
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub const fn compression(mut self, compression: bool) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn shard_scheme(mut self, scheme: ShardScheme) -> Self {
        self.shard_scheme = scheme;
        self
    }

    #[must_use]
    pub const fn max_concurrency(mut self, max_concurrency: u64) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Supplies the cache every dispatched event is applied to before user
    /// handlers run. Leaving this unset runs the client cache-less.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub const fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    #[must_use]
    pub fn worker_pool_config(mut self, config: WorkerPoolConfig) -> Self {
        self.worker_pool_config = config;
        self
    }

    /// Registers a handler for a raw event name. The typed `on_ready`,
    /// `on_guild_create`, and `on_message_create` sugar below cover the
    /// events this crate has a model for; this is the escape hatch for
    /// everything else.
    #[must_use]
    pub fn on<F, Fut>(mut self, event_name: &'static str, handler: F) -> Self
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handlers = self.handlers.on(event_name, handler);
        self
    }

    #[must_use]
    pub fn on_ready<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Arc<halcyon_model::gateway::payload::ReadyMinimal>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.on("READY", move |event| {
            let handler = Arc::clone(&handler);
            async move {
                if let Event::Ready(ready) = &*event {
                    handler(Arc::new((**ready).clone())).await;
                }
            }
        })
    }

    #[must_use]
    pub fn on_guild_create<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Arc<halcyon_model::entity::GuildCreate>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.on("GUILD_CREATE", move |event| {
            let handler = Arc::clone(&handler);
            async move {
                if let Event::GuildCreate(guild_create) = &*event {
                    handler(Arc::new((**guild_create).clone())).await;
                }
            }
        })
    }

    #[must_use]
    pub fn on_message_create<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(Arc<halcyon_model::entity::Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.on("MESSAGE_CREATE", move |event| {
            let handler = Arc::clone(&handler);
            async move {
                if let Event::MessageCreate(message) = &*event {
                    handler(Arc::new((**message).clone())).await;
                }
            }
        })
    }

    /// Resolves the token, opens the HTTP client, retrieves the
    /// recommended shard count, and brings up the shard manager. Shards
    /// are constructed but not yet connected; call [`Client::start`] to
    /// connect them.
    pub async fn build(self) -> Result<Client, Error> {
        let token = self.token.ok_or(Error { kind: ErrorType::MissingToken, source: None })?;

        let http = HttpClient::builder().token(token.clone()).max_retries(self.max_retries).build();

        let cluster_config = ClusterConfig::builder(token)
            .intents(self.intents)
            .compression(self.compression)
            .shard_scheme(self.shard_scheme);

        let cluster_config = match self.max_concurrency {
            Some(max_concurrency) => cluster_config.max_concurrency(max_concurrency),
            None => cluster_config,
        }
        .build();

        let (shard_manager, dispatch_rx) = halcyon_gateway::ShardManager::new(cluster_config, &http)
            .await
            .map_err(|source| Error { kind: ErrorType::StartingShards, source: Some(Box::new(source)) })?;

        let pool = (self.execution_mode == ExecutionMode::Async).then(|| WorkerPool::new(self.worker_pool_config));

        let dispatcher = Dispatcher::new(self.handlers.build(), self.cache.clone(), self.execution_mode, pool.clone());

        Ok(Client(Arc::new(ClientRef {
            http,
            shard_manager,
            dispatcher,
            cache: self.cache,
            pool,
            dispatch_rx: AsyncMutex::new(Some(dispatch_rx)),
        })))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
