use crate::shard::ShardConfig;
use halcyon_gateway_queue::{ConcurrentIdentifyGate, IdentifyGate, NoOpIdentifyGate};
use halcyon_model::Intents;
use std::sync::Arc;

/// How many shards a [`ShardManager`](super::ShardManager) should bring up,
/// and over what range.
#[derive(Clone, Debug)]
pub enum ShardScheme {
    /// Ask Discord for the recommended shard count via `/gateway/bot` and
    /// start all of them.
    Auto,
    /// Start a fixed, contiguous range of shard IDs out of a known total.
    Range { from: u64, to: u64, total: u64 },
}

impl Default for ShardScheme {
    fn default() -> Self {
        Self::Auto
    }
}

/// Configuration for a [`ShardManager`](super::ShardManager).
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub(crate) token: String,
    pub(crate) intents: Intents,
    pub(crate) compression: bool,
    pub(crate) scheme: ShardScheme,
    pub(crate) max_concurrency: Option<u64>,
}

impl ClusterConfig {
    pub fn builder(token: impl Into<String>) -> ClusterConfigBuilder {
        ClusterConfigBuilder::new(token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn shard_scheme(&self) -> &ShardScheme {
        &self.scheme
    }

    pub(crate) fn shard_config(&self, id: u64, total: u64, gateway_url: String) -> ShardConfig {
        ShardConfig {
            id,
            total,
            token: self.token.clone(),
            intents: self.intents,
            compression: self.compression,
            gateway_url,
        }
    }

    /// Builds the identify gate implied by this configuration: a
    /// concurrency-limited gate sized to an explicit override if one was
    /// set, otherwise to `resolved`, Discord's own recommended
    /// `max_concurrency` from `/gateway/bot`.
    pub(crate) fn identify_gate_sized(&self, resolved: u64) -> Arc<dyn IdentifyGate> {
        let max = self.max_concurrency.unwrap_or(resolved);

        if max > 0 {
            ConcurrentIdentifyGate::new(max)
        } else {
            Arc::new(NoOpIdentifyGate)
        }
    }
}

/// Builds a [`ClusterConfig`].
#[derive(Clone, Debug)]
pub struct ClusterConfigBuilder(ClusterConfig);

impl ClusterConfigBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self(ClusterConfig {
            token: token.into(),
            intents: Intents::default(),
            compression: true,
            scheme: ShardScheme::default(),
            max_concurrency: None,
        })
    }

    pub const fn intents(mut self, intents: Intents) -> Self {
        self.0.intents = intents;
        self
    }

    pub const fn compression(mut self, compression: bool) -> Self {
        self.0.compression = compression;
        self
    }

    pub fn shard_scheme(mut self, scheme: ShardScheme) -> Self {
        self.0.scheme = scheme;
        self
    }

    pub const fn max_concurrency(mut self, max_concurrency: u64) -> Self {
        self.0.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn build(self) -> ClusterConfig {
        self.0
    }
}
