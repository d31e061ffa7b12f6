pub mod config;
pub mod error;

pub use self::{
    config::{ClusterConfig, ShardScheme},
    error::{ClusterStartError, ClusterStartErrorType},
};

use crate::shard::{RawDispatch, Shard, ShardState};
use dashmap::DashMap;
use futures_channel::mpsc;
use halcyon_http::Client as HttpClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct ShardManagerRef {
    config: ClusterConfig,
    shards: DashMap<u64, Arc<Shard>>,
    cancel: CancellationToken,
}

/// Owns and orchestrates every shard a process runs, bringing them up under
/// the identify gate and tearing them down together on shutdown.
///
/// Cheaply [`Clone`]-able; every clone points at the same set of shards.
#[derive(Clone)]
pub struct ShardManager(Arc<ShardManagerRef>);

impl ShardManager {
    /// Resolves the shard range (fetching `/gateway/bot` for [`ShardScheme::Auto`]),
    /// constructs every [`Shard`], and returns the manager alongside the
    /// receiving end of the raw dispatch channel every shard feeds.
    pub async fn new(
        config: ClusterConfig,
        http: &HttpClient,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RawDispatch>), ClusterStartError> {
        let (gateway_url, from, to, total, max_concurrency) = match config.shard_scheme().clone() {
            ShardScheme::Auto => {
                let info = http.gateway_bot().await.map_err(|source| ClusterStartError {
                    kind: error::ClusterStartErrorType::RetrievingGatewayInfo,
                    source: Some(Box::new(source)),
                })?;

                (info.url, 0, info.shards.saturating_sub(1), info.shards, info.session_start_limit.max_concurrency)
            }
            ShardScheme::Range { from, to, total } => {
                let info = http.gateway_bot().await.map_err(|source| ClusterStartError {
                    kind: error::ClusterStartErrorType::RetrievingGatewayInfo,
                    source: Some(Box::new(source)),
                })?;

                (info.url, from, to, total, info.session_start_limit.max_concurrency)
            }
        };

        let cancel = CancellationToken::new();
        let identify_gate = config.identify_gate_sized(max_concurrency);
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded();

        let shards = DashMap::new();

        for id in from..=to {
            let shard_config = config.shard_config(id, total, gateway_url.clone());
            let shard = Shard::new(shard_config, Arc::clone(&identify_gate), dispatch_tx.clone(), cancel.child_token());
            shards.insert(id, shard);
        }

        Ok((Self(Arc::new(ShardManagerRef { config, shards, cancel })), dispatch_rx))
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.0.config
    }

    /// Spawns every shard's run loop. Each shard's own identify gate
    /// serializes login concurrency; this just fires them all at once.
    pub fn up(&self) {
        for entry in self.0.shards.iter() {
            let shard = Arc::clone(entry.value());
            tokio::spawn(async move {
                if let Err(error) = shard.run().await {
                    tracing::error!(shard_id = shard.id(), %error, "shard exited with an error");
                }
            });
        }
    }

    /// Signals every shard to close its connection with code 1000 and stop
    /// reconnecting.
    pub fn down(&self) {
        self.0.cancel.cancel();
    }

    pub fn shard(&self, id: u64) -> Option<Arc<Shard>> {
        self.0.shards.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub async fn states(&self) -> Vec<(u64, ShardState)> {
        let mut states = Vec::with_capacity(self.0.shards.len());

        for entry in self.0.shards.iter() {
            states.push((*entry.key(), entry.value().state().await));
        }

        states
    }
}
