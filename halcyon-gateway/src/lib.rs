//! The Discord gateway session engine for the Halcyon ecosystem.
//!
//! [`shard`] implements a single persistent gateway connection: framing,
//! zlib-stream decompression, heartbeating, and the identify/resume state
//! machine. [`cluster`] owns a set of shards and brings them up together
//! under a shared [`halcyon_gateway_queue::IdentifyGate`].
//!
//! Voice gateway connections and payload compression schemes other than
//! zlib-stream are out of scope.

pub mod cluster;
pub mod shard;

pub use self::{
    cluster::{ClusterConfig, ClusterStartError, ClusterStartErrorType, ShardManager, ShardScheme},
    shard::{
        Latency, RawDispatch, ReceivingEventError, ReceivingEventErrorType, Session, Shard, ShardConfig, ShardState,
    },
};
