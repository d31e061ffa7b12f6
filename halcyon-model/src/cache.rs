use crate::{
    entity::{Channel, Guild},
    gateway::Event,
    id::Id,
};
use std::fmt::Debug;

/// A read-only view into cached entities, kept current by the dispatcher as
/// events arrive and read by application code through the client façade.
///
/// Defined here rather than in `halcyon-cache-inmemory` so the dispatcher
/// and the client façade can depend on the interface without pulling in a
/// concrete cache implementation; `halcyon-cache-inmemory::InMemoryCache` is
/// the only implementation in this workspace, but nothing stops a caller
/// from supplying their own.
pub trait Cache: Debug + Send + Sync {
    /// Applies a dispatch event's cache-relevant effects, if any.
    fn update(&self, event: &Event);

    /// Looks up a cached guild by ID.
    fn guild(&self, guild_id: Id) -> Option<Guild>;

    /// Looks up a cached channel by ID.
    fn channel(&self, channel_id: Id) -> Option<Channel>;

    /// The gateway session ID recorded from the most recent `READY`, if any.
    fn session_id(&self) -> Option<String>;
}
