//! Data model shared across the Halcyon workspace: snowflake IDs, intents,
//! gateway wire types, and the small set of entities the cache and
//! dispatcher need concrete types for.

pub mod cache;
pub mod entity;
pub mod gateway;
pub mod id;
pub mod intents;

pub use self::{cache::Cache, id::Id, intents::Intents};
