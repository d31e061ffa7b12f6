use crate::{
    config::{Config, ResourceType},
    InMemoryCache,
};

/// Builds an [`InMemoryCache`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryCacheBuilder(Config);

impl InMemoryCacheBuilder {
    pub fn new() -> Self {
        Self(Config { resource_types: ResourceType::all(), message_cache_size: 100 })
    }

    /// Sets the resource types the cache will process events into.
    #[must_use]
    pub const fn resource_types(mut self, resource_types: ResourceType) -> Self {
        self.0.resource_types = resource_types;
        self
    }

    /// Sets how many messages are retained per channel.
    #[must_use]
    pub const fn message_cache_size(mut self, message_cache_size: usize) -> Self {
        self.0.message_cache_size = message_cache_size;
        self
    }

    pub fn build(self) -> InMemoryCache {
        InMemoryCache::new_with_config(self.0)
    }
}
