//! An in-process-memory cache for the Halcyon ecosystem.
//!
//! [`InMemoryCache`] is responsible for processing gateway events and
//! caching the small set of entities ([`Guild`], [`Channel`], roles) the
//! dispatcher updates ahead of user handlers. It implements
//! [`halcyon_model::Cache`], the interface the dispatcher and client façade
//! depend on.
//!
//! Voice states, presences, emojis, stickers, and message bodies are not
//! cached; those families are out of scope.

mod builder;
mod config;
mod event;

pub use self::{
    builder::InMemoryCacheBuilder,
    config::{Config, ResourceType},
};

use self::event::UpdateCache;
use dashmap::DashMap;
use halcyon_model::{
    entity::{Channel, Guild},
    gateway::Event,
    Cache, Id,
};
use std::{
    collections::HashSet,
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::Mutex,
};

/// An in-process-memory cache of the entities the dispatcher keeps current.
#[derive(Default)]
pub struct InMemoryCache {
    config: Config,
    channels: DashMap<Id, Channel>,
    guilds: DashMap<Id, Guild>,
    guild_channels: DashMap<Id, HashSet<Id>>,
    guild_roles: DashMap<Id, HashSet<Id>>,
    session_id: Mutex<Option<String>>,
}

impl Debug for InMemoryCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InMemoryCache")
            .field("config", &self.config)
            .field("guilds", &self.guilds.len())
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryCacheBuilder {
        InMemoryCacheBuilder::new()
    }

    pub(crate) fn new_with_config(config: Config) -> Self {
        Self { config, ..Self::default() }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Clears every cached entity. Equivalent to starting over with a fresh
    /// cache that keeps the same configuration.
    pub fn clear(&self) {
        self.channels.clear();
        self.guilds.clear();
        self.guild_channels.clear();
        self.guild_roles.clear();
        self.session_id.lock().expect("cache session id poisoned").take();
    }

    /// The set of channel IDs belonging to a guild, if the guild is cached.
    pub fn guild_channels(&self, guild_id: Id) -> Option<HashSet<Id>> {
        self.guild_channels.get(&guild_id).map(|entry| entry.clone())
    }

    /// The set of role IDs belonging to a guild, if the guild is cached.
    pub fn guild_roles(&self, guild_id: Id) -> Option<HashSet<Id>> {
        self.guild_roles.get(&guild_id).map(|entry| entry.clone())
    }

    fn wants(&self, resource_type: ResourceType) -> bool {
        self.config.resource_types().contains(resource_type)
    }
}

impl Cache for InMemoryCache {
    fn update(&self, event: &Event) {
        event.update(self);
    }

    fn guild(&self, guild_id: Id) -> Option<Guild> {
        self.guilds.get(&guild_id).map(|entry| entry.clone())
    }

    fn channel(&self, channel_id: Id) -> Option<Channel> {
        self.channels.get(&channel_id).map(|entry| entry.clone())
    }

    fn session_id(&self) -> Option<String> {
        self.session_id.lock().expect("cache session id poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, InMemoryCache, ResourceType};
    use halcyon_model::{
        entity::{Channel, ChannelType, Guild, GuildCreate},
        gateway::{payload::ReadyMinimal, Event},
        Cache, Id,
    };
    use static_assertions::assert_impl_all;
    use std::fmt::Debug;

    assert_impl_all!(InMemoryCache: Cache, Debug, Default, Send, Sync);
    assert_impl_all!(Config: Clone, Debug, Eq, PartialEq);

    fn guild_create(guild_id: Id) -> Event {
        let channel = Channel { id: Id::new(2), kind: ChannelType::GuildText, guild_id: Some(guild_id), name: Some("general".into()), position: Some(0) };

        Event::GuildCreate(Box::new(GuildCreate {
            guild: Guild { id: guild_id, name: "test guild".into(), unavailable: false, roles: Vec::new(), channels: vec![channel], members: Vec::new() },
        }))
    }

    #[test]
    fn guild_create_populates_guild_and_channels() {
        let cache = InMemoryCache::new();
        let guild_id = Id::new(1);

        cache.update(&guild_create(guild_id));

        assert_eq!(cache.guild(guild_id).unwrap().name, "test guild");
        assert!(cache.channel(Id::new(2)).is_some());
        assert_eq!(cache.guild_channels(guild_id).unwrap().len(), 1);
    }

    #[test]
    fn ready_records_session_id() {
        let cache = InMemoryCache::new();
        assert!(cache.session_id().is_none());

        cache.update(&Event::Ready(Box::new(ReadyMinimal { session_id: "abc123".into(), resume_gateway_url: None })));

        assert_eq!(cache.session_id().as_deref(), Some("abc123"));
    }

    #[test]
    fn disabled_resource_type_is_not_cached() {
        let cache = InMemoryCache::builder().resource_types(ResourceType::GUILD).build();
        let guild_id = Id::new(1);

        cache.update(&guild_create(guild_id));

        assert!(cache.guild(guild_id).is_some());
        assert!(cache.channel(Id::new(2)).is_none());
    }
}
