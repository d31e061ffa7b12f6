use crate::{config::ResourceType, InMemoryCache};
use halcyon_model::{
    entity::{Channel, Role},
    gateway::Event,
};
use std::collections::HashSet;

/// Applies the cache-relevant effects of an event. Implemented for [`Event`]
/// and dispatched to per-variant handlers below; kept as a trait so new
/// event families can be added without widening [`InMemoryCache::update`]'s
/// match arm.
pub(crate) trait UpdateCache {
    fn update(&self, cache: &InMemoryCache);
}

impl UpdateCache for Event {
    fn update(&self, cache: &InMemoryCache) {
        match self {
            Self::Ready(ready) => cache.update_ready(ready),
            Self::GuildCreate(guild_create) => cache.update_guild_create(guild_create),
            Self::MessageCreate(_) => {}
        }
    }
}

impl InMemoryCache {
    fn update_ready(&self, ready: &halcyon_model::gateway::payload::ReadyMinimal) {
        *self.session_id.lock().expect("cache session id poisoned") = Some(ready.session_id.clone());
    }

    fn update_guild_create(&self, guild_create: &halcyon_model::entity::GuildCreate) {
        let guild = guild_create.guild.clone();
        let guild_id = guild.id;

        if self.wants(ResourceType::CHANNEL) {
            self.cache_guild_channels(guild_id, &guild.channels);
        }

        if self.wants(ResourceType::ROLE) {
            self.cache_guild_roles(guild_id, &guild.roles);
        }

        if self.wants(ResourceType::GUILD) {
            self.guilds.insert(guild_id, guild);
        }
    }

    fn cache_guild_channels(&self, guild_id: halcyon_model::Id, channels: &[Channel]) {
        let mut ids = HashSet::with_capacity(channels.len());

        for channel in channels {
            ids.insert(channel.id);
            self.channels.insert(channel.id, channel.clone());
        }

        self.guild_channels.insert(guild_id, ids);
    }

    fn cache_guild_roles(&self, guild_id: halcyon_model::Id, roles: &[Role]) {
        let ids = roles.iter().map(|role| role.id).collect();
        self.guild_roles.insert(guild_id, ids);
    }
}
