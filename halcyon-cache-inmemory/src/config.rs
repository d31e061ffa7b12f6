use bitflags::bitflags;

bitflags! {
    /// Which resource families an [`InMemoryCache`](crate::InMemoryCache)
    /// processes events into.
    ///
    /// Disabling a resource type that isn't needed avoids the memory and
    /// lock traffic of keeping it current.
    pub struct ResourceType: u64 {
        const CHANNEL = 1;
        const GUILD = 1 << 1;
        const ROLE = 1 << 2;
        const MEMBER = 1 << 3;
        const MESSAGE = 1 << 4;
    }
}

/// Configuration for an [`InMemoryCache`](crate::InMemoryCache).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub(super) resource_types: ResourceType,
    pub(super) message_cache_size: usize,
}

impl Config {
    pub const fn resource_types(&self) -> ResourceType {
        self.resource_types
    }

    pub const fn message_cache_size(&self) -> usize {
        self.message_cache_size
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { resource_types: ResourceType::all(), message_cache_size: 100 }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ResourceType};

    #[test]
    fn resource_type_const_values() {
        assert_eq!(1, ResourceType::CHANNEL.bits());
        assert_eq!(1 << 1, ResourceType::GUILD.bits());
        assert_eq!(1 << 2, ResourceType::ROLE.bits());
        assert_eq!(1 << 3, ResourceType::MEMBER.bits());
        assert_eq!(1 << 4, ResourceType::MESSAGE.bits());
    }

    #[test]
    fn defaults_enable_every_resource() {
        assert_eq!(Config::default().resource_types, ResourceType::all());
        assert_eq!(Config::default().message_cache_size, 100);
    }
}
