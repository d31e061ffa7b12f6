use crate::{
    entity::{channel::Channel, member::Member, role::Role},
    id::Id,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Guild {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub members: Vec<Member>,
}

/// The subset of `GUILD_CREATE` fields the cache populates itself with.
///
/// Discord's `GUILD_CREATE` payload is a superset of [`Guild`] (it also
/// carries voice states, presences, stage instances, and scheduled events);
/// those families are out of scope here and are left for the caller to
/// fetch over REST if needed.
#[derive(Clone, Debug, Deserialize)]
pub struct GuildCreate {
    #[serde(flatten)]
    pub guild: Guild,
}
