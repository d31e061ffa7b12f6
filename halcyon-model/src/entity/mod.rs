pub mod channel;
pub mod guild;
pub mod member;
pub mod message;
pub mod role;
pub mod user;

pub use self::{
    channel::{Channel, ChannelType},
    guild::{Guild, GuildCreate},
    member::Member,
    message::Message,
    role::Role,
    user::User,
};
