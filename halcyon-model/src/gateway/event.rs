use crate::{
    entity::{guild::GuildCreate, message::Message},
    gateway::payload::ReadyMinimal,
};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A dispatch event name as it appears in a gateway payload's `t` field.
///
/// Kept as a thin wrapper rather than a closed enum: Discord adds event
/// names faster than any client can track, and the dispatcher needs to
/// route by name even for events this crate has no typed payload for.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EventName(pub String);

impl Display for EventName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventName {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A gateway dispatch event, decoded from its raw `d` payload once the
/// event name (`t`) is known.
#[derive(Clone, Debug)]
pub enum Event {
    Ready(Box<ReadyMinimal>),
    GuildCreate(Box<GuildCreate>),
    MessageCreate(Box<Message>),
}

impl Event {
    /// The event's wire name, as it would appear in a gateway payload's `t`
    /// field.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ready(_) => "READY",
            Self::GuildCreate(_) => "GUILD_CREATE",
            Self::MessageCreate(_) => "MESSAGE_CREATE",
        }
    }

    /// Parses a typed event from a raw JSON payload body, given its event
    /// name. Returns `None` for event names this crate has no typed
    /// representation for; the dispatcher drops those after logging, per
    /// the parse-error handling rule.
    pub fn from_raw(event_name: &str, data: &serde_json::value::RawValue) -> Option<serde_json::Result<Self>> {
        let wrapped = match event_name {
            "READY" => serde_json::from_str::<ReadyMinimal>(data.get())
                .map(|ready| Self::Ready(Box::new(ready))),
            "GUILD_CREATE" => serde_json::from_str::<GuildCreate>(data.get())
                .map(|guild| Self::GuildCreate(Box::new(guild))),
            "MESSAGE_CREATE" => serde_json::from_str::<Message>(data.get())
                .map(|message| Self::MessageCreate(Box::new(message))),
            _ => return None,
        };

        Some(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::Event;

    #[test]
    fn unknown_event_name_is_none() {
        let raw = serde_json::value::RawValue::from_string("{}".to_owned()).unwrap();
        assert!(Event::from_raw("SOME_FUTURE_EVENT", &raw).is_none());
    }
}
