use std::fmt::{Display, Formatter, Result as FmtResult};

/// A gateway close code, classified as resumable or fatal per the close-code
/// policy table.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CloseCode {
    UnknownError,
    UnknownOpcode,
    DecodeError,
    NotAuthenticated,
    AuthenticationFailed,
    AlreadyAuthenticated,
    InvalidSeq,
    RateLimited,
    SessionTimedOut,
    InvalidShard,
    ShardingRequired,
    InvalidApiVersion,
    InvalidIntents,
    DisallowedIntents,
    /// A close code the client does not recognize; treated as resumable,
    /// matching Discord's guidance to attempt a resume for unknown codes.
    Unknown(u16),
}

impl CloseCode {
    pub const fn from_u16(code: u16) -> Self {
        match code {
            4000 => Self::UnknownError,
            4001 => Self::UnknownOpcode,
            4002 => Self::DecodeError,
            4003 => Self::NotAuthenticated,
            4004 => Self::AuthenticationFailed,
            4005 => Self::AlreadyAuthenticated,
            4007 => Self::InvalidSeq,
            4008 => Self::RateLimited,
            4009 => Self::SessionTimedOut,
            4010 => Self::InvalidShard,
            4011 => Self::ShardingRequired,
            4012 => Self::InvalidApiVersion,
            4013 => Self::InvalidIntents,
            4014 => Self::DisallowedIntents,
            other => Self::Unknown(other),
        }
    }

    /// Whether the client should attempt to resume (or re-identify) after
    /// receiving this close code, as opposed to surfacing a fatal error.
    pub const fn is_resumable(self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }
}

impl Display for CloseCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::UnknownError => f.write_str("unknown error"),
            Self::UnknownOpcode => f.write_str("unknown opcode"),
            Self::DecodeError => f.write_str("decode error"),
            Self::NotAuthenticated => f.write_str("not authenticated"),
            Self::AuthenticationFailed => f.write_str("authentication failed"),
            Self::AlreadyAuthenticated => f.write_str("already authenticated"),
            Self::InvalidSeq => f.write_str("invalid sequence"),
            Self::RateLimited => f.write_str("rate limited"),
            Self::SessionTimedOut => f.write_str("session timed out"),
            Self::InvalidShard => f.write_str("invalid shard"),
            Self::ShardingRequired => f.write_str("sharding required"),
            Self::InvalidApiVersion => f.write_str("invalid api version"),
            Self::InvalidIntents => f.write_str("invalid intents"),
            Self::DisallowedIntents => f.write_str("disallowed intents"),
            Self::Unknown(code) => write!(f, "unknown close code {code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CloseCode;

    #[test]
    fn fatal_codes_are_not_resumable() {
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert!(!CloseCode::from_u16(code).is_resumable(), "{code} should be fatal");
        }
    }

    #[test]
    fn listed_resumable_codes_are_resumable() {
        for code in [4000, 4001, 4002, 4003, 4005, 4007, 4008, 4009] {
            assert!(CloseCode::from_u16(code).is_resumable(), "{code} should be resumable");
        }
    }
}
