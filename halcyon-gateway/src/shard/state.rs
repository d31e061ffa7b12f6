use std::{
    convert::TryFrom,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Where a [`Shard`](super::Shard) is in its connect/identify/resume
/// lifecycle.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum ShardState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Identifying = 2,
    Ready = 3,
    Resuming = 4,
    Closing = 5,
}

impl Display for ShardState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Identifying => "identifying",
            Self::Ready => "ready",
            Self::Resuming => "resuming",
            Self::Closing => "closing",
        })
    }
}

/// Error converting a raw discriminant into a [`ShardState`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ShardStateConversionError {
    value: u8,
}

impl Display for ShardStateConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} isn't a valid shard state", self.value)
    }
}

impl std::error::Error for ShardStateConversionError {}

impl TryFrom<u8> for ShardState {
    type Error = ShardStateConversionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Disconnected),
            1 => Ok(Self::Connecting),
            2 => Ok(Self::Identifying),
            3 => Ok(Self::Ready),
            4 => Ok(Self::Resuming),
            5 => Ok(Self::Closing),
            _ => Err(ShardStateConversionError { value }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ShardState;
    use std::convert::TryFrom;

    #[test]
    fn default_is_disconnected() {
        assert_eq!(ShardState::default(), ShardState::Disconnected);
    }

    #[test]
    fn round_trips_through_u8() {
        for state in [
            ShardState::Disconnected,
            ShardState::Connecting,
            ShardState::Identifying,
            ShardState::Ready,
            ShardState::Resuming,
            ShardState::Closing,
        ] {
            assert_eq!(ShardState::try_from(state as u8).unwrap(), state);
        }
    }
}
