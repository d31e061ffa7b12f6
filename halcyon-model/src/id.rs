use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    num::NonZeroU64,
    str::FromStr,
};
use time::OffsetDateTime;

/// Discord epoch, in milliseconds, used to derive a snowflake's creation time.
const DISCORD_EPOCH: u64 = 1_420_070_400_000;

/// A Discord snowflake ID.
///
/// Snowflakes embed their creation timestamp in the upper 42 bits. Zero is
/// reserved as the "absent" sentinel and is never a valid snowflake; this
/// type therefore wraps a [`NonZeroU64`] so an `Option<Id>` costs nothing
/// extra and a bare zero cannot be mistaken for a real ID.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Id(NonZeroU64);

impl Id {
    /// Creates an ID, returning `None` if `value` is zero.
    pub const fn new_checked(value: u64) -> Option<Self> {
        match NonZeroU64::new(value) {
            Some(inner) => Some(Self(inner)),
            None => None,
        }
    }

    /// Creates an ID from a known-nonzero value.
    ///
    /// # Panics
    ///
    /// Panics if `value` is zero.
    pub const fn new(value: u64) -> Self {
        match Self::new_checked(value) {
            Some(id) => id,
            None => panic!("id value must be non-zero"),
        }
    }

    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Returns the time the ID was created.
    pub fn timestamp(self) -> OffsetDateTime {
        let millis = (self.get() >> 22) + DISCORD_EPOCH;
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.get(), f)
    }
}

impl FromStr for Id {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s.parse().map_err(|_| IdParseError)?;
        Self::new_checked(value).ok_or(IdParseError)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> serde::de::Visitor<'de> for IdVisitor {
            type Value = Id;

            fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
                f.write_str("a discord snowflake as a string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Id, E> {
                v.parse().map_err(|_| E::custom("invalid snowflake"))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Id, E> {
                Id::new_checked(v).ok_or_else(|| E::custom("snowflake must be non-zero"))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

impl Serialize for Id {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.get())
    }
}

/// Error returned when a string does not parse as a valid, non-zero snowflake.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IdParseError;

impl Display for IdParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("invalid snowflake id")
    }
}

impl std::error::Error for IdParseError {}

#[cfg(test)]
mod tests {
    use super::Id;

    #[test]
    fn zero_is_rejected() {
        assert!(Id::new_checked(0).is_none());
    }

    #[test]
    fn round_trips_through_string() {
        let id = Id::new(175_928_847_299_117_063);
        assert_eq!(id, id.to_string().parse().unwrap());
    }
}
