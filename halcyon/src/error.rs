use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Something went wrong building or running a [`Client`](crate::Client).
#[derive(Debug)]
pub struct Error {
    pub(crate) kind: ErrorType,
    pub(crate) source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub const fn kind(&self) -> &ErrorType {
        &self.kind
    }
}

/// The kind of error a [`Client`](crate::Client) can produce.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorType {
    /// `ClientBuilder::build` was called without a token.
    MissingToken,
    /// Bringing the shard manager up failed, most commonly because
    /// `/gateway/bot` could not be retrieved.
    StartingShards,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.kind {
            ErrorType::MissingToken => f.write_str("client builder is missing a token"),
            ErrorType::StartingShards => f.write_str("failed to start the shard manager"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn StdError + 'static))
    }
}
