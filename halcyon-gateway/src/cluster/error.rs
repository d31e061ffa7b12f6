use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// Starting a [`ShardManager`](super::ShardManager) failed.
#[derive(Debug)]
pub struct ClusterStartError {
    pub(crate) kind: ClusterStartErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl ClusterStartError {
    pub const fn kind(&self) -> &ClusterStartErrorType {
        &self.kind
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ClusterStartErrorType {
    /// Retrieving the recommended shard count and gateway URL via
    /// `/gateway/bot` failed.
    RetrievingGatewayInfo,
}

impl Display for ClusterStartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.kind {
            ClusterStartErrorType::RetrievingGatewayInfo => {
                f.write_str("failed to retrieve the bot's gateway info over rest")
            }
        }
    }
}

impl Error for ClusterStartError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn Error + 'static))
    }
}
