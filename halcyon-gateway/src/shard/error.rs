use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

/// An error establishing the websocket connection for a shard.
#[derive(Debug)]
pub struct ConnectingError {
    pub(crate) kind: ConnectingErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl ConnectingError {
    pub const fn kind(&self) -> &ConnectingErrorType {
        &self.kind
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ConnectingErrorType {
    Establishing,
    ParsingUrl { url: String },
    RetrievingGatewayInfo,
}

impl Display for ConnectingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            ConnectingErrorType::Establishing => f.write_str("failed to establish the websocket connection"),
            ConnectingErrorType::ParsingUrl { url } => write!(f, "gateway url `{url}` failed to parse"),
            ConnectingErrorType::RetrievingGatewayInfo => f.write_str("failed to retrieve gateway info over rest"),
        }
    }
}

impl Error for ConnectingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn Error + 'static))
    }
}

/// An error encountered while the shard's read loop processes an inbound
/// frame.
#[derive(Debug)]
pub struct ProcessError {
    pub(crate) kind: ProcessErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl ProcessError {
    pub const fn kind(&self) -> &ProcessErrorType {
        &self.kind
    }

    /// Whether this error is fatal for the underlying connection and the
    /// shard must close and reconnect.
    pub const fn fatal(&self) -> bool {
        matches!(self.kind, ProcessErrorType::SendingClose | ProcessErrorType::SessionSend)
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ProcessErrorType {
    Decompressing,
    ParsingPayload,
    PayloadNotUtf8,
    SendingClose,
    SequenceMissing,
    SessionSend,
}

impl Display for ProcessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.kind {
            ProcessErrorType::Decompressing => f.write_str("payload could not be decompressed"),
            ProcessErrorType::ParsingPayload => f.write_str("payload could not be parsed as json"),
            ProcessErrorType::PayloadNotUtf8 => f.write_str("decompressed payload was not valid utf-8"),
            ProcessErrorType::SendingClose => f.write_str("failed to send close frame"),
            ProcessErrorType::SequenceMissing => f.write_str("dispatch payload was missing its sequence number"),
            ProcessErrorType::SessionSend => f.write_str("failed to enqueue a payload on the outbound writer"),
        }
    }
}

impl Error for ProcessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn Error + 'static))
    }
}

/// A fatal error surfaced to the caller after a shard gives up: an
/// authentication failure, a non-resumable close code, or a retry budget
/// exhausted on the initial connect.
#[derive(Debug)]
pub struct ReceivingEventError {
    pub(crate) kind: ReceivingEventErrorType,
    pub(crate) source: Option<Box<dyn Error + Send + Sync>>,
}

impl ReceivingEventError {
    pub const fn kind(&self) -> &ReceivingEventErrorType {
        &self.kind
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ReceivingEventErrorType {
    AuthorizationInvalid { shard_id: u64 },
    ClosedFatally { shard_id: u64, close_code: u16 },
    Reconnect,
}

impl Display for ReceivingEventError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            ReceivingEventErrorType::AuthorizationInvalid { shard_id } => {
                write!(f, "shard {shard_id}'s token is invalid")
            }
            ReceivingEventErrorType::ClosedFatally { shard_id, close_code } => {
                write!(f, "shard {shard_id} was closed with fatal code {close_code}")
            }
            ReceivingEventErrorType::Reconnect => f.write_str("shard was asked to reconnect"),
        }
    }
}

impl Error for ReceivingEventError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn Error + 'static))
    }
}
