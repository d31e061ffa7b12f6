use crate::api_error::ApiError;
use hyper::StatusCode;
use std::{
    error::Error as StdError,
    fmt::{Display, Formatter, Result as FmtResult},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error issuing a REST request.
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

#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorType {
    /// The client's token has previously been rejected with a 401 and all
    /// further requests are refused to avoid contributing to an API ban.
    Unauthorized,
    BuildingRequest,
    ChunkingResponse,
    Sending,
    RequestTimedOut,
    /// Parsing the response body, either into the caller's type or into
    /// [`ApiError`] on failure, did not produce valid JSON.
    Parsing { body: Vec<u8> },
    /// Discord returned a non-success status with a structured API error.
    Response { body: Vec<u8>, error: ApiError, status: StatusCode },
    /// The retry budget was exhausted without a successful response.
    RetriesExhausted { attempts: u32 },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            ErrorType::Unauthorized => f.write_str("token is invalid, expired, or revoked"),
            ErrorType::BuildingRequest => f.write_str("failed to build the http request"),
            ErrorType::ChunkingResponse => f.write_str("failed to read the response body"),
            ErrorType::Sending => f.write_str("failed to send the request"),
            ErrorType::RequestTimedOut => f.write_str("request timed out"),
            ErrorType::Parsing { .. } => f.write_str("response body could not be deserialized"),
            ErrorType::Response { status, error, .. } => write!(f, "response error: status {status}, {error}"),
            ErrorType::RetriesExhausted { attempts } => write!(f, "retry budget of {attempts} attempts exhausted"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|source| source as &(dyn StdError + 'static))
    }
}
