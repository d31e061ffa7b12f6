use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Discord's generic JSON error body, returned alongside a non-2xx status.
///
/// The full per-code catalog (`ErrorCode`) is out of scope here; callers
/// that need it can match on `code` themselves.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[non_exhaustive]
pub struct ApiError {
    #[serde(default)]
    pub code: u64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub global: Option<bool>,
    #[serde(default)]
    pub retry_after: Option<f64>,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "error code {}: {}", self.code, self.message)
    }
}
