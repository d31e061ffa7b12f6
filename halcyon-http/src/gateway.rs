use serde::Deserialize;

/// The response body of `GET /gateway/bot`.
#[derive(Clone, Debug, Deserialize)]
pub struct GatewayBot {
    pub url: String,
    pub shards: u64,
    pub session_start_limit: SessionStartLimit,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SessionStartLimit {
    pub total: u64,
    pub remaining: u64,
    pub reset_after: u64,
    pub max_concurrency: u64,
}
