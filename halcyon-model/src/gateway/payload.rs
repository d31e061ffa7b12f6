use super::opcode::OpCode;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// The envelope every gateway frame is wrapped in.
///
/// `s` and `t` are only present when `op` is [`OpCode::Dispatch`]; callers
/// that need the inner payload typed should reparse `d` once the event name
/// is known (see `halcyon-model::gateway::event`).
#[derive(Debug, Deserialize, Serialize)]
pub struct GatewayPayload<'a> {
    pub op: OpCode,
    #[serde(borrow, default, skip_serializing_if = "Option::is_none")]
    pub d: Option<&'a RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

/// An outbound-only payload shape for opcodes that never carry `s`/`t`.
#[derive(Debug, Serialize)]
pub struct OutboundPayload<T> {
    pub op: OpCode,
    pub d: T,
}

impl<T> OutboundPayload<T> {
    pub const fn new(op: OpCode, d: T) -> Self {
        Self { op, d }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Serialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

#[derive(Debug, Serialize)]
pub struct IdentifyInfo {
    pub token: String,
    pub intents: crate::Intents,
    pub properties: IdentifyProperties,
    pub compress: bool,
    pub large_threshold: u64,
    pub shard: [u64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ResumeInfo {
    pub token: String,
    pub session_id: String,
    pub seq: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReadyMinimal {
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}
