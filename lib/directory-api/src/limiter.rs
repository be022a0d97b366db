//! Traffic limiter messages

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitRequest {
    /// Client identity as seen by the relay
    #[serde(default)]
    pub client: String,
}

/// Byte-rate limits in bytes per second
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitReply {
    #[serde(rename = "in")]
    pub limit_in: i64,
    #[serde(rename = "out")]
    pub limit_out: i64,
}
