//! Ingress rule messages

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SetRuleRequest {
    /// Public host name, optionally with a `:port` suffix
    #[serde(default)]
    pub host: String,
    /// Tunnel token, `$`-prefixed for private tunnels
    #[serde(default)]
    pub endpoint: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SetRuleReply {}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetRuleRequest {
    #[serde(default)]
    pub host: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetRuleReply {
    /// Tunnel token, empty on a miss
    #[serde(default)]
    pub endpoint: String,
}
