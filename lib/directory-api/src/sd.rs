//! Service discovery messages

use serde::{Deserialize, Serialize};

/// A connector endpoint serving a tunnel
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Service {
    /// Connector ID
    #[serde(default)]
    pub id: String,
    /// Tunnel name
    #[serde(default)]
    pub name: String,
    /// Node the connector runs on
    #[serde(default)]
    pub node: String,
    /// `tcp` or `udp`
    #[serde(default)]
    pub network: String,
    /// `host:port`, the host may be omitted on register
    #[serde(default)]
    pub address: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub service: Option<Service>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeregisterRequest {
    pub service: Option<Service>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RenewRequest {
    pub service: Option<Service>,
}

/// Reply shared by register, deregister and renew
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    pub ok: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetServiceRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GetServiceReply {
    #[serde(default)]
    pub services: Vec<Service>,
}
