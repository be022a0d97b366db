//! Wire types for the tunnel directory plugin protocol
//!
//! Relay nodes talk to the directory through three small RPC groups:
//! - Ingress: host to tunnel routing rules
//! - SD: service discovery for tunnel connectors
//! - Limiter: static traffic limits per client

pub mod ingress;
pub mod limiter;
pub mod sd;

pub use ingress::{GetRuleReply, GetRuleRequest, SetRuleReply, SetRuleRequest};
pub use limiter::{LimitReply, LimitRequest};
pub use sd::{
    DeregisterRequest, GetServiceReply, GetServiceRequest, RegisterRequest, RenewRequest,
    Service, StatusReply,
};

use serde::{Deserialize, Serialize};

/// Error body returned alongside any non-2xx status
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}
