//! Directory and routing layer for the tunnel relay network
//!
//! This library provides:
//! - Tunnel routing table mapping public hosts to tunnel IDs
//! - Service registry tracking live connector endpoints per tunnel
//! - Static traffic limiter
//! - KV store adapter with in-memory and Redis backends

pub mod directory;
pub mod endpoint;
pub mod error;
pub mod ingress;
pub mod limiter;
pub mod net;
pub mod registry;
pub mod store;
pub mod tunnel_id;

pub use directory::{Directory, DirectoryConfig};
pub use endpoint::ServiceRecord;
pub use error::{DirectoryError, Result};
pub use ingress::{IngressOptions, TunnelRoutingTable};
pub use limiter::{LimiterOptions, TrafficLimiter};
pub use registry::{RegistryOptions, ServiceRegistry};
pub use store::{KvStore, MemoryStore, RedisStore};
pub use tunnel_id::TunnelId;
