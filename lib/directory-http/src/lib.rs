//! HTTP/JSON transport for the tunnel directory
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod server;

pub use metrics::{MetricsCollector, MetricsMiddleware};
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareChain, MiddlewareContext};
pub use server::{DirectoryServer, Rpc, DEFAULT_MAX_BODY_BYTES};
