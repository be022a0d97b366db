//! Request routing from HTTP onto the directory

use crate::middleware::{LoggingMiddleware, MiddlewareChain, MiddlewareContext};
use crate::metrics::{MetricsCollector, MetricsMiddleware};
use crate::response::{
    error_response, json_response, method_not_allowed_response, not_found_response,
    payload_too_large_response, text_response, Body,
};
use directory_core::{Directory, DirectoryError, Result};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::{body::Bytes, server::conn::http1, service::service_fn, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{de::DeserializeOwned, Serialize};
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Largest request body accepted by default
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Plugin RPCs served over `POST`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rpc {
    SetRule,
    GetRule,
    Register,
    Deregister,
    Renew,
    GetServices,
    Limit,
}

impl Rpc {
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/ingress/set" => Some(Rpc::SetRule),
            "/ingress/get" => Some(Rpc::GetRule),
            "/sd/register" => Some(Rpc::Register),
            "/sd/deregister" => Some(Rpc::Deregister),
            "/sd/renew" => Some(Rpc::Renew),
            "/sd/get" => Some(Rpc::GetServices),
            "/limiter/limit" => Some(Rpc::Limit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rpc::SetRule => "set_rule",
            Rpc::GetRule => "get_rule",
            Rpc::Register => "register",
            Rpc::Deregister => "deregister",
            Rpc::Renew => "renew",
            Rpc::GetServices => "get_services",
            Rpc::Limit => "limit",
        }
    }
}

fn op_label(path: &str) -> &'static str {
    match Rpc::from_path(path) {
        Some(rpc) => rpc.as_str(),
        None => match path {
            "/healthz" => "healthz",
            "/metrics" => "metrics",
            _ => "unknown",
        },
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = if body.iter().all(|b| b.is_ascii_whitespace()) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body)
        .map_err(|e| DirectoryError::InvalidArgument(format!("malformed request body: {}", e)))
}

fn encode<T: Serialize>(reply: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(reply)?)
}

/// DirectoryServer exposes a [`Directory`] over HTTP/JSON
pub struct DirectoryServer {
    directory: Arc<Directory>,
    middleware: MiddlewareChain,
    metrics: MetricsCollector,
    request_timeout: Duration,
    max_body_bytes: usize,
}

impl DirectoryServer {
    pub fn new(directory: Arc<Directory>, metrics: MetricsCollector) -> Self {
        let middleware = MiddlewareChain::new()
            .add(LoggingMiddleware)
            .add(MetricsMiddleware::new(metrics.clone()));
        Self {
            directory,
            middleware,
            metrics,
            request_timeout: Duration::from_secs(5),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Deadline applied to reading the body and to every directory call
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Bodies larger than this are answered with 413
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Accept connections until the listener fails
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> anyhow::Result<()> {
        info!("Directory listening on {}", listener.local_addr()?);

        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Error accepting connection: {}", e);
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { Ok::<_, Infallible>(server.handle(req, Some(peer_addr)).await) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }
    }

    /// Handle one request; `peer` is the remote address of the connection
    pub async fn handle<B>(&self, req: Request<B>, peer: Option<SocketAddr>) -> Response<Body>
    where
        B: hyper::body::Body,
        B::Error: Into<BoxError>,
    {
        let context = MiddlewareContext::new(
            op_label(req.uri().path()),
            req.method().as_str(),
            req.uri().path(),
            peer,
        );

        if let Err(e) = self.middleware.on_request(&context).await {
            debug!("Middleware on_request error: {}", e);
        }

        let response = self.route(req, peer, &context).await;

        if let Err(e) = self
            .middleware
            .on_response(&context, response.status().as_u16())
            .await
        {
            debug!("Middleware on_response error: {}", e);
        }

        response
    }

    async fn route<B>(
        &self,
        req: Request<B>,
        peer: Option<SocketAddr>,
        context: &MiddlewareContext,
    ) -> Response<Body>
    where
        B: hyper::body::Body,
        B::Error: Into<BoxError>,
    {
        let path = context.path.as_str();

        if req.method() == Method::GET {
            match path {
                "/healthz" => return text_response(StatusCode::OK, "OK\n"),
                "/metrics" => {
                    return match self.metrics.gather() {
                        Ok(text) => text_response(StatusCode::OK, text),
                        Err(e) => text_response(
                            StatusCode::INTERNAL_SERVER_ERROR,
                            format!("Failed to gather metrics: {}\n", e),
                        ),
                    };
                }
                _ => {}
            }
        }

        let rpc = match Rpc::from_path(path) {
            Some(rpc) => rpc,
            None if path == "/healthz" || path == "/metrics" => {
                return method_not_allowed_response()
            }
            None => return not_found_response(path),
        };
        if req.method() != Method::POST {
            return method_not_allowed_response();
        }

        let body = Limited::new(req.into_body(), self.max_body_bytes);
        let body = match tokio::time::timeout(self.request_timeout, body.collect()).await {
            Ok(Ok(collected)) => Ok(collected.to_bytes()),
            Ok(Err(e)) if e.is::<LengthLimitError>() => {
                if let Err(mw_err) = self.middleware.on_error(context, &e.to_string()).await {
                    debug!("Middleware on_error error: {}", mw_err);
                }
                return payload_too_large_response(self.max_body_bytes);
            }
            Ok(Err(e)) => Err(DirectoryError::InvalidArgument(format!(
                "failed to read request body: {}",
                e
            ))),
            Err(_) => Err(DirectoryError::Timeout(self.request_timeout)),
        };

        let result = match body {
            Ok(body) => tokio::time::timeout(self.request_timeout, self.call(rpc, body, peer))
                .await
                .unwrap_or(Err(DirectoryError::Timeout(self.request_timeout))),
            Err(e) => Err(e),
        };

        match result {
            Ok(body) => json_response(StatusCode::OK, body),
            Err(e) => {
                if let Err(mw_err) = self.middleware.on_error(context, &e.to_string()).await {
                    debug!("Middleware on_error error: {}", mw_err);
                }
                error_response(&e)
            }
        }
    }

    async fn call(&self, rpc: Rpc, body: Bytes, peer: Option<SocketAddr>) -> Result<Vec<u8>> {
        let dir = &self.directory;
        match rpc {
            Rpc::SetRule => encode(&dir.set_rule(decode(&body)?).await?),
            Rpc::GetRule => encode(&dir.get_rule(decode(&body)?).await?),
            Rpc::Register => encode(&dir.register(decode(&body)?, peer).await?),
            Rpc::Deregister => encode(&dir.deregister(decode(&body)?).await?),
            Rpc::Renew => encode(&dir.renew(decode(&body)?).await?),
            Rpc::GetServices => encode(&dir.get_services(decode(&body)?).await?),
            Rpc::Limit => encode(&dir.limit(decode(&body)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use directory_api::{GetRuleReply, GetServiceReply, LimitReply, StatusReply};
    use directory_core::{DirectoryConfig, KvStore, MemoryStore};
    use http_body_util::Full;
    use std::collections::HashMap;

    const TOKEN: &str = "5f0bd3a1-6f44-4b7c-9d2e-1a2b3c4d5e6f";

    fn server_with(store: Arc<dyn KvStore>) -> DirectoryServer {
        let directory = Arc::new(Directory::new(store, DirectoryConfig::default()));
        DirectoryServer::new(directory, MetricsCollector::new().unwrap())
    }

    fn server() -> DirectoryServer {
        server_with(Arc::new(MemoryStore::new()))
    }

    fn post(path: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn body_of(response: Response<Body>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    async fn json_of<T: DeserializeOwned>(response: Response<Body>) -> T {
        serde_json::from_slice(&body_of(response).await).unwrap()
    }

    struct DownStore;

    #[async_trait]
    impl KvStore for DownStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(DirectoryError::StoreUnavailable("connection refused".into()))
        }
        async fn set_nx(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool> {
            Err(DirectoryError::StoreUnavailable("connection refused".into()))
        }
        async fn hset(&self, _key: &str, _field: &str, _value: &[u8]) -> Result<()> {
            Err(DirectoryError::StoreUnavailable("connection refused".into()))
        }
        async fn hget(&self, _key: &str, _field: &str) -> Result<Option<Vec<u8>>> {
            Err(DirectoryError::StoreUnavailable("connection refused".into()))
        }
        async fn hgetall(&self, _key: &str) -> Result<HashMap<String, Vec<u8>>> {
            Err(DirectoryError::StoreUnavailable("connection refused".into()))
        }
        async fn hdel(&self, _key: &str, _field: &str) -> Result<()> {
            Err(DirectoryError::StoreUnavailable("connection refused".into()))
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<()> {
            Err(DirectoryError::StoreUnavailable("connection refused".into()))
        }
    }

    struct StuckStore;

    #[async_trait]
    impl KvStore for StuckStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            std::future::pending().await
        }
        async fn set_nx(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool> {
            std::future::pending().await
        }
        async fn hset(&self, _key: &str, _field: &str, _value: &[u8]) -> Result<()> {
            std::future::pending().await
        }
        async fn hget(&self, _key: &str, _field: &str) -> Result<Option<Vec<u8>>> {
            std::future::pending().await
        }
        async fn hgetall(&self, _key: &str) -> Result<HashMap<String, Vec<u8>>> {
            std::future::pending().await
        }
        async fn hdel(&self, _key: &str, _field: &str) -> Result<()> {
            std::future::pending().await
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<()> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_rpc_paths() {
        assert_eq!(Rpc::from_path("/sd/register"), Some(Rpc::Register));
        assert_eq!(Rpc::from_path("/ingress/get"), Some(Rpc::GetRule));
        assert_eq!(Rpc::from_path("/sd"), None);
        assert_eq!(op_label("/healthz"), "healthz");
        assert_eq!(op_label("/whatever"), "unknown");
    }

    #[tokio::test]
    async fn test_rule_round_trip() {
        let server = server();
        let body = format!(r#"{{"host":"a.gost.plus","endpoint":"{}"}}"#, TOKEN);
        let response = server.handle(post("/ingress/set", &body), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, Bytes::from_static(b"{}"));

        let response = server
            .handle(post("/ingress/get", r#"{"host":"a.gost.plus:443"}"#), None)
            .await;
        let reply: GetRuleReply = json_of(response).await;
        assert_eq!(reply.endpoint, TOKEN);

        let response = server
            .handle(post("/ingress/get", r#"{"host":"a.other.tld"}"#), None)
            .await;
        let reply: GetRuleReply = json_of(response).await;
        assert_eq!(reply.endpoint, "");
    }

    #[tokio::test]
    async fn test_register_uses_peer_address() {
        let server = server();
        let peer: SocketAddr = "198.51.100.4:50000".parse().unwrap();
        let response = server
            .handle(
                post(
                    "/sd/register",
                    r#"{"service":{"id":"c1","name":"t1","node":"n1","network":"tcp","address":":9000"}}"#,
                ),
                Some(peer),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let reply: StatusReply = json_of(response).await;
        assert!(reply.ok);

        let response = server.handle(post("/sd/get", r#"{"name":"t1"}"#), None).await;
        let reply: GetServiceReply = json_of(response).await;
        assert_eq!(reply.services.len(), 1);
        assert_eq!(reply.services[0].address, "198.51.100.4:9000");
    }

    #[tokio::test]
    async fn test_register_invalid_argument() {
        let server = server();
        let response = server
            .handle(post("/sd/register", r#"{"service":{"id":"c1","name":"t1"}}"#), None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let reply: directory_api::ErrorReply = json_of(response).await;
        assert!(reply.error.contains("invalid argument"));
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let server = server();
        let response = server.handle(post("/ingress/set", "{not json"), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = server();
        let name = "x".repeat(DEFAULT_MAX_BODY_BYTES);
        let body = format!(r#"{{"name":"{}"}}"#, name);
        let response = server.handle(post("/sd/get", &body), None).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let server = self::server().with_max_body_bytes(16);
        let response = server
            .handle(post("/ingress/get", r#"{"host":"a.gost.plus:443"}"#), None)
            .await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let response = server.handle(post("/sd/get", r#"{"name":"t1"}"#), None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_request() {
        let server = server();
        let response = server.handle(post("/sd/get", ""), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let reply: GetServiceReply = json_of(response).await;
        assert!(reply.services.is_empty());
    }

    #[tokio::test]
    async fn test_limit() {
        let server = server();
        let response = server
            .handle(post("/limiter/limit", r#"{"client":"user-1"}"#), None)
            .await;
        let reply: LimitReply = json_of(response).await;
        assert_eq!(reply.limit_in, 1_048_576);
        assert_eq!(reply.limit_out, 1_048_576);
    }

    #[tokio::test]
    async fn test_store_failure_is_retryable_status() {
        let server = server_with(Arc::new(DownStore));
        let response = server
            .handle(post("/ingress/get", r#"{"host":"example.com"}"#), None)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let metrics = server.metrics.gather().unwrap();
        assert!(metrics.contains("directory_errors_total{op=\"get_rule\"} 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_store_times_out() {
        let server = server_with(Arc::new(StuckStore)).with_request_timeout(Duration::from_secs(2));
        let response = server
            .handle(post("/sd/get", r#"{"name":"t1"}"#), None)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let reply: directory_api::ErrorReply = json_of(response).await;
        assert!(reply.error.contains("timed out"));
    }

    #[tokio::test]
    async fn test_routing_errors() {
        let server = server();
        let response = server.handle(post("/nope", "{}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let get = Request::builder()
            .method(Method::GET)
            .uri("/sd/get")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = server.handle(get, None).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let server = server();
        let get = |path: &str| {
            Request::builder()
                .method(Method::GET)
                .uri(path)
                .body(Full::new(Bytes::new()))
                .unwrap()
        };

        let response = server.handle(get("/healthz"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, Bytes::from_static(b"OK\n"));

        let response = server.handle(get("/metrics"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let text = String::from_utf8(body_of(response).await.to_vec()).unwrap();
        assert!(text.contains("directory_requests_total{op=\"healthz\"} 1"));
    }
}
