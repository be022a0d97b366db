//! Middleware hooks around every directory request

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};

/// Context passed through middleware chain
#[derive(Clone, Debug)]
pub struct MiddlewareContext {
    /// Operation label (`set_rule`, `register`, `healthz`, ...)
    pub op: &'static str,
    /// Request method
    pub method: String,
    /// Request path
    pub path: String,
    /// Remote address of the connection
    pub peer: Option<SocketAddr>,
    /// When the request was received
    pub started_at: Instant,
}

impl MiddlewareContext {
    pub fn new(op: &'static str, method: &str, path: &str, peer: Option<SocketAddr>) -> Self {
        Self {
            op,
            method: method.to_string(),
            path: path.to_string(),
            peer,
            started_at: Instant::now(),
        }
    }

    pub fn peer_label(&self) -> String {
        self.peer
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Middleware trait for observing requests and responses
#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str {
        "UnnamedMiddleware"
    }

    /// Called before the request is handled
    async fn on_request(&self, _context: &MiddlewareContext) -> Result<()> {
        Ok(())
    }

    /// Called once the response status is known
    async fn on_response(&self, _context: &MiddlewareContext, _status: u16) -> Result<()> {
        Ok(())
    }

    /// Called when the directory call failed
    async fn on_error(&self, _context: &MiddlewareContext, _error: &str) -> Result<()> {
        Ok(())
    }
}

/// Chain of middleware to execute in order
pub struct MiddlewareChain {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
        }
    }

    /// Add middleware to the chain
    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub async fn on_request(&self, context: &MiddlewareContext) -> Result<()> {
        for mw in &self.middleware {
            let span = span!(Level::DEBUG, "middleware", name = mw.name());
            let _guard = span.enter();
            mw.on_request(context).await?;
        }
        Ok(())
    }

    /// Runs in reverse order
    pub async fn on_response(&self, context: &MiddlewareContext, status: u16) -> Result<()> {
        for mw in self.middleware.iter().rev() {
            let span = span!(Level::DEBUG, "middleware", name = mw.name());
            let _guard = span.enter();
            mw.on_response(context, status).await?;
        }
        Ok(())
    }

    pub async fn on_error(&self, context: &MiddlewareContext, error: &str) -> Result<()> {
        for mw in &self.middleware {
            let span = span!(Level::DEBUG, "middleware", name = mw.name());
            let _guard = span.enter();
            mw.on_error(context, error).await?;
        }
        Ok(())
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs one line per request, warns on failed calls
pub struct LoggingMiddleware;

#[async_trait::async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }

    async fn on_request(&self, context: &MiddlewareContext) -> Result<()> {
        debug!(
            op = context.op,
            peer = %context.peer_label(),
            "Request: {} {}",
            context.method,
            context.path
        );
        Ok(())
    }

    async fn on_response(&self, context: &MiddlewareContext, status: u16) -> Result<()> {
        let elapsed_ms = context.started_at.elapsed().as_millis() as u64;
        if status >= 500 {
            info!(op = context.op, status, elapsed_ms, "Response: {} {}", context.method, context.path);
        } else {
            debug!(op = context.op, status, elapsed_ms, "Response: {} {}", context.method, context.path);
        }
        Ok(())
    }

    async fn on_error(&self, context: &MiddlewareContext, error: &str) -> Result<()> {
        warn!(
            op = context.op,
            peer = %context.peer_label(),
            "{} {} failed: {}",
            context.method,
            context.path,
            error
        );
        Ok(())
    }
}
