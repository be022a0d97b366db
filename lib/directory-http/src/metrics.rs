//! Prometheus metrics for directory requests

use crate::middleware::{Middleware, MiddlewareContext};
use anyhow::Result;
use prometheus::{CounterVec, Encoder, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tracing::debug;

/// Prometheus metrics collector, cheap to clone
#[derive(Clone)]
pub struct MetricsCollector {
    /// Requests received per operation
    pub requests_total: CounterVec,
    /// Request latency per operation
    pub request_duration_seconds: HistogramVec,
    /// Responses per status code
    pub responses_total: CounterVec,
    /// Failed directory calls per operation
    pub errors_total: CounterVec,
    pub registry: Arc<Registry>,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let requests_total = CounterVec::new(
            Opts::new("directory_requests_total", "Total directory requests"),
            &["op"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            Opts::new(
                "directory_request_duration_seconds",
                "Directory request latency in seconds",
            )
            .into(),
            &["op"],
        )?;

        let responses_total = CounterVec::new(
            Opts::new("directory_responses_total", "Total responses by status"),
            &["status"],
        )?;

        let errors_total = CounterVec::new(
            Opts::new("directory_errors_total", "Total failed directory calls"),
            &["op"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(responses_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            responses_total,
            errors_total,
            registry,
        })
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Records request counts, latency and failures
pub struct MetricsMiddleware {
    pub collector: MetricsCollector,
}

impl MetricsMiddleware {
    pub fn new(collector: MetricsCollector) -> Self {
        Self { collector }
    }
}

#[async_trait::async_trait]
impl Middleware for MetricsMiddleware {
    fn name(&self) -> &'static str {
        "MetricsMiddleware"
    }

    async fn on_request(&self, context: &MiddlewareContext) -> Result<()> {
        self.collector
            .requests_total
            .with_label_values(&[context.op])
            .inc();
        Ok(())
    }

    async fn on_response(&self, context: &MiddlewareContext, status: u16) -> Result<()> {
        self.collector
            .responses_total
            .with_label_values(&[&status.to_string()])
            .inc();
        self.collector
            .request_duration_seconds
            .with_label_values(&[context.op])
            .observe(context.started_at.elapsed().as_secs_f64());
        Ok(())
    }

    async fn on_error(&self, context: &MiddlewareContext, error: &str) -> Result<()> {
        debug!(op = context.op, "Recording error: {}", error);
        self.collector
            .errors_total
            .with_label_values(&[context.op])
            .inc();
        Ok(())
    }
}
