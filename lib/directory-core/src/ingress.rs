//! Tunnel routing table mapping public hosts to tunnel IDs

use crate::net::strip_port;
use crate::{KvStore, Result, TunnelId};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Routing table configuration
#[derive(Clone, Debug)]
pub struct IngressOptions {
    /// TTL of a host binding
    pub expiration: Duration,
    /// Domain suffix; hosts under it are keyed by their first label
    pub domain: String,
}

impl Default for IngressOptions {
    fn default() -> Self {
        Self {
            expiration: Duration::from_secs(3600),
            domain: "gost.plus".to_string(),
        }
    }
}

/// TunnelRoutingTable binds a host to a tunnel for one TTL window.
///
/// The first binding written for a host wins until it expires; later writes
/// for the same host are ignored.
pub struct TunnelRoutingTable {
    store: Arc<dyn KvStore>,
    opts: IngressOptions,
}

impl TunnelRoutingTable {
    pub fn new(store: Arc<dyn KvStore>, opts: IngressOptions) -> Self {
        Self { store, opts }
    }

    /// Derive the store key for an inbound host.
    ///
    /// The port is dropped. A host ending in the configured domain is reduced
    /// to the part before its first `.`, anything else is used whole.
    pub fn routing_key<'a>(&self, host: &'a str) -> &'a str {
        let host = strip_port(host);
        if self.opts.domain.is_empty() || !host.ends_with(self.opts.domain.as_str()) {
            return host;
        }
        match host.find('.') {
            Some(n) if n > 0 => &host[..n],
            _ => host,
        }
    }

    /// Bind `host` to the tunnel named by `token`.
    ///
    /// An empty host or an invalid token is a no-op. Returns true when this
    /// call created the binding.
    pub async fn set_rule(&self, host: &str, token: &str) -> Result<bool> {
        let tid = match TunnelId::parse(token) {
            Some(tid) if !host.is_empty() => tid,
            _ => {
                debug!(host = %host, endpoint = %token, "Ignoring rule with empty host or invalid tunnel");
                return Ok(false);
            }
        };

        let key = self.routing_key(host);
        if key.is_empty() {
            return Ok(false);
        }

        let written = self
            .store
            .set_nx(key, &tid.to_string(), self.opts.expiration)
            .await?;
        debug!(host = %host, key = %key, tunnel = %tid, written, "set rule");
        Ok(written)
    }

    /// Look up the tunnel token bound to `host`; `None` on a miss
    pub async fn get_rule(&self, host: &str) -> Result<Option<String>> {
        let key = self.routing_key(host);
        if key.is_empty() {
            return Ok(None);
        }

        let endpoint = self.store.get(key).await?;
        debug!(
            host = %host,
            key = %key,
            endpoint = endpoint.as_deref().unwrap_or(""),
            "get rule"
        );
        Ok(endpoint)
    }
}
