//! Service registry tracking live connector endpoints per tunnel

use crate::net::{resolve_address, Network};
use crate::{DirectoryError, KvStore, Result, ServiceRecord};
use directory_api::Service;
use rand::seq::SliceRandom;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Registry configuration
#[derive(Clone, Debug)]
pub struct RegistryOptions {
    /// Liveness window of a record and TTL of a tunnel's hash
    pub expiration: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            expiration: Duration::from_secs(60),
        }
    }
}

/// ServiceRegistry maps a tunnel name to its connector endpoints.
///
/// Each tunnel is one hash in the store, one field per connector ID. A
/// record is live while its last renewal is within the expiration window;
/// stale records are skipped on read and disappear with the hash once no
/// connector renews it.
pub struct ServiceRegistry {
    store: Arc<dyn KvStore>,
    opts: RegistryOptions,
}

impl ServiceRegistry {
    pub fn new(store: Arc<dyn KvStore>, opts: RegistryOptions) -> Self {
        Self { store, opts }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Register or replace a connector endpoint.
    ///
    /// `peer` is the address the call came from; it fills in the host when
    /// the connector only reports a port.
    pub async fn register(&self, service: &Service, peer: Option<SocketAddr>) -> Result<()> {
        if service.id.is_empty() || service.name.is_empty() || service.node.is_empty() {
            return Err(DirectoryError::InvalidArgument(
                "tunnel name, connector id and node are required".to_string(),
            ));
        }

        let network = Network::from_name(&service.network);
        let address = resolve_address(&service.address, peer).await.map_err(|e| {
            error!(
                tunnel = %service.name,
                connector = %service.id,
                address = %service.address,
                "Rejecting registration: {}", e
            );
            e
        })?;

        let record = ServiceRecord {
            node: service.node.clone(),
            network: network.as_str().to_string(),
            address,
            renew: Self::now(),
        };
        let value = serde_json::to_vec(&record)?;

        self.store
            .hset(&service.name, &service.id, &value)
            .await
            .map_err(|e| {
                error!(tunnel = %service.name, connector = %service.id, "Register failed: {}", e);
                e
            })?;
        self.store.expire(&service.name, self.opts.expiration).await?;

        info!(
            tunnel = %service.name,
            connector = %service.id,
            node = %record.node,
            "Registered {}/{}",
            record.address,
            record.network
        );
        Ok(())
    }

    /// Remove a connector endpoint.
    ///
    /// Removing an unknown connector succeeds. Returns false without touching
    /// the store when the tunnel name or connector ID is empty.
    pub async fn deregister(&self, tunnel: &str, connector: &str) -> Result<bool> {
        if tunnel.is_empty() || connector.is_empty() {
            return Ok(false);
        }

        self.store.hdel(tunnel, connector).await.map_err(|e| {
            error!(tunnel = %tunnel, connector = %connector, "Deregister failed: {}", e);
            e
        })?;

        info!(tunnel = %tunnel, connector = %connector, "Deregistered");
        Ok(true)
    }

    /// Refresh the renewal time of a registered connector.
    ///
    /// An unknown connector is not recreated and the call still succeeds. A
    /// stale record is renewed like any other. Returns false when the
    /// identifiers are empty or the stored record cannot be decoded.
    pub async fn renew(&self, tunnel: &str, connector: &str) -> Result<bool> {
        if tunnel.is_empty() || connector.is_empty() {
            return Ok(false);
        }

        let value = match self.store.hget(tunnel, connector).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(tunnel = %tunnel, connector = %connector, "Renew of unknown connector ignored");
                return Ok(true);
            }
            Err(e) => {
                error!(tunnel = %tunnel, connector = %connector, "Renew failed: {}", e);
                return Err(e);
            }
        };

        let mut record: ServiceRecord = match serde_json::from_slice(&value) {
            Ok(record) => record,
            Err(e) => {
                warn!(tunnel = %tunnel, connector = %connector, "Skipping renew of undecodable record: {}", e);
                return Ok(false);
            }
        };

        record.renew = Self::now();
        let value = serde_json::to_vec(&record)?;
        self.store.hset(tunnel, connector, &value).await?;
        self.store.expire(tunnel, self.opts.expiration).await?;

        info!(tunnel = %tunnel, connector = %connector, "Renewed");
        Ok(true)
    }

    /// Live endpoints of a tunnel in random order.
    ///
    /// Undecodable, incomplete and stale records are left out.
    pub async fn get_live_endpoints(&self, tunnel: &str) -> Result<Vec<Service>> {
        if tunnel.is_empty() {
            return Ok(Vec::new());
        }

        let fields = self.store.hgetall(tunnel).await.map_err(|e| {
            error!(tunnel = %tunnel, "Get services failed: {}", e);
            e
        })?;

        let now = Self::now();
        let mut services: Vec<Service> = fields
            .into_iter()
            .filter_map(|(id, value)| {
                let record: ServiceRecord = match serde_json::from_slice(&value) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(tunnel = %tunnel, connector = %id, "Skipping undecodable record: {}", e);
                        return None;
                    }
                };
                if !record.is_complete() || !record.is_live(now, self.opts.expiration) {
                    return None;
                }
                Some(Service {
                    id,
                    name: tunnel.to_string(),
                    node: record.node,
                    network: record.network,
                    address: record.address,
                })
            })
            .collect();

        if services.len() > 1 {
            services.shuffle(&mut rand::thread_rng());
        }

        debug!(tunnel = %tunnel, count = services.len(), "get services");
        Ok(services)
    }
}
