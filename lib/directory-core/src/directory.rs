//! Directory service composing the routing table, registry and limiter

use crate::{
    DirectoryError, IngressOptions, KvStore, LimiterOptions, RegistryOptions, Result, ServiceRegistry,
    TrafficLimiter, TunnelRoutingTable,
};
use directory_api::{
    DeregisterRequest, GetRuleReply, GetRuleRequest, GetServiceReply, GetServiceRequest,
    LimitReply, LimitRequest, RegisterRequest, RenewRequest, SetRuleReply, SetRuleRequest,
    StatusReply,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct DirectoryConfig {
    pub ingress: IngressOptions,
    pub registry: RegistryOptions,
    pub limiter: LimiterOptions,
}

/// Directory serves the plugin RPCs used by relay nodes.
///
/// The tables hold injected store handles; the directory itself keeps no
/// state between calls. Routing keys and tunnel names share one keyspace
/// when both tables use the same store.
pub struct Directory {
    rules: TunnelRoutingTable,
    services: ServiceRegistry,
    limiter: TrafficLimiter,
}

impl Directory {
    pub fn new(store: Arc<dyn KvStore>, config: DirectoryConfig) -> Self {
        Self::with_stores(store.clone(), store, config)
    }

    /// Build a directory whose routing table and registry use separate stores
    pub fn with_stores(
        rules_store: Arc<dyn KvStore>,
        services_store: Arc<dyn KvStore>,
        config: DirectoryConfig,
    ) -> Self {
        Self {
            rules: TunnelRoutingTable::new(rules_store, config.ingress),
            services: ServiceRegistry::new(services_store, config.registry),
            limiter: TrafficLimiter::new(config.limiter),
        }
    }

    pub async fn set_rule(&self, req: SetRuleRequest) -> Result<SetRuleReply> {
        self.rules.set_rule(&req.host, &req.endpoint).await?;
        Ok(SetRuleReply {})
    }

    pub async fn get_rule(&self, req: GetRuleRequest) -> Result<GetRuleReply> {
        let endpoint = self.rules.get_rule(&req.host).await?.unwrap_or_default();
        Ok(GetRuleReply { endpoint })
    }

    pub async fn register(
        &self,
        req: RegisterRequest,
        peer: Option<SocketAddr>,
    ) -> Result<StatusReply> {
        let service = req
            .service
            .ok_or_else(|| DirectoryError::InvalidArgument("service is required".to_string()))?;
        self.services.register(&service, peer).await?;
        Ok(StatusReply { ok: true })
    }

    pub async fn deregister(&self, req: DeregisterRequest) -> Result<StatusReply> {
        let ok = match req.service {
            Some(service) => self.services.deregister(&service.name, &service.id).await?,
            None => false,
        };
        Ok(StatusReply { ok })
    }

    pub async fn renew(&self, req: RenewRequest) -> Result<StatusReply> {
        let ok = match req.service {
            Some(service) => self.services.renew(&service.name, &service.id).await?,
            None => false,
        };
        Ok(StatusReply { ok })
    }

    pub async fn get_services(&self, req: GetServiceRequest) -> Result<GetServiceReply> {
        let services = self.services.get_live_endpoints(&req.name).await?;
        Ok(GetServiceReply { services })
    }

    pub fn limit(&self, req: LimitRequest) -> LimitReply {
        self.limiter.limit(&req.client)
    }
}
