//! Stored connector records
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A connector endpoint as stored in its tunnel's hash, keyed by connector ID.
///
/// Field names match the records written by earlier deployments sharing the
/// same store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRecord {
    #[serde(default)]
    pub node: String,
    /// `tcp` or `udp`
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub address: String,
    /// Last register/renew time in unix seconds
    #[serde(default)]
    pub renew: i64,
}

impl ServiceRecord {
    /// A record is live while no more than `expiration` has passed since its
    /// last renewal.
    pub fn is_live(&self, now: i64, expiration: Duration) -> bool {
        let window = i64::try_from(expiration.as_secs()).unwrap_or(i64::MAX);
        now.saturating_sub(self.renew) <= window
    }

    /// Records missing a node or an address are never served
    pub fn is_complete(&self) -> bool {
        !self.node.is_empty() && !self.address.is_empty()
    }
}
