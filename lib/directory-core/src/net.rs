//! Address helpers shared by the routing table and the registry

use crate::{DirectoryError, Result};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Transport a connector is reachable on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    Tcp,
    Udp,
}

impl Network {
    /// Anything other than `udp` is treated as `tcp`
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("udp") {
            Network::Udp
        } else {
            Network::Tcp
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Udp => "udp",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split `host:port` or `[host]:port` into its parts.
///
/// Returns `None` when the port is missing or the host is an unbracketed
/// IPv6 literal.
pub fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    if let Some(rest) = addr.strip_prefix('[') {
        let end = rest.find(']')?;
        let host = &rest[..end];
        let port = rest[end + 1..].strip_prefix(':')?;
        if port.contains(':') {
            return None;
        }
        return Some((host, port));
    }

    let (host, port) = addr.rsplit_once(':')?;
    if host.contains(':') || host.contains('[') || host.contains(']') {
        return None;
    }
    Some((host, port))
}

/// Join a host and port, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Drop an optional `:port` suffix from a host
pub fn strip_port(host: &str) -> &str {
    match split_host_port(host) {
        Some((h, _)) if !h.is_empty() => h,
        _ => host,
    }
}

/// Validate a connector address and fill in a missing host from the peer.
///
/// The address must carry a numeric port. A named host must resolve. When
/// the host part is empty it is replaced by the peer's IP, keeping the port;
/// without a peer such an address is rejected.
pub async fn resolve_address(address: &str, peer: Option<SocketAddr>) -> Result<String> {
    let (host, port) = split_host_port(address).ok_or_else(|| {
        DirectoryError::InvalidArgument(format!("address {}: missing port", address))
    })?;
    let port_num: u16 = port.parse().map_err(|_| {
        DirectoryError::InvalidArgument(format!("address {}: invalid port", address))
    })?;

    if host.is_empty() {
        return match peer {
            Some(peer) => Ok(join_host_port(&peer.ip().to_string(), port)),
            None => Err(DirectoryError::InvalidArgument(format!(
                "address {}: missing host",
                address
            ))),
        };
    }

    if host.parse::<IpAddr>().is_err() {
        let mut addrs = tokio::net::lookup_host((host, port_num)).await.map_err(|e| {
            DirectoryError::InvalidArgument(format!("address {}: {}", address, e))
        })?;
        if addrs.next().is_none() {
            return Err(DirectoryError::InvalidArgument(format!(
                "address {}: no such host",
                address
            )));
        }
    }

    Ok(address.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("a.example.com:443"), Some(("a.example.com", "443")));
        assert_eq!(split_host_port(":9000"), Some(("", "9000")));
        assert_eq!(split_host_port("[::1]:80"), Some(("::1", "80")));
        assert_eq!(split_host_port("a.example.com"), None);
        assert_eq!(split_host_port("::1"), None);
        assert_eq!(split_host_port("[::1]"), None);
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("a.gost.plus:443"), "a.gost.plus");
        assert_eq!(strip_port("a.gost.plus"), "a.gost.plus");
        assert_eq!(strip_port(":443"), ":443");
        assert_eq!(strip_port("[::1]:443"), "::1");
    }

    #[test]
    fn test_join_host_port() {
        assert_eq!(join_host_port("10.0.0.1", "80"), "10.0.0.1:80");
        assert_eq!(join_host_port("::1", "80"), "[::1]:80");
    }

    #[test]
    fn test_network_from_name() {
        assert_eq!(Network::from_name("udp"), Network::Udp);
        assert_eq!(Network::from_name("tcp"), Network::Tcp);
        assert_eq!(Network::from_name(""), Network::Tcp);
        assert_eq!(Network::from_name("sctp"), Network::Tcp);
    }

    #[tokio::test]
    async fn test_resolve_backfills_host_from_peer() {
        let peer: SocketAddr = "192.168.1.7:51234".parse().unwrap();
        let address = resolve_address(":9000", Some(peer)).await.unwrap();
        assert_eq!(address, "192.168.1.7:9000");

        let peer: SocketAddr = "[fe80::1]:51234".parse().unwrap();
        let address = resolve_address(":9000", Some(peer)).await.unwrap();
        assert_eq!(address, "[fe80::1]:9000");
    }

    #[tokio::test]
    async fn test_resolve_keeps_explicit_host() {
        let peer: SocketAddr = "192.168.1.7:51234".parse().unwrap();
        let address = resolve_address("10.0.0.1:9000", Some(peer)).await.unwrap();
        assert_eq!(address, "10.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_resolve_rejects_bad_addresses() {
        assert!(matches!(
            resolve_address("10.0.0.1", None).await,
            Err(DirectoryError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve_address("10.0.0.1:http-alt", None).await,
            Err(DirectoryError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve_address("10.0.0.1:70000", None).await,
            Err(DirectoryError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_port_only_without_peer() {
        assert!(matches!(
            resolve_address(":9000", None).await,
            Err(DirectoryError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_named_hosts() {
        let address = resolve_address("localhost:9000", None).await.unwrap();
        assert_eq!(address, "localhost:9000");

        // .invalid is reserved and never resolves
        assert!(matches!(
            resolve_address("nope.invalid:80", None).await,
            Err(DirectoryError::InvalidArgument(_))
        ));
    }
}
