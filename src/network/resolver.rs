//! Domain name to IPv4 resolution

use crate::ScanError;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

/// A target name resolved to a single IPv4 address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    name: String,
    address: Ipv4Addr,
}

impl ResolvedTarget {
    pub fn new(name: impl Into<String>, address: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }

    /// The name as supplied by the caller
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Dotted-decimal rendering of the address
    pub fn address_string(&self) -> String {
        self.address.to_string()
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Name resolution seam used by the scan engine
pub trait Resolve {
    /// Resolve `name` to its first IPv4 address. Attempted once, never retried.
    fn resolve(&self, name: &str) -> crate::Result<ResolvedTarget>;
}

impl<R: Resolve + ?Sized> Resolve for &R {
    fn resolve(&self, name: &str) -> crate::Result<ResolvedTarget> {
        (**self).resolve(name)
    }
}

/// Resolver backed by the operating system's lookup facility
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for SystemResolver {
    fn resolve(&self, name: &str) -> crate::Result<ResolvedTarget> {
        if name.is_empty() {
            return Err(ScanError::EmptyQuery);
        }

        // Literal addresses skip the lookup entirely
        if let Ok(address) = name.parse::<Ipv4Addr>() {
            return Ok(ResolvedTarget::new(name, address));
        }

        // The lookup carries a stream-socket hint, so the query is the same
        // regardless of the protocol later used for probing.
        let addrs = (name, 0u16)
            .to_socket_addrs()
            .map_err(|source| ScanError::LookupFailed {
                name: name.to_string(),
                source,
            })?;

        let address = addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| ScanError::NoAddressRecord(name.to_string()))?;

        log::debug!("Resolved {} to {}", name, address);
        Ok(ResolvedTarget::new(name, address))
    }
}
