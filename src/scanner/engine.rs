//! Scan orchestration: resolve once, then probe each port in ascending order

use crate::network::{ProbeOutcome, Protocol, Resolve, ResolvedTarget, SystemResolver, SystemTransport, Transport};
use crate::scanner::probe::Prober;
use crate::scanner::ScanRequest;
use std::iter::FusedIterator;
use std::ops::RangeInclusive;

/// Main scanning engine
///
/// Owns the resolver and the prober's transport. A scan is strictly
/// sequential: one port in flight at a time, outcomes handed to the caller
/// as they are produced.
#[derive(Debug, Clone, Default)]
pub struct ScanEngine<R, T> {
    resolver: R,
    prober: Prober<T>,
}

impl ScanEngine<SystemResolver, SystemTransport> {
    /// Engine backed by the system resolver and BSD sockets
    pub fn system() -> Self {
        Self::new(SystemResolver::new(), SystemTransport::new())
    }
}

impl<R: Resolve, T: Transport> ScanEngine<R, T> {
    pub fn new(resolver: R, transport: T) -> Self {
        Self {
            resolver,
            prober: Prober::new(transport),
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn prober(&self) -> &Prober<T> {
        &self.prober
    }

    /// Start a scan. Resolution happens here, exactly once; a failure is
    /// returned before any port is probed. The returned iterator probes
    /// lazily, one port per `next()`.
    pub fn scan(&self, request: ScanRequest) -> crate::Result<PortScan<'_, T>> {
        log::debug!("Resolving {}", request.target);
        let target = self.resolver.resolve(&request.target).map_err(|e| {
            log::debug!("Resolution of {:?} failed: {}", request.target, e);
            e
        })?;

        let timeout_micros = request.timeout_micros();
        log::info!(
            "Scanning {} ({}) ports {}-{}/{} with a {}us readiness budget",
            target.name(),
            target.address(),
            request.port_start,
            request.port_end,
            request.protocol,
            timeout_micros
        );

        Ok(PortScan {
            prober: &self.prober,
            ports: request.ports(),
            target,
            protocol: request.protocol,
            timeout_micros,
            debug: request.debug,
        })
    }
}

/// Lazy, finite, non-restartable sequence of per-port outcomes
#[derive(Debug)]
pub struct PortScan<'e, T> {
    prober: &'e Prober<T>,
    ports: RangeInclusive<u16>,
    target: ResolvedTarget,
    protocol: Protocol,
    timeout_micros: u64,
    debug: bool,
}

impl<T> PortScan<'_, T> {
    /// The address every port is probed on
    pub fn target(&self) -> &ResolvedTarget {
        &self.target
    }

    /// Normalised readiness budget per port
    pub fn timeout_micros(&self) -> u64 {
        self.timeout_micros
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl<T: Transport> Iterator for PortScan<'_, T> {
    type Item = ProbeOutcome;

    fn next(&mut self) -> Option<ProbeOutcome> {
        let port = self.ports.next()?;
        Some(self.prober.probe(
            self.target.address(),
            port,
            self.protocol,
            self.timeout_micros,
            self.debug,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ports.size_hint()
    }
}

impl<T: Transport> FusedIterator for PortScan<'_, T> {}
