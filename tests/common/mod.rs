//! Shared stubs for the integration tests

#![allow(dead_code)]

use cpscan::network::{ConnectStatus, Readiness};
use cpscan::{Protocol, Resolve, ResolvedTarget, ScanError, Transport};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

/// Resolver answering from a fixed table and counting its calls
#[derive(Debug, Default)]
pub struct StubResolver {
    answers: HashMap<String, Ipv4Addr>,
    calls: Cell<usize>,
}

impl StubResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, name: &str, address: Ipv4Addr) -> Self {
        self.answers.insert(name.to_string(), address);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Resolve for StubResolver {
    fn resolve(&self, name: &str) -> cpscan::Result<ResolvedTarget> {
        self.calls.set(self.calls.get() + 1);
        if name.is_empty() {
            return Err(ScanError::EmptyQuery);
        }
        self.answers
            .get(name)
            .map(|address| ResolvedTarget::new(name, *address))
            .ok_or_else(|| ScanError::NoAddressRecord(name.to_string()))
    }
}

/// Socket handle handed out by [`StubTransport`]; deliberately not `Clone`
#[derive(Debug)]
pub struct StubHandle {
    id: usize,
    connects: Cell<u32>,
}

/// Bookkeeping of everything the stub transport was asked to do
#[derive(Debug, Default)]
pub struct TransportStats {
    pub opened: usize,
    pub closed: usize,
    pub live: HashSet<usize>,
    pub double_closes: usize,
    pub protocols: Vec<Protocol>,
    /// Port of every connect call, in order
    pub connects: Vec<u16>,
    pub waits: Vec<Duration>,
}

/// Transport scripted per port, with handle-count accounting
#[derive(Debug, Default)]
pub struct StubTransport {
    /// Ports that connect once the readiness wait has passed
    accepting: HashSet<u16>,
    /// Ports whose first connect already succeeds
    immediate: HashSet<u16>,
    /// Ports that actively refuse on re-check
    refusing: HashSet<u16>,
    /// Indices (0-based, per `open` call) whose socket creation fails
    fail_open: HashSet<usize>,
    /// Indices whose switch to non-blocking mode fails
    fail_mode: HashSet<usize>,
    opens: Cell<usize>,
    stats: RefCell<TransportStats>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepting(mut self, ports: &[u16]) -> Self {
        self.accepting.extend(ports);
        self
    }

    pub fn immediate(mut self, ports: &[u16]) -> Self {
        self.immediate.extend(ports);
        self
    }

    pub fn refusing(mut self, ports: &[u16]) -> Self {
        self.refusing.extend(ports);
        self
    }

    pub fn failing_open(mut self, index: usize) -> Self {
        self.fail_open.insert(index);
        self
    }

    pub fn failing_mode(mut self, index: usize) -> Self {
        self.fail_mode.insert(index);
        self
    }

    pub fn stats(&self) -> std::cell::Ref<'_, TransportStats> {
        self.stats.borrow()
    }

    /// Number of connect calls made against `port`
    pub fn connects_to(&self, port: u16) -> usize {
        self.stats.borrow().connects.iter().filter(|&&p| p == port).count()
    }
}

impl Transport for StubTransport {
    type Handle = StubHandle;

    fn open(&self, protocol: Protocol) -> io::Result<StubHandle> {
        let index = self.opens.get();
        self.opens.set(index + 1);

        let mut stats = self.stats.borrow_mut();
        stats.protocols.push(protocol);
        if self.fail_open.contains(&index) {
            return Err(io::Error::new(io::ErrorKind::Other, "descriptor table full"));
        }

        stats.opened += 1;
        stats.live.insert(index);
        Ok(StubHandle {
            id: index,
            connects: Cell::new(0),
        })
    }

    fn set_nonblocking(&self, handle: &StubHandle) -> io::Result<()> {
        if self.fail_mode.contains(&handle.id) {
            return Err(io::Error::new(io::ErrorKind::Other, "FIONBIO rejected"));
        }
        Ok(())
    }

    fn connect(&self, handle: &StubHandle, addr: SocketAddrV4) -> ConnectStatus {
        let port = addr.port();
        self.stats.borrow_mut().connects.push(port);
        let attempt = handle.connects.get();
        handle.connects.set(attempt + 1);

        if self.immediate.contains(&port) {
            return ConnectStatus::Connected;
        }
        if attempt == 0 {
            return ConnectStatus::InProgress;
        }
        if self.accepting.contains(&port) {
            ConnectStatus::Connected
        } else if self.refusing.contains(&port) {
            ConnectStatus::Failed(io::Error::from(io::ErrorKind::ConnectionRefused))
        } else {
            ConnectStatus::InProgress
        }
    }

    fn wait_writable(&self, _handle: &StubHandle, timeout: Duration) -> io::Result<Readiness> {
        self.stats.borrow_mut().waits.push(timeout);
        Ok(Readiness::Ready)
    }

    fn close(&self, handle: StubHandle) {
        let mut stats = self.stats.borrow_mut();
        stats.closed += 1;
        if !stats.live.remove(&handle.id) {
            stats.double_closes += 1;
        }
    }
}
