//! Single-port connectivity probe
//!
//! A probe opens one non-blocking socket, issues a connect, waits once for
//! readiness (bounded by the caller's timeout) and then re-checks the
//! connection state a bounded number of times. A single readiness
//! notification does not guarantee that the socket state has been
//! updated, hence the re-check phase.
//!
//! ```text
//!   Connecting --connected on re-check--------> Open
//!   Connecting --failed / budget exhausted----> Closed
//!   Connecting --no handshake in progress-----> Closed
//!   (socket creation or mode failure) --------> Error
//! ```

use crate::error::ProbeError;
use crate::network::{ConnectStatus, PortStatus, ProbeOutcome, Protocol, Readiness, Transport};
use log::{debug, error, trace};
use std::mem::ManuallyDrop;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

/// Re-checks issued per cycle after the readiness wait
pub const CHECKS_PER_CYCLE: u32 = 10;

/// Cycles of re-checks before a port is declared closed
pub const MAX_CYCLES: u32 = 2;

/// States of one probe session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Connecting,
    Open,
    Closed,
    Error,
}

impl ProbeState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProbeState::Connecting)
    }

    fn status(&self) -> PortStatus {
        match self {
            ProbeState::Open => PortStatus::Open,
            ProbeState::Error => PortStatus::Error,
            ProbeState::Connecting | ProbeState::Closed => PortStatus::Closed,
        }
    }
}

/// Bounded re-check budget: `CHECKS_PER_CYCLE` checks per cycle, `MAX_CYCLES` cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryBudget {
    checks: u32,
    cycles: u32,
}

impl RetryBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one re-check. Returns false once the budget is spent.
    pub fn spend(&mut self) -> bool {
        self.checks += 1;
        if self.checks >= CHECKS_PER_CYCLE {
            self.cycles += 1;
            self.checks = 0;
        }
        !self.exhausted()
    }

    pub fn exhausted(&self) -> bool {
        self.cycles >= MAX_CYCLES
    }

    pub fn checks(&self) -> u32 {
        self.checks
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }
}

/// Transition taken after a re-check reported `status`
pub fn next_state(budget: &mut RetryBudget, status: &ConnectStatus) -> ProbeState {
    match status {
        ConnectStatus::Connected => ProbeState::Open,
        ConnectStatus::Failed(_) => ProbeState::Closed,
        ConnectStatus::InProgress => {
            if budget.spend() {
                ProbeState::Connecting
            } else {
                ProbeState::Closed
            }
        }
    }
}

/// State owned by one probe invocation. Holds exactly one socket handle,
/// released exactly once when the session is dropped.
struct ProbeSession<'t, T: Transport> {
    transport: &'t T,
    handle: ManuallyDrop<T::Handle>,
    protocol: Protocol,
    nonblocking: bool,
    budget: RetryBudget,
    state: ProbeState,
}

impl<'t, T: Transport> ProbeSession<'t, T> {
    fn open(transport: &'t T, protocol: Protocol) -> Result<Self, ProbeError> {
        let handle = transport.open(protocol).map_err(ProbeError::SocketCreation)?;
        let mut session = Self {
            transport,
            handle: ManuallyDrop::new(handle),
            protocol,
            nonblocking: false,
            budget: RetryBudget::new(),
            state: ProbeState::Connecting,
        };

        // On failure the session is dropped here, which closes the socket.
        session
            .transport
            .set_nonblocking(&session.handle)
            .map_err(ProbeError::SocketMode)?;
        session.nonblocking = true;
        Ok(session)
    }

    fn connect(&self, addr: SocketAddrV4) -> ConnectStatus {
        debug_assert!(self.nonblocking, "connect issued on a blocking socket");
        self.transport.connect(&self.handle, addr)
    }

    fn run(&mut self, addr: SocketAddrV4, timeout: Duration, verbose: bool) -> ProbeState {
        match self.connect(addr) {
            ConnectStatus::InProgress => {}
            // A datagram connect only sets the local association and
            // completes at once on every port; it proves nothing.
            ConnectStatus::Connected if self.protocol == Protocol::Udp => {
                if verbose {
                    debug!("{}: datagram association carries no handshake", addr);
                }
                self.state = ProbeState::Closed;
                return self.state;
            }
            ConnectStatus::Connected => {
                self.state = ProbeState::Open;
                return self.state;
            }
            ConnectStatus::Failed(e) => {
                if verbose {
                    debug!("{}: connect failed immediately: {}", addr, e);
                }
                self.state = ProbeState::Closed;
                return self.state;
            }
        }

        match self.transport.wait_writable(&self.handle, timeout) {
            Ok(Readiness::Ready) => {
                if verbose {
                    trace!("{}: ready within {:?}", addr, timeout);
                }
            }
            Ok(Readiness::TimedOut) => {
                if verbose {
                    trace!("{}: no readiness within {:?}", addr, timeout);
                }
            }
            Err(e) => {
                if verbose {
                    debug!("{}: readiness wait failed: {}", addr, e);
                }
            }
        }

        while !self.state.is_terminal() {
            let status = self.connect(addr);
            if verbose {
                if let ConnectStatus::Failed(e) = &status {
                    debug!("{}: re-check failed: {}", addr, e);
                }
            }
            self.state = next_state(&mut self.budget, &status);
        }

        if verbose {
            debug!(
                "{}: {:?} after {} cycle(s), {} check(s)",
                addr,
                self.state,
                self.budget.cycles(),
                self.budget.checks()
            );
        }
        self.state
    }
}

impl<T: Transport> Drop for ProbeSession<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the handle is taken exactly once, here, and the session
        // is never touched again afterwards.
        let handle = unsafe { ManuallyDrop::take(&mut self.handle) };
        self.transport.close(handle);
    }
}

/// Performs one connectivity attempt per call
#[derive(Debug, Clone, Default)]
pub struct Prober<T> {
    transport: T,
}

impl<T: Transport> Prober<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Probe `ip:port` over `protocol`. `timeout_micros` bounds the
    /// readiness wait and is taken as-is.
    pub fn probe(
        &self,
        ip: Ipv4Addr,
        port: u16,
        protocol: Protocol,
        timeout_micros: u64,
        debug: bool,
    ) -> ProbeOutcome {
        let addr = SocketAddrV4::new(ip, port);

        let mut session = match ProbeSession::open(&self.transport, protocol) {
            Ok(session) => session,
            Err(e) => {
                error!("{} [{}]", e, port);
                return ProbeOutcome::new(port, protocol, ProbeState::Error.status());
            }
        };

        let state = session.run(addr, Duration::from_micros(timeout_micros), debug);
        drop(session);

        ProbeOutcome::new(port, protocol, state.status())
    }
}
