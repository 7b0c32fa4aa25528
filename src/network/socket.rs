//! Socket transport used by the prober
//!
//! [`Transport`] is the seam between the probe state machine and the
//! platform sockets facility. [`SystemTransport`] is the real
//! implementation on top of `socket2`; it is an explicit value rather
//! than process-wide state, so a caller owns the platform context for as
//! long as it scans.

use super::Protocol;
use socket2::{Domain, Protocol as SockProtocol, SockAddr, Socket, Type};
use std::io;
use std::mem;
use std::net::SocketAddrV4;
use std::os::unix::io::AsRawFd;
use std::ptr;
use std::time::Duration;

/// What a (re-)issued connect reported
#[derive(Debug)]
pub enum ConnectStatus {
    /// The handshake has not concluded yet
    InProgress,
    /// The socket is connected (or already was)
    Connected,
    /// The attempt concluded without a connection
    Failed(io::Error),
}

/// Outcome of the bounded readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The socket became writable or flagged an error
    Ready,
    TimedOut,
}

/// Socket operations a probe session needs
pub trait Transport {
    type Handle;

    /// Create an IPv4 socket for `protocol`
    fn open(&self, protocol: Protocol) -> io::Result<Self::Handle>;

    fn set_nonblocking(&self, handle: &Self::Handle) -> io::Result<()>;

    /// Issue (or re-issue) a connect towards `addr`
    fn connect(&self, handle: &Self::Handle, addr: SocketAddrV4) -> ConnectStatus;

    /// Wait at most `timeout` for the socket to become writable or erroring
    fn wait_writable(&self, handle: &Self::Handle, timeout: Duration) -> io::Result<Readiness>;

    /// Release the handle
    fn close(&self, handle: Self::Handle);
}

/// Transport over the operating system's BSD sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTransport;

impl SystemTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for SystemTransport {
    type Handle = Socket;

    fn open(&self, protocol: Protocol) -> io::Result<Socket> {
        let (ty, proto) = match protocol {
            Protocol::Tcp => (Type::STREAM, SockProtocol::TCP),
            Protocol::Udp => (Type::DGRAM, SockProtocol::UDP),
        };
        Socket::new(Domain::IPV4, ty, Some(proto))
    }

    fn set_nonblocking(&self, socket: &Socket) -> io::Result<()> {
        socket.set_nonblocking(true)
    }

    fn connect(&self, socket: &Socket, addr: SocketAddrV4) -> ConnectStatus {
        match socket.connect(&SockAddr::from(addr)) {
            Ok(()) => ConnectStatus::Connected,
            Err(e) => classify_connect_error(e),
        }
    }

    fn wait_writable(&self, socket: &Socket, timeout: Duration) -> io::Result<Readiness> {
        let fd = socket.as_raw_fd();
        if fd < 0 || fd as usize >= libc::FD_SETSIZE {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("descriptor {} does not fit in an fd_set", fd),
            ));
        }

        let mut tv = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };

        // SAFETY: both sets are zero-initialised plain data, `fd` was checked
        // against FD_SETSIZE above and stays open for the whole call.
        let rc = unsafe {
            let mut write_set: libc::fd_set = mem::zeroed();
            let mut error_set: libc::fd_set = mem::zeroed();
            libc::FD_ZERO(&mut write_set);
            libc::FD_ZERO(&mut error_set);
            libc::FD_SET(fd, &mut write_set);
            libc::FD_SET(fd, &mut error_set);
            libc::select(
                fd + 1,
                ptr::null_mut(),
                &mut write_set,
                &mut error_set,
                &mut tv,
            )
        };

        match rc {
            -1 => Err(io::Error::last_os_error()),
            0 => Ok(Readiness::TimedOut),
            _ => Ok(Readiness::Ready),
        }
    }

    fn close(&self, socket: Socket) {
        drop(socket);
    }
}

/// Map a connect error onto the probe's view of the handshake
pub fn classify_connect_error(e: io::Error) -> ConnectStatus {
    match e.raw_os_error() {
        Some(code) if code == libc::EISCONN => ConnectStatus::Connected,
        Some(code)
            if code == libc::EINPROGRESS
                || code == libc::EALREADY
                || code == libc::EINTR
                || code == libc::EAGAIN =>
        {
            ConnectStatus::InProgress
        }
        _ if e.kind() == io::ErrorKind::WouldBlock => ConnectStatus::InProgress,
        _ => ConnectStatus::Failed(e),
    }
}
