// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use super::rawsockaddr::RawSocketAddr;
use crate::runtime::fail::Fail;
use ::socket2::{
    Domain,
    Protocol,
    Socket,
    Type,
};
use ::std::{
    io::Read,
    os::fd::AsRawFd,
    time::Duration,
};

//======================================================================================================================
// Constants & Structures
//======================================================================================================================

/// Readiness of a socket, as reported by a single poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// The requested event is available.
    Ready,
    /// The timeout elapsed, or only unrequested events were reported.
    NotReady,
}

/// Raw socket.
pub struct RawSocket(Socket);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associated functions for raw sockets.
impl RawSocket {
    /// Creates a raw link-layer socket.
    pub fn new() -> Result<Self, Fail> {
        let protocol: Protocol = Protocol::from((libc::ETH_P_ALL as u16).to_be() as libc::c_int); // Accept packet from all protocols.
        match Socket::new(Domain::PACKET, Type::RAW, Some(protocol)) {
            Ok(socket) => Self::from_socket(socket),
            Err(e) => Err(Fail::from_io("failed to create raw socket", &e)),
        }
    }

    /// Wraps an already opened socket. The socket is switched to non-blocking mode.
    pub fn from_socket(socket: Socket) -> Result<Self, Fail> {
        if let Err(e) = socket.set_nonblocking(true) {
            return Err(Fail::from_io("failed to set raw socket as non-blocking", &e));
        }
        Ok(RawSocket(socket))
    }

    /// Binds a socket to a raw address.
    pub fn bind(&self, addr: &RawSocketAddr) -> Result<(), Fail> {
        match self.0.bind(&addr.to_sockaddr()) {
            Ok(()) => Ok(()),
            Err(e) => Err(Fail::from_io("failed to bind raw socket", &e)),
        }
    }

    /// Waits up to `timeout` for any of `events` (`POLLIN`, `POLLOUT`) to be available. A zero timeout never blocks.
    pub fn poll(&self, events: libc::c_short, timeout: Duration) -> Result<Readiness, Fail> {
        let mut pfd: libc::pollfd = libc::pollfd {
            fd: self.0.as_raw_fd(),
            events,
            revents: 0,
        };
        let timeout_ms: libc::c_int = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        match unsafe { libc::poll(&mut pfd as *mut libc::pollfd, 1, timeout_ms) } {
            // Check if we failed to poll the raw socket (this includes being interrupted by a signal).
            -1 => Err(Fail::last_os_error("failed to poll raw socket")),
            0 => Ok(Readiness::NotReady),
            _ if pfd.revents & events != 0 => Ok(Readiness::Ready),
            _ => Ok(Readiness::NotReady),
        }
    }

    /// Sends data through a raw socket.
    pub fn sendto(&self, buf: &[u8], rawaddr: &RawSocketAddr) -> Result<usize, Fail> {
        match self.0.send_to(buf, &rawaddr.to_sockaddr()) {
            Ok(nbytes) => Ok(nbytes),
            // Check if we failed to send data through raw socket.
            Err(e) => Err(Fail::from_io("failed to send data through raw socket", &e)),
        }
    }

    /// Receives data from a raw socket. Frames that do not fit in `buf` are truncated.
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize, Fail> {
        match (&self.0).read(buf) {
            Ok(nbytes) => Ok(nbytes),
            // Check if we failed to receive data from raw socket.
            Err(e) => Err(Fail::from_io("failed to receive data from raw socket", &e)),
        }
    }
}
