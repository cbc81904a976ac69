// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

mod frame;
mod rawsockaddr;
mod rawsocket;

//======================================================================================================================
// Imports
//======================================================================================================================

use self::{
    rawsockaddr::RawSocketAddr,
    rawsocket::{
        RawSocket,
        Readiness,
    },
};
use crate::{
    config::Config,
    runtime::{
        fail::Fail,
        limits,
    },
};
use ::socket2::Socket;
use ::std::time::Duration;

//======================================================================================================================
// Exports
//======================================================================================================================

pub use self::frame::{
    OutboundFrame,
    TransmitError,
};

//======================================================================================================================
// Traits
//======================================================================================================================

/// API for the link layer underneath a protocol engine (e.g., raw sockets).
pub trait LinkLayer {
    /// Transmits a single [OutboundFrame]. On failure the frame is handed back and nothing was written.
    fn transmit(&mut self, frame: OutboundFrame) -> Result<(), TransmitError>;

    /// Retrieves one pending inbound frame without blocking. Returns `None` when nothing is pending.
    fn receive_pending(&mut self) -> Result<Option<&[u8]>, Fail>;
}

//======================================================================================================================
// Structures
//======================================================================================================================

/// Link layer backed by a raw `AF_PACKET` socket.
pub struct RawSocketTransport {
    socket: RawSocket,
    ifindex: i32,
    send_timeout: Duration,
    recvbuf: Box<[u8]>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl RawSocketTransport {
    /// Opens a raw socket and binds it to every protocol on the configured interface. Frames can only be sent
    /// through a specific interface, so one must be configured.
    pub fn new(config: &Config) -> Result<Self, Fail> {
        let ifindex: i32 = config.interface_index()?;
        if ifindex <= 0 {
            let cause: String = format!(
                "no network interface configured (set raw_socket.interface_name or raw_socket.interface_index, \
                 ifindex={})",
                ifindex
            );
            error!("new(): {}", cause);
            return Err(Fail::new(libc::ENODEV, &cause));
        }
        let send_timeout: Duration = config.send_timeout()?;

        let socket: RawSocket = match RawSocket::new() {
            Ok(socket) => socket,
            Err(e) => {
                error!("new(): {:?}", e);
                return Err(e);
            },
        };
        let local: RawSocketAddr = RawSocketAddr::any(ifindex);
        if let Err(e) = socket.bind(&local) {
            error!("new(): {:?}", e);
            return Err(e);
        }
        debug!("new(): raw socket bound (ifindex={:?})", local.ifindex());

        Ok(Self::with_socket(socket, ifindex, send_timeout))
    }

    /// Drives an already opened datagram socket as a link layer. Frames are sent through `ifindex`.
    pub fn from_socket(socket: Socket, ifindex: i32, send_timeout: Duration) -> Result<Self, Fail> {
        Ok(Self::with_socket(RawSocket::from_socket(socket)?, ifindex, send_timeout))
    }

    fn with_socket(socket: RawSocket, ifindex: i32, send_timeout: Duration) -> Self {
        Self {
            socket,
            ifindex,
            send_timeout,
            recvbuf: vec![0_u8; limits::RECVBUF_SIZE].into_boxed_slice(),
        }
    }

    /// Waits up to the send timeout for the socket to become writable, then writes `frame` in one call.
    pub fn send(&mut self, frame: OutboundFrame) -> Result<(), TransmitError> {
        match self.socket.poll(libc::POLLOUT, self.send_timeout) {
            Ok(Readiness::Ready) => (),
            Ok(Readiness::NotReady) => return Err(TransmitError::Busy(frame)),
            // Interrupted waits are reported as busy too, so that the caller gets to check for a stop request.
            Err(e) => {
                trace!("send(): {:?}", e);
                return Err(TransmitError::Busy(frame));
            },
        }

        let dest_sockaddr: RawSocketAddr = RawSocketAddr::new(self.ifindex, &frame.dst_link_addr(), frame.protocol());
        match self.socket.sendto(frame.as_bytes(), &dest_sockaddr) {
            Ok(size) => check_sent(frame, size),
            Err(e) => Err(TransmitError::Write(frame, e)),
        }
    }

    /// Reads one pending frame, if any, without blocking. Frames larger than the receive buffer are truncated.
    pub fn receive_pending(&mut self) -> Result<Option<&[u8]>, Fail> {
        match self.socket.poll(libc::POLLIN, Duration::ZERO) {
            Ok(Readiness::Ready) => (),
            Ok(Readiness::NotReady) => return Ok(None),
            Err(e) if e.errno == libc::EINTR => return Ok(None),
            Err(e) => return Err(e),
        }

        match self.socket.recv(&mut self.recvbuf) {
            Ok(nbytes) => Ok(Some(&self.recvbuf[..nbytes])),
            Err(e) if e.errno == libc::EAGAIN => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn ifindex(&self) -> i32 {
        self.ifindex
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Frames go out in a single write. Anything short of the whole frame is a failed transmission.
fn check_sent(frame: OutboundFrame, size: usize) -> Result<(), TransmitError> {
    if size == frame.len() {
        return Ok(());
    }
    let cause: String = format!("short write on raw socket (len={}, sent={})", frame.len(), size);
    warn!("send(): {}", cause);
    Err(TransmitError::Write(frame, Fail::new(libc::EIO, &cause)))
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl LinkLayer for RawSocketTransport {
    fn transmit(&mut self, frame: OutboundFrame) -> Result<(), TransmitError> {
        self.send(frame)
    }

    fn receive_pending(&mut self) -> Result<Option<&[u8]>, Fail> {
        RawSocketTransport::receive_pending(self)
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
