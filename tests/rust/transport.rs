// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Exercises [RawSocketTransport] over local datagram sockets, which behave like a raw socket with respect to
//! readiness, message boundaries and truncation, and do not require privileges.

//==============================================================================
// Imports
//==============================================================================

use ::anyhow::Result;
use ::linkshim::{
    engine::ETHERTYPE_LINKSHIM,
    runtime::{
        limits,
        logging,
    },
    MacAddress,
    OutboundFrame,
    RawSocketTransport,
    TransmitError,
};
use ::socket2::{
    Domain,
    Socket,
    Type,
};
use ::std::{
    io::ErrorKind,
    time::{
        Duration,
        Instant,
    },
};

//==============================================================================
// Constants
//==============================================================================

const SEND_TIMEOUT: Duration = Duration::from_millis(1000);

//==============================================================================
// Standalone Functions
//==============================================================================

/// Creates a transport and the socket at the other end of its link.
fn new_transport() -> Result<(RawSocketTransport, Socket)> {
    logging::initialize();
    let (local, remote): (Socket, Socket) = Socket::pair(Domain::UNIX, Type::DGRAM, None)?;
    let transport: RawSocketTransport = RawSocketTransport::from_socket(local, 0, SEND_TIMEOUT)?;
    Ok((transport, remote))
}

fn new_frame(len: usize) -> OutboundFrame {
    OutboundFrame::new(vec![0xab; len], MacAddress::broadcast(), ETHERTYPE_LINKSHIM)
}

//==============================================================================
// Tests
//==============================================================================

#[test]
fn receive_returns_immediately_when_nothing_is_pending() -> Result<()> {
    let (mut transport, _remote): (RawSocketTransport, Socket) = new_transport()?;

    let start: Instant = Instant::now();
    let frame: Option<Vec<u8>> = transport.receive_pending()?.map(|frame| frame.to_vec());
    linkshim::ensure_eq!(frame, None);
    linkshim::ensure_eq!(start.elapsed() < Duration::from_millis(100), true);
    Ok(())
}

#[test]
fn receive_returns_whole_frames() -> Result<()> {
    let (mut transport, remote): (RawSocketTransport, Socket) = new_transport()?;
    remote.send(b"first")?;
    remote.send(b"second")?;

    linkshim::ensure_eq!(transport.receive_pending()?.map(|frame| frame.to_vec()), Some(b"first".to_vec()));
    linkshim::ensure_eq!(transport.receive_pending()?.map(|frame| frame.to_vec()), Some(b"second".to_vec()));
    linkshim::ensure_eq!(transport.receive_pending()?.is_none(), true);
    Ok(())
}

#[test]
fn receive_truncates_oversized_frames() -> Result<()> {
    let (mut transport, remote): (RawSocketTransport, Socket) = new_transport()?;
    let mut oversized: Vec<u8> = vec![0x11; 5000];
    oversized[limits::RECVBUF_SIZE..].fill(0x22);
    remote.send(&oversized)?;

    match transport.receive_pending()? {
        Some(frame) => {
            linkshim::ensure_eq!(frame.len(), limits::RECVBUF_SIZE);
            linkshim::ensure_eq!(frame.iter().all(|b| *b == 0x11), true);
        },
        None => anyhow::bail!("frame should be pending"),
    }
    // The remainder of a truncated frame is discarded.
    linkshim::ensure_eq!(transport.receive_pending()?.is_none(), true);
    Ok(())
}

#[test]
fn send_hands_frame_back_on_write_error() -> Result<()> {
    let (mut transport, _remote): (RawSocketTransport, Socket) = new_transport()?;

    // A link-layer destination is not a valid address for this socket, so the write itself fails.
    match transport.send(new_frame(64)) {
        Err(TransmitError::Write(frame, e)) => {
            linkshim::ensure_eq!(frame.len(), 64);
            linkshim::ensure_neq!(e.errno, 0);
        },
        Err(TransmitError::Busy(_)) => anyhow::bail!("socket should be writable"),
        Ok(()) => anyhow::bail!("send should have failed"),
    }
    Ok(())
}

#[test]
fn send_reports_busy_within_timeout() -> Result<()> {
    let (transport, remote): (RawSocketTransport, Socket) = {
        logging::initialize();
        let (local, remote): (Socket, Socket) = Socket::pair(Domain::UNIX, Type::DGRAM, None)?;
        let writer: Socket = local.try_clone()?;
        writer.set_nonblocking(true)?;

        // Fill the peer's receive queue so that the socket stops being writable.
        loop {
            match writer.send(&[0u8; 1024]) {
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        (RawSocketTransport::from_socket(local, 0, SEND_TIMEOUT)?, remote)
    };
    let mut transport: RawSocketTransport = transport;

    let start: Instant = Instant::now();
    let result: Result<(), TransmitError> = transport.send(new_frame(128));
    let elapsed: Duration = start.elapsed();

    match result {
        Err(TransmitError::Busy(frame)) => linkshim::ensure_eq!(frame.len(), 128),
        Err(e) => anyhow::bail!("unexpected error: {}", e),
        Ok(()) => anyhow::bail!("send should have timed out"),
    }
    linkshim::ensure_eq!(elapsed >= Duration::from_millis(900), true);
    linkshim::ensure_eq!(elapsed < SEND_TIMEOUT + Duration::from_millis(500), true);

    drop(remote);
    Ok(())
}
