// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    fail::Fail,
    network::types::MacAddress,
};
use ::std::fmt;

//======================================================================================================================
// Structures
//======================================================================================================================

/// A complete link-layer frame waiting to be transmitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundFrame {
    buf: Vec<u8>,
    dst_link_addr: MacAddress,
    /// Upper-layer protocol (EtherType, host byte order).
    protocol: u16,
}

/// Failure to hand a frame over to the link layer. The frame is given back to the caller.
#[derive(Debug)]
pub enum TransmitError {
    /// The socket did not become writable in time.
    Busy(OutboundFrame),
    /// The write itself failed.
    Write(OutboundFrame, Fail),
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl OutboundFrame {
    pub fn new(buf: Vec<u8>, dst_link_addr: MacAddress, protocol: u16) -> Self {
        Self {
            buf,
            dst_link_addr,
            protocol,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn dst_link_addr(&self) -> MacAddress {
        self.dst_link_addr
    }

    pub fn protocol(&self) -> u16 {
        self.protocol
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl TransmitError {
    pub fn is_busy(&self) -> bool {
        matches!(self, TransmitError::Busy(_))
    }

    /// Borrows the rejected frame.
    pub fn frame(&self) -> &OutboundFrame {
        match self {
            TransmitError::Busy(frame) | TransmitError::Write(frame, _) => frame,
        }
    }

    /// Takes back ownership of the rejected frame.
    pub fn into_frame(self) -> OutboundFrame {
        match self {
            TransmitError::Busy(frame) | TransmitError::Write(frame, _) => frame,
        }
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Display for TransmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmitError::Busy(frame) => write!(f, "link layer busy (len={})", frame.len()),
            TransmitError::Write(frame, e) => write!(f, "write failed (len={}): {}", frame.len(), e),
        }
    }
}

impl From<TransmitError> for Fail {
    fn from(e: TransmitError) -> Self {
        match e {
            TransmitError::Busy(_) => Fail::new(libc::EAGAIN, "link layer busy"),
            TransmitError::Write(_, e) => e,
        }
    }
}
