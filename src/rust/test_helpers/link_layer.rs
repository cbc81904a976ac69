// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    runtime::{
        fail::Fail,
        limits,
        logging,
    },
    transport::{
        LinkLayer,
        OutboundFrame,
        TransmitError,
    },
};
use ::std::collections::VecDeque;

//======================================================================================================================
// Structures
//======================================================================================================================

/// In-memory link layer. Frames pushed in are handed out by [LinkLayer::receive_pending], transmitted frames are kept
/// for inspection.
pub struct TestLinkLayer {
    incoming: VecDeque<Vec<u8>>,
    outgoing: VecDeque<OutboundFrame>,
    /// Last frame handed out.
    current: Vec<u8>,
    /// Number of upcoming transmissions that report a busy link.
    busy_sends: usize,
    /// When set, every transmission fails with this error code.
    write_errno: Option<libc::c_int>,
    /// Number of upcoming receptions that fail.
    rx_errors: usize,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl TestLinkLayer {
    pub fn new() -> Self {
        logging::initialize();
        Self {
            incoming: VecDeque::new(),
            outgoing: VecDeque::new(),
            current: Vec::with_capacity(limits::RECVBUF_SIZE),
            busy_sends: 0,
            write_errno: None,
            rx_errors: 0,
        }
    }

    pub fn push_frame(&mut self, frame: Vec<u8>) {
        self.incoming.push_back(frame);
    }

    /// Removes the oldest transmitted frame.
    pub fn pop_frame(&mut self) -> Option<OutboundFrame> {
        self.outgoing.pop_front()
    }

    pub fn pop_all_frames(&mut self) -> VecDeque<OutboundFrame> {
        self.outgoing.split_off(0)
    }

    pub fn num_outgoing(&self) -> usize {
        self.outgoing.len()
    }

    pub fn num_incoming(&self) -> usize {
        self.incoming.len()
    }

    pub fn set_busy_sends(&mut self, count: usize) {
        self.busy_sends = count;
    }

    pub fn set_write_error(&mut self, errno: Option<libc::c_int>) {
        self.write_errno = errno;
    }

    pub fn set_rx_errors(&mut self, count: usize) {
        self.rx_errors = count;
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for TestLinkLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkLayer for TestLinkLayer {
    fn transmit(&mut self, frame: OutboundFrame) -> Result<(), TransmitError> {
        if self.busy_sends > 0 {
            self.busy_sends -= 1;
            return Err(TransmitError::Busy(frame));
        }
        if let Some(errno) = self.write_errno {
            return Err(TransmitError::Write(frame, Fail::new(errno, "injected write error")));
        }
        debug!("transmit(): frame {:?} (len={:?})", self.outgoing.len(), frame.len());
        self.outgoing.push_back(frame);
        Ok(())
    }

    fn receive_pending(&mut self) -> Result<Option<&[u8]>, Fail> {
        if self.rx_errors > 0 {
            self.rx_errors -= 1;
            return Err(Fail::new(libc::EIO, "injected read error"));
        }
        match self.incoming.pop_front() {
            Some(mut frame) => {
                frame.truncate(limits::RECVBUF_SIZE);
                self.current = frame;
                Ok(Some(self.current.as_slice()))
            },
            None => Ok(None),
        }
    }
}
