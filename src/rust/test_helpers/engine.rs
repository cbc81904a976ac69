// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    engine::{
        ChannelId,
        FrameDemultiplexer,
        ProtocolEngine,
        ETHERTYPE_LINKSHIM,
    },
    runtime::{
        fail::Fail,
        network::{
            types::MacAddress,
            ChannelConfig,
        },
    },
    transport::{
        LinkLayer,
        OutboundFrame,
    },
};
use ::std::collections::VecDeque;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Recording engine. Sent payloads are transmitted verbatim as frames.
#[derive(Default)]
pub struct TestEngine {
    initialized: bool,
    channels: Vec<ChannelConfig>,
    connected: Vec<ChannelId>,
    /// Frames handed over by the demultiplexer.
    processed: Vec<Vec<u8>>,
    /// Application data returned by [ProtocolEngine::receive].
    inbound: VecDeque<Vec<u8>>,
    /// When set, sends fail before reaching the link layer.
    fail_sends: bool,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl TestEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed(&self) -> &[Vec<u8>] {
        &self.processed
    }

    pub fn push_inbound(&mut self, data: Vec<u8>) {
        self.inbound.push_back(data);
    }

    pub fn set_fail_sends(&mut self, fail: bool) {
        self.fail_sends = fail;
    }

    pub fn is_connected(&self, channel: ChannelId) -> bool {
        self.connected.contains(&channel)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl FrameDemultiplexer for TestEngine {
    fn process(&mut self, frame: &[u8]) -> Result<(), Fail> {
        self.processed.push(frame.to_vec());
        Ok(())
    }
}

impl ProtocolEngine for TestEngine {
    fn init(&mut self) -> Result<(), Fail> {
        self.initialized = true;
        Ok(())
    }

    fn create(&mut self, config: &ChannelConfig) -> Result<ChannelId, Fail> {
        if !self.initialized {
            return Err(Fail::new(libc::EINVAL, "engine is not initialized"));
        }
        self.channels.push(*config);
        Ok(ChannelId(self.channels.len() - 1))
    }

    fn connect(&mut self, channel: ChannelId) -> Result<(), Fail> {
        if channel.0 >= self.channels.len() {
            return Err(Fail::new(libc::EBADF, "bad channel descriptor"));
        }
        self.connected.push(channel);
        Ok(())
    }

    fn send(&mut self, link: &mut dyn LinkLayer, channel: ChannelId, buf: &[u8]) -> Result<usize, Fail> {
        if !self.is_connected(channel) {
            return Err(Fail::new(libc::ENOTCONN, "channel is not connected"));
        }
        if self.fail_sends {
            return Err(Fail::new(libc::EIO, "injected send error"));
        }
        link.transmit(OutboundFrame::new(buf.to_vec(), MacAddress::broadcast(), ETHERTYPE_LINKSHIM))?;
        Ok(buf.len())
    }

    fn receive(&mut self, _channel: ChannelId, buf: &mut [u8]) -> Result<usize, Fail> {
        match self.inbound.pop_front() {
            Some(data) => {
                let nbytes: usize = data.len().min(buf.len());
                buf[..nbytes].copy_from_slice(&data[..nbytes]);
                Ok(nbytes)
            },
            None => Err(Fail::new(libc::EAGAIN, "no data available")),
        }
    }
}
