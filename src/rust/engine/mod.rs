// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

mod ether;
mod header;
mod route;

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    runtime::{
        fail::Fail,
        network::{
            ChannelConfig,
            RouteEntry,
        },
    },
    transport::LinkLayer,
};
use ::std::fmt;

//======================================================================================================================
// Exports
//======================================================================================================================

pub use self::{
    ether::EtherEngine,
    header::{
        ChannelHeader,
        Ethernet2Header,
        CHANNEL_HEADER_SIZE,
        ETHERNET2_HEADER_SIZE,
        ETHERTYPE_LINKSHIM,
    },
    route::StaticRouteTable,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Handle of a channel created by a [ProtocolEngine].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub usize);

//======================================================================================================================
// Traits
//======================================================================================================================

/// Consumes raw inbound frames.
pub trait FrameDemultiplexer {
    /// Hands one inbound frame over. Frames that belong to nobody are dropped silently.
    fn process(&mut self, frame: &[u8]) -> Result<(), Fail>;
}

/// Static routes of a protocol engine.
pub trait RouteTable {
    fn init(&mut self) -> Result<(), Fail>;
    fn add(&mut self, route: RouteEntry) -> Result<(), Fail>;
}

/// Protocol engine driven by the shim.
pub trait ProtocolEngine: FrameDemultiplexer {
    fn init(&mut self) -> Result<(), Fail>;

    /// Creates a channel for the given five-tuple.
    fn create(&mut self, config: &ChannelConfig) -> Result<ChannelId, Fail>;

    /// Connects a channel to its remote end.
    fn connect(&mut self, channel: ChannelId) -> Result<(), Fail>;

    /// Sends `buf` on `channel`, writing frames through `link`. Returns the number of payload bytes accepted.
    fn send(&mut self, link: &mut dyn LinkLayer, channel: ChannelId, buf: &[u8]) -> Result<usize, Fail>;

    /// Moves pending application data of `channel` into `buf`. Fails with `EAGAIN` when nothing is pending.
    fn receive(&mut self, channel: ChannelId, buf: &mut [u8]) -> Result<usize, Fail>;
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}
