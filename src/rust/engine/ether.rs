// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use super::{
    header::{
        ChannelHeader,
        Ethernet2Header,
        CHANNEL_HEADER_SIZE,
        ETHERNET2_HEADER_SIZE,
        ETHERTYPE_LINKSHIM,
    },
    route::StaticRouteTable,
    ChannelId,
    FrameDemultiplexer,
    ProtocolEngine,
};
use crate::{
    runtime::{
        fail::Fail,
        network::{
            ChannelConfig,
            RouteEntry,
        },
    },
    transport::{
        LinkLayer,
        OutboundFrame,
    },
};
use ::std::collections::VecDeque;

//======================================================================================================================
// Constants
//======================================================================================================================

/// Maximum number of inbound payloads queued on a channel.
const MAX_INBOUND_QUEUE_LEN: usize = 64;

//======================================================================================================================
// Structures
//======================================================================================================================

struct Channel {
    config: ChannelConfig,
    /// Set once the channel is connected.
    route: Option<RouteEntry>,
    inbound: VecDeque<Vec<u8>>,
}

/// Link-level datagram engine. Each send becomes one Ethernet frame made of a channel header and the payload.
pub struct EtherEngine {
    initialized: bool,
    mtu: usize,
    routes: StaticRouteTable,
    channels: Vec<Channel>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl EtherEngine {
    pub fn new(mtu: usize) -> Self {
        Self {
            initialized: false,
            mtu,
            routes: StaticRouteTable::new(),
            channels: Vec::new(),
        }
    }

    pub fn route_table(&mut self) -> &mut StaticRouteTable {
        &mut self.routes
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Number of inbound payloads waiting on `channel`.
    pub fn pending(&self, channel: ChannelId) -> Result<usize, Fail> {
        Ok(self.get_channel(channel)?.inbound.len())
    }

    fn get_channel(&self, channel: ChannelId) -> Result<&Channel, Fail> {
        match self.channels.get(channel.0) {
            Some(ch) => Ok(ch),
            None => Err(Fail::new(libc::EBADF, "bad channel descriptor")),
        }
    }

    fn get_channel_mut(&mut self, channel: ChannelId) -> Result<&mut Channel, Fail> {
        match self.channels.get_mut(channel.0) {
            Some(ch) => Ok(ch),
            None => Err(Fail::new(libc::EBADF, "bad channel descriptor")),
        }
    }

    /// Builds the frame that carries `buf` on `ch`.
    fn build_frame(ch: &Channel, route: &RouteEntry, buf: &[u8]) -> OutboundFrame {
        let mut bytes: Vec<u8> = Vec::with_capacity(ETHERNET2_HEADER_SIZE + CHANNEL_HEADER_SIZE + buf.len());
        Ethernet2Header::new(route.remote_link_addr(), route.local_link_addr(), ETHERTYPE_LINKSHIM).serialize(&mut bytes);
        ChannelHeader::new(ch.config.local().port(), ch.config.remote().port(), ch.config.protocol())
            .serialize(&mut bytes);
        bytes.extend_from_slice(buf);
        OutboundFrame::new(bytes, route.remote_link_addr(), ETHERTYPE_LINKSHIM)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl FrameDemultiplexer for EtherEngine {
    fn process(&mut self, frame: &[u8]) -> Result<(), Fail> {
        let (eth_hdr, rest): (Ethernet2Header, &[u8]) = Ethernet2Header::parse(frame)?;
        if eth_hdr.ether_type() != ETHERTYPE_LINKSHIM {
            return Ok(());
        }
        let (ch_hdr, payload): (ChannelHeader, &[u8]) = ChannelHeader::parse(rest)?;

        // Frames travel from the remote end, so ports appear swapped.
        let target: Option<&mut Channel> = self.channels.iter_mut().find(|ch| match &ch.route {
            Some(route) => {
                ch.config.local().port() == ch_hdr.dst_port()
                    && ch.config.remote().port() == ch_hdr.src_port()
                    && ch.config.protocol() == ch_hdr.protocol()
                    && (eth_hdr.dst_addr() == route.local_link_addr() || eth_hdr.dst_addr().is_broadcast())
            },
            None => false,
        });

        match target {
            Some(ch) if ch.inbound.len() < MAX_INBOUND_QUEUE_LEN => {
                ch.inbound.push_back(payload.to_vec());
            },
            Some(ch) => {
                debug!("process(): inbound queue full, dropping frame (channel={})", ch.config);
            },
            None => trace!("process(): no channel for {:?}", ch_hdr),
        }
        Ok(())
    }
}

impl ProtocolEngine for EtherEngine {
    fn init(&mut self) -> Result<(), Fail> {
        if self.mtu <= ETHERNET2_HEADER_SIZE + CHANNEL_HEADER_SIZE {
            let cause: String = format!("mtu too small (mtu={})", self.mtu);
            error!("init(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        self.initialized = true;
        Ok(())
    }

    fn create(&mut self, config: &ChannelConfig) -> Result<ChannelId, Fail> {
        if !self.initialized {
            return Err(Fail::new(libc::EINVAL, "engine is not initialized"));
        }
        let channel: ChannelId = ChannelId(self.channels.len());
        self.channels.push(Channel {
            config: *config,
            route: None,
            inbound: VecDeque::with_capacity(MAX_INBOUND_QUEUE_LEN),
        });
        debug!("create(): {} ({})", channel, config);
        Ok(channel)
    }

    fn connect(&mut self, channel: ChannelId) -> Result<(), Fail> {
        let config: ChannelConfig = self.get_channel(channel)?.config;
        let route: RouteEntry = match self.routes.lookup(*config.local().ip(), *config.remote().ip()) {
            Some(route) => route.clone(),
            None => {
                let cause: String = format!("no route to {}", config.remote().ip());
                error!("connect(): {}", cause);
                return Err(Fail::new(libc::ENETUNREACH, &cause));
            },
        };
        let ch: &mut Channel = self.get_channel_mut(channel)?;
        if ch.route.is_some() {
            return Err(Fail::new(libc::EISCONN, "channel is already connected"));
        }
        ch.route = Some(route);
        Ok(())
    }

    fn send(&mut self, link: &mut dyn LinkLayer, channel: ChannelId, buf: &[u8]) -> Result<usize, Fail> {
        let mtu: usize = self.mtu;
        let ch: &Channel = self.get_channel(channel)?;
        let route: &RouteEntry = match &ch.route {
            Some(route) => route,
            None => return Err(Fail::new(libc::ENOTCONN, "channel is not connected")),
        };
        if buf.len() > route.max_payload(mtu) {
            let cause: String = format!("payload too large (len={}, max={})", buf.len(), route.max_payload(mtu));
            return Err(Fail::new(libc::EMSGSIZE, &cause));
        }

        let frame: OutboundFrame = Self::build_frame(ch, route, buf);
        link.transmit(frame)?;
        Ok(buf.len())
    }

    fn receive(&mut self, channel: ChannelId, buf: &mut [u8]) -> Result<usize, Fail> {
        match self.get_channel_mut(channel)?.inbound.pop_front() {
            Some(payload) => {
                let nbytes: usize = payload.len().min(buf.len());
                buf[..nbytes].copy_from_slice(&payload[..nbytes]);
                Ok(nbytes)
            },
            None => Err(Fail::new(libc::EAGAIN, "no data available")),
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
