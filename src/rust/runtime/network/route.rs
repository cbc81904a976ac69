// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::network::types::MacAddress;
use ::std::net::Ipv4Addr;

//======================================================================================================================
// Constants
//======================================================================================================================

/// Size of an Ethernet II header (in bytes).
const ETHERNET2_HEADER_SIZE: usize = 14;

/// Size of an IPv4 header without options (in bytes).
const IPV4_HEADER_SIZE: usize = 20;

/// Size of a TCP header without options (in bytes).
const TCP_HEADER_SIZE: usize = 20;

/// Room left for network and transport options (in bytes).
const OPTIONS_SIZE: usize = 20;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Static association between a pair of network addresses and the link-layer addresses used to reach them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    local_ipv4_addr: Ipv4Addr,
    remote_ipv4_addr: Ipv4Addr,
    local_link_addr: MacAddress,
    remote_link_addr: MacAddress,
    protocol: u8,
    /// Headroom reserved in front of every payload for link, network and transport headers.
    header_size: usize,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl RouteEntry {
    /// Default headroom: link + network + transport headers, plus options.
    pub const DEFAULT_HEADER_SIZE: usize = ETHERNET2_HEADER_SIZE + IPV4_HEADER_SIZE + TCP_HEADER_SIZE + OPTIONS_SIZE;

    pub fn new(
        local_ipv4_addr: Ipv4Addr,
        remote_ipv4_addr: Ipv4Addr,
        local_link_addr: MacAddress,
        remote_link_addr: MacAddress,
        protocol: u8,
    ) -> Self {
        Self {
            local_ipv4_addr,
            remote_ipv4_addr,
            local_link_addr,
            remote_link_addr,
            protocol,
            header_size: Self::DEFAULT_HEADER_SIZE,
        }
    }

    /// Overrides the reserved header size.
    pub fn with_header_size(mut self, header_size: usize) -> Self {
        self.header_size = header_size;
        self
    }

    pub fn local_ipv4_addr(&self) -> Ipv4Addr {
        self.local_ipv4_addr
    }

    pub fn remote_ipv4_addr(&self) -> Ipv4Addr {
        self.remote_ipv4_addr
    }

    pub fn local_link_addr(&self) -> MacAddress {
        self.local_link_addr
    }

    pub fn remote_link_addr(&self) -> MacAddress {
        self.remote_link_addr
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Largest payload that fits in a frame over a link with the given `mtu`.
    pub fn max_payload(&self, mtu: usize) -> usize {
        mtu.saturating_sub(self.header_size)
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
