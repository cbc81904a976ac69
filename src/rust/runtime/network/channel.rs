// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use ::std::{
    fmt,
    net::SocketAddrV4,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Five-tuple identifying one logical connection handed to a protocol engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelConfig {
    local: SocketAddrV4,
    remote: SocketAddrV4,
    protocol: u8,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl ChannelConfig {
    pub fn new(local: SocketAddrV4, remote: SocketAddrV4, protocol: u8) -> Self {
        Self {
            local,
            remote,
            protocol,
        }
    }

    pub fn local(&self) -> SocketAddrV4 {
        self.local
    }

    pub fn remote(&self) -> SocketAddrV4 {
        self.remote
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {} (proto={})", self.local, self.remote, self.protocol)
    }
}
