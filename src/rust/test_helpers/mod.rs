// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

pub mod engine;
pub mod link_layer;

pub use self::{
    engine::TestEngine,
    link_layer::TestLinkLayer,
};

use crate::runtime::network::types::MacAddress;
use ::std::net::{
    Ipv4Addr,
    SocketAddrV4,
};

//==============================================================================
// Constants
//==============================================================================

pub const ALICE_MAC: MacAddress = MacAddress::new([0x12, 0x23, 0x45, 0x67, 0x89, 0xab]);
pub const ALICE_IPV4: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
pub const ALICE_PORT: u16 = 40000;
pub const BOB_MAC: MacAddress = MacAddress::new([0xab, 0x89, 0x67, 0x45, 0x23, 0x12]);
pub const BOB_IPV4: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 2);
pub const BOB_PORT: u16 = 1025;

//==============================================================================
// Standalone Functions
//==============================================================================

pub fn alice_addr() -> SocketAddrV4 {
    SocketAddrV4::new(ALICE_IPV4, ALICE_PORT)
}

pub fn bob_addr() -> SocketAddrV4 {
    SocketAddrV4::new(BOB_IPV4, BOB_PORT)
}
