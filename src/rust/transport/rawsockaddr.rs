// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::network::types::MacAddress;
use ::socket2::SockAddr;
use ::std::{
    mem,
    ptr,
};

//======================================================================================================================
// Constants & Structures
//======================================================================================================================

/// Link-layer socket address.
#[derive(Clone, Copy)]
pub struct RawSocketAddr(libc::sockaddr_ll);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl RawSocketAddr {
    /// Address of frames carrying `protocol` (an EtherType, host byte order) to `link_addr` through `ifindex`.
    pub fn new(ifindex: i32, link_addr: &MacAddress, protocol: u16) -> Self {
        // Pad MAC address.
        let mut addr: [u8; 8] = [0_u8; 8];
        addr[..MacAddress::LEN].copy_from_slice(&link_addr.octets());

        RawSocketAddr(libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as libc::c_ushort,
            sll_protocol: protocol.to_be(),
            sll_ifindex: ifindex,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: libc::ETH_ALEN as u8,
            sll_addr: addr,
        })
    }

    /// Address that captures frames of every protocol on `ifindex`. Zero means every interface.
    pub fn any(ifindex: i32) -> Self {
        let mut addr: RawSocketAddr = RawSocketAddr::default();
        addr.0.sll_family = libc::AF_PACKET as libc::c_ushort;
        addr.0.sll_protocol = (libc::ETH_P_ALL as u16).to_be();
        addr.0.sll_ifindex = ifindex;
        addr.0.sll_pkttype = libc::PACKET_OUTGOING;
        addr
    }

    pub fn ifindex(&self) -> i32 {
        self.0.sll_ifindex
    }

    /// Converts the target address into a generic socket address.
    pub fn to_sockaddr(&self) -> SockAddr {
        let len: usize = mem::size_of::<libc::sockaddr_ll>();
        let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
        // sockaddr_storage is large enough and aligned for every address family.
        unsafe {
            ptr::copy_nonoverlapping(
                &self.0 as *const libc::sockaddr_ll as *const u8,
                &mut storage as *mut libc::sockaddr_storage as *mut u8,
                len,
            );
            SockAddr::new(storage, len as libc::socklen_t)
        }
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for RawSocketAddr {
    fn default() -> Self {
        let addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
        Self(addr)
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
