// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    fail::Fail,
    network::types::MacAddress,
};
use ::libc::EBADMSG;

//======================================================================================================================
// Constants
//======================================================================================================================

pub const ETHERNET2_HEADER_SIZE: usize = 14;

/// Size of the channel header that follows the Ethernet header.
pub const CHANNEL_HEADER_SIZE: usize = 5;

/// EtherType of frames carrying channel traffic (IEEE 802 local experimental).
pub const ETHERTYPE_LINKSHIM: u16 = 0x88B5;

//======================================================================================================================
// Structures
//======================================================================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ethernet2Header {
    // Bytes 0..6
    dst_addr: MacAddress,
    // Bytes 6..12
    src_addr: MacAddress,
    // Bytes 12..14
    ether_type: u16,
}

/// Demultiplexing information of a channel frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelHeader {
    // Bytes 0..2
    src_port: u16,
    // Bytes 2..4
    dst_port: u16,
    // Byte 4
    protocol: u8,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl Ethernet2Header {
    /// Creates a header for an Ethernet frame.
    pub fn new(dst_addr: MacAddress, src_addr: MacAddress, ether_type: u16) -> Self {
        Self {
            dst_addr,
            src_addr,
            ether_type,
        }
    }

    /// Parses the ethernet header at the front of `buf`. Returns the header and the remaining bytes.
    pub fn parse(buf: &[u8]) -> Result<(Self, &[u8]), Fail> {
        if buf.len() < ETHERNET2_HEADER_SIZE {
            return Err(Fail::new(EBADMSG, "frame too small"));
        }
        let (hdr_buf, payload): (&[u8], &[u8]) = buf.split_at(ETHERNET2_HEADER_SIZE);
        let dst_addr: MacAddress = MacAddress::from_bytes(&hdr_buf[0..6])?;
        let src_addr: MacAddress = MacAddress::from_bytes(&hdr_buf[6..12])?;
        let ether_type: u16 = u16::from_be_bytes([hdr_buf[12], hdr_buf[13]]);

        Ok((
            Self {
                dst_addr,
                src_addr,
                ether_type,
            },
            payload,
        ))
    }

    /// Appends the serialized header to `buf`.
    pub fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.dst_addr.octets());
        buf.extend_from_slice(&self.src_addr.octets());
        buf.extend_from_slice(&self.ether_type.to_be_bytes());
    }

    pub fn dst_addr(&self) -> MacAddress {
        self.dst_addr
    }

    pub fn src_addr(&self) -> MacAddress {
        self.src_addr
    }

    pub fn ether_type(&self) -> u16 {
        self.ether_type
    }
}

impl ChannelHeader {
    pub fn new(src_port: u16, dst_port: u16, protocol: u8) -> Self {
        Self {
            src_port,
            dst_port,
            protocol,
        }
    }

    /// Parses the channel header at the front of `buf`. Returns the header and the payload.
    pub fn parse(buf: &[u8]) -> Result<(Self, &[u8]), Fail> {
        if buf.len() < CHANNEL_HEADER_SIZE {
            return Err(Fail::new(EBADMSG, "channel header too small"));
        }
        let (hdr_buf, payload): (&[u8], &[u8]) = buf.split_at(CHANNEL_HEADER_SIZE);
        Ok((
            Self {
                src_port: u16::from_be_bytes([hdr_buf[0], hdr_buf[1]]),
                dst_port: u16::from_be_bytes([hdr_buf[2], hdr_buf[3]]),
                protocol: hdr_buf[4],
            },
            payload,
        ))
    }

    pub fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.src_port.to_be_bytes());
        buf.extend_from_slice(&self.dst_port.to_be_bytes());
        buf.push(self.protocol);
    }

    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    pub fn protocol(&self) -> u8 {
        self.protocol
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
