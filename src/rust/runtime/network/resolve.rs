// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::fail::Fail;
use ::std::{
    net::{
        IpAddr,
        Ipv4Addr,
    },
    str::FromStr,
};

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Resolves `host` to an IPv4 address. Dotted-quad literals are taken as is, anything else goes through the system
/// resolver and the first IPv4 answer wins.
pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, Fail> {
    if let Ok(addr) = Ipv4Addr::from_str(host) {
        return Ok(addr);
    }

    let addrs: Vec<IpAddr> = match dns_lookup::lookup_host(host) {
        Ok(addrs) => addrs,
        Err(e) => {
            let cause: String = format!("failed to get address of {} ({})", host, e);
            debug!("resolve_ipv4(): {}", cause);
            return Err(Fail::new(libc::EADDRNOTAVAIL, &cause));
        },
    };

    match first_ipv4(&addrs) {
        Some(addr) => {
            trace!("resolve_ipv4(): {} -> {}", host, addr);
            Ok(addr)
        },
        None => {
            let cause: String = format!("no IPv4 address for {}", host);
            debug!("resolve_ipv4(): {}", cause);
            Err(Fail::new(libc::EADDRNOTAVAIL, &cause))
        },
    }
}

fn first_ipv4(addrs: &[IpAddr]) -> Option<Ipv4Addr> {
    addrs.iter().find_map(|addr| match addr {
        IpAddr::V4(addr) => Some(*addr),
        IpAddr::V6(_) => None,
    })
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
