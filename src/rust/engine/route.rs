// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use super::RouteTable;
use crate::runtime::{
    fail::Fail,
    network::RouteEntry,
};
use ::std::{
    collections::HashMap,
    net::Ipv4Addr,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Route table keyed by (local, remote) IPv4 addresses. Entries are never replaced.
#[derive(Default)]
pub struct StaticRouteTable {
    initialized: bool,
    routes: HashMap<(Ipv4Addr, Ipv4Addr), RouteEntry>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl StaticRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, local: Ipv4Addr, remote: Ipv4Addr) -> Option<&RouteEntry> {
        self.routes.get(&(local, remote))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl RouteTable for StaticRouteTable {
    fn init(&mut self) -> Result<(), Fail> {
        self.initialized = true;
        self.routes.clear();
        Ok(())
    }

    fn add(&mut self, route: RouteEntry) -> Result<(), Fail> {
        if !self.initialized {
            return Err(Fail::new(libc::EINVAL, "route table is not initialized"));
        }
        let key: (Ipv4Addr, Ipv4Addr) = (route.local_ipv4_addr(), route.remote_ipv4_addr());
        if self.routes.contains_key(&key) {
            let cause: String = format!("route already exists ({} -> {})", key.0, key.1);
            warn!("add(): {}", cause);
            return Err(Fail::new(libc::EEXIST, &cause));
        }
        debug!("add(): {} -> {} via {}", key.0, key.1, route.remote_link_addr());
        self.routes.insert(key, route);
        Ok(())
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
