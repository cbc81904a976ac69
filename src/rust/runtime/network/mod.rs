// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Exports
//======================================================================================================================

mod channel;
mod resolve;
mod route;
pub mod types;

pub use self::{
    channel::ChannelConfig,
    resolve::resolve_ipv4,
    route::RouteEntry,
};
