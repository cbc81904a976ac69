// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![cfg_attr(feature = "strict", deny(warnings))]
#![deny(clippy::all)]

#[macro_use]
extern crate log;

//======================================================================================================================
// Exports
//======================================================================================================================

pub mod config;
pub mod driver;
pub mod engine;
pub mod runtime;
pub mod signal;
pub mod telemetry;
pub mod transport;

#[doc(hidden)]
pub mod test_helpers;

pub use self::{
    config::Config,
    driver::{
        DriverLoop,
        DriverState,
    },
    engine::{
        ChannelId,
        FrameDemultiplexer,
        ProtocolEngine,
        RouteTable,
    },
    runtime::{
        fail::Fail,
        network::{
            resolve_ipv4,
            types::MacAddress,
            ChannelConfig,
            RouteEntry,
        },
    },
    signal::{
        SignalController,
        StopFlag,
    },
    telemetry::{
        RuntimeStats,
        TelemetryReporter,
        TelemetrySample,
    },
    transport::{
        LinkLayer,
        OutboundFrame,
        RawSocketTransport,
        TransmitError,
    },
};

//======================================================================================================================
// Macros
//======================================================================================================================

/// Ensures that two expressions are equal, bailing out of the enclosing `anyhow::Result` function otherwise.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    ::anyhow::bail!(
                        "ensure failed: `(left == right)` left: `{:?}`, right: `{:?}` ({}:{})",
                        left_val,
                        right_val,
                        file!(),
                        line!()
                    );
                }
            },
        }
    }};
}

/// Ensures that two expressions are not equal, bailing out of the enclosing `anyhow::Result` function otherwise.
#[macro_export]
macro_rules! ensure_neq {
    ($left:expr, $right:expr) => {{
        match (&$left, &$right) {
            (left_val, right_val) => {
                if *left_val == *right_val {
                    ::anyhow::bail!(
                        "ensure failed: `(left != right)` left: `{:?}`, right: `{:?}` ({}:{})",
                        left_val,
                        right_val,
                        file!(),
                        line!()
                    );
                }
            },
        }
    }};
}
