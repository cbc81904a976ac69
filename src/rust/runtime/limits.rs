// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use ::std::time::Duration;

/// Size of the receive buffer. Larger inbound frames are truncated to this size.
pub const RECVBUF_SIZE: usize = 4096;

/// Upper bound on how long a frame transmission waits for the socket to become writable.
pub const SEND_TIMEOUT: Duration = Duration::from_millis(1000);

/// Interval between two telemetry ticks.
pub const TELEMETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default link MTU (in bytes).
pub const DEFAULT_MTU: usize = 1500;
