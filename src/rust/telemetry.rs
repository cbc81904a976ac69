// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::logging::TELEMETRY_TARGET;
use ::std::{
    fmt,
    time::{
        Duration,
        Instant,
    },
};

//======================================================================================================================
// Constants
//======================================================================================================================

/// Name printed at the beginning of every telemetry line.
const REPORTER_NAME: &str = "telemetry_tick";

/// Bytes in a mebibyte.
const MIB: f64 = 1024.0 * 1024.0;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Cumulative counters of a run. Each update touches a single field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Payload bytes accepted by the protocol engine.
    bytes_sent: u64,
    /// Payload bytes the protocol engine refused.
    error_bytes: u64,
    /// Inbound reads that failed after the socket reported readiness.
    rx_errors: u64,
}

/// Outcome of one telemetry tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetrySample {
    /// Time since the previous tick.
    pub elapsed: Duration,
    /// Lifetime total of bytes sent.
    pub bytes_sent: u64,
    /// Lifetime total of error bytes.
    pub error_bytes: u64,
    /// Send throughput since the previous tick (MiB/s).
    pub speed: f64,
    /// Error rate since the previous tick (MiB/s).
    pub error_speed: f64,
    /// Receive errors since the previous tick.
    pub rx_errors: u64,
}

/// Computes throughput and error rates out of [RuntimeStats] once per tick.
pub struct TelemetryReporter {
    last_tick: Instant,
    last_bytes_sent: u64,
    last_error_bytes: u64,
    last_rx_errors: u64,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl RuntimeStats {
    pub fn record_sent(&mut self, len: usize) {
        self.bytes_sent += len as u64;
    }

    pub fn record_error(&mut self, len: usize) {
        self.error_bytes += len as u64;
    }

    pub fn record_rx_error(&mut self) {
        self.rx_errors += 1;
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn error_bytes(&self) -> u64 {
        self.error_bytes
    }

    pub fn rx_errors(&self) -> u64 {
        self.rx_errors
    }
}

impl TelemetryReporter {
    pub fn new(now: Instant) -> Self {
        Self {
            last_tick: now,
            last_bytes_sent: 0,
            last_error_bytes: 0,
            last_rx_errors: 0,
        }
    }

    /// Samples `stats` and moves the baseline to `now`.
    pub fn tick(&mut self, stats: &RuntimeStats, now: Instant) -> TelemetrySample {
        let elapsed: Duration = now.saturating_duration_since(self.last_tick);
        let sample: TelemetrySample = TelemetrySample {
            elapsed,
            bytes_sent: stats.bytes_sent(),
            error_bytes: stats.error_bytes(),
            speed: rate(stats.bytes_sent().saturating_sub(self.last_bytes_sent), elapsed),
            error_speed: rate(stats.error_bytes().saturating_sub(self.last_error_bytes), elapsed),
            rx_errors: stats.rx_errors().saturating_sub(self.last_rx_errors),
        };

        self.last_tick = now;
        self.last_bytes_sent = stats.bytes_sent();
        self.last_error_bytes = stats.error_bytes();
        self.last_rx_errors = stats.rx_errors();

        sample
    }

    /// Ticks and logs the resulting sample.
    pub fn report(&mut self, stats: &RuntimeStats, now: Instant) -> TelemetrySample {
        let sample: TelemetrySample = self.tick(stats, now);
        info!(target: TELEMETRY_TARGET, "{}", sample);
        if sample.rx_errors > 0 {
            warn!("report(): {:?} receive errors since last tick", sample.rx_errors);
        }
        sample
    }
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Rate of `bytes` over `elapsed`, in MiB/s. Degenerate results are reported as zero.
fn rate(bytes: u64, elapsed: Duration) -> f64 {
    let micros: f64 = elapsed.as_micros() as f64;
    if micros <= 0.0 {
        return 0.0;
    }
    let rate: f64 = (bytes as f64) * 1_000_000.0 / (micros * MIB);
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Display for TelemetrySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: time: {:.6}, bytes_sent: {}, speed: {:.6} [{:.6}], errors: {}.",
            REPORTER_NAME,
            self.elapsed.as_secs_f64(),
            self.bytes_sent,
            self.speed,
            self.speed + self.error_speed,
            self.error_bytes
        )
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
