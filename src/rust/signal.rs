// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    runtime::fail::Fail,
    telemetry::{
        RuntimeStats,
        TelemetryReporter,
        TelemetrySample,
    },
};
use ::signal_hook::{
    consts::{
        SIGINT,
        SIGTERM,
    },
    low_level,
    SigId,
};
use ::std::{
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
    },
    time::{
        Duration,
        Instant,
    },
};

//======================================================================================================================
// Constants
//======================================================================================================================

/// Signals that request the driver loop to stop.
const STOP_SIGNALS: [libc::c_int; 2] = [SIGINT, SIGTERM];

//======================================================================================================================
// Structures
//======================================================================================================================

/// Cooperative stop request. Holds the number of the signal that asked to stop, or zero.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicUsize>);

/// Periodic deadline checked by the caller instead of an interval timer signal.
#[derive(Debug)]
struct Ticker {
    interval: Duration,
    deadline: Instant,
}

/// Owns the stop flag, the telemetry ticker and the signal handler registrations.
pub struct SignalController {
    stop: StopFlag,
    timer: Ticker,
    reporter: TelemetryReporter,
    registrations: Vec<SigId>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst) != 0
    }

    /// Number of the signal that set this flag.
    pub fn signal(&self) -> Option<libc::c_int> {
        match self.0.load(Ordering::SeqCst) {
            0 => None,
            signo => Some(signo as libc::c_int),
        }
    }

    /// Sets the flag as if `signo` had been delivered. Only the first request is kept.
    pub fn raise(&self, signo: libc::c_int) {
        store_first(&self.0, signo);
    }
}

impl Ticker {
    fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            deadline: now + interval,
        }
    }

    /// Returns true once per elapsed interval and re-arms relative to `now`.
    fn poll(&mut self, now: Instant) -> bool {
        if now < self.deadline {
            return false;
        }
        self.deadline = now + self.interval;
        true
    }
}

impl SignalController {
    /// Creates a controller that does not listen to any signal. Stops are requested through [StopFlag::raise].
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            stop: StopFlag::new(),
            timer: Ticker::new(interval, now),
            reporter: TelemetryReporter::new(now),
            registrations: Vec::with_capacity(STOP_SIGNALS.len()),
        }
    }

    /// Creates a controller and routes SIGINT and SIGTERM to its stop flag.
    pub fn install(interval: Duration, now: Instant) -> Result<Self, Fail> {
        let mut controller: Self = Self::new(interval, now);
        for signo in STOP_SIGNALS {
            let stop: Arc<AtomicUsize> = controller.stop.0.clone();
            // Safety: the handler performs a single atomic compare-and-swap, which is async-signal-safe.
            match unsafe { low_level::register(signo, move || store_first(&stop, signo)) } {
                Ok(id) => controller.registrations.push(id),
                Err(e) => {
                    let cause: String = format!("failed to register handler for signal {}", signo);
                    error!("install(): {} ({:?})", cause, e);
                    // Already registered handlers are removed when `controller` is dropped.
                    return Err(Fail::from_io(&cause, &e));
                },
            }
        }
        debug!("install(): stop signals registered (interval={:?})", interval);
        Ok(controller)
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn should_stop(&self) -> bool {
        self.stop.is_set()
    }

    /// Evaluates the telemetry timer. When a tick is due, reports `stats` and returns the sample.
    pub fn poll_timer(&mut self, stats: &RuntimeStats, now: Instant) -> Option<TelemetrySample> {
        if self.timer.poll(now) {
            Some(self.reporter.report(stats, now))
        } else {
            None
        }
    }
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Records `signo` unless an earlier stop request is already recorded. Runs inside signal handlers.
fn store_first(stop: &AtomicUsize, signo: libc::c_int) {
    let _ = stop.compare_exchange(0, signo as usize, Ordering::SeqCst, Ordering::SeqCst);
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Drop for SignalController {
    fn drop(&mut self) {
        for id in self.registrations.drain(..) {
            if !low_level::unregister(id) {
                warn!("drop(): signal handler was already unregistered");
            }
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
