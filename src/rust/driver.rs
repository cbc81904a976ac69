// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    engine::{
        ChannelId,
        ProtocolEngine,
    },
    runtime::limits,
    signal::{
        SignalController,
        StopFlag,
    },
    telemetry::{
        RuntimeStats,
        TelemetrySample,
    },
    transport::LinkLayer,
};
use ::std::time::Instant;

//======================================================================================================================
// Structures
//======================================================================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Stopped,
}

/// Single-threaded loop that moves frames between a link layer and a protocol engine until asked to stop.
///
/// Both the link layer and the engine are owned by the loop and released when it is dropped.
pub struct DriverLoop<L: LinkLayer, E: ProtocolEngine> {
    link: L,
    engine: E,
    channel: ChannelId,
    signals: SignalController,
    stats: RuntimeStats,
    /// Most recent telemetry report.
    last_sample: Option<TelemetrySample>,
    state: DriverState,
    /// Payloads accepted by the engine.
    sent: u64,
    /// Application buffers read back from the engine.
    received: u64,
    appbuf: Box<[u8]>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl<L: LinkLayer, E: ProtocolEngine> DriverLoop<L, E> {
    /// Creates a loop that drives `channel`, which must already be connected.
    pub fn new(link: L, engine: E, channel: ChannelId, signals: SignalController) -> Self {
        Self {
            link,
            engine,
            channel,
            signals,
            stats: RuntimeStats::default(),
            last_sample: None,
            state: DriverState::Running,
            sent: 0,
            received: 0,
            appbuf: vec![0_u8; limits::RECVBUF_SIZE].into_boxed_slice(),
        }
    }

    /// Iterates until a stop is requested. Returns the final counters.
    pub fn run(&mut self) -> RuntimeStats {
        while self.run_once() == DriverState::Running {}
        info!(
            "run(): stopped (signal={:?}, sent={:?}, received={:?}, bytes_sent={:?}, error_bytes={:?})",
            self.signals.stop_flag().signal(),
            self.sent,
            self.received,
            self.stats.bytes_sent(),
            self.stats.error_bytes()
        );
        self.stats
    }

    /// Runs a single iteration.
    pub fn run_once(&mut self) -> DriverState {
        if self.state == DriverState::Stopped {
            return self.state;
        }

        // Inbound traffic is handled before outbound traffic.
        match self.link.receive_pending() {
            Ok(Some(frame)) => {
                if let Err(e) = self.engine.process(frame) {
                    debug!("run_once(): dropping inbound frame ({:?})", e);
                }
            },
            Ok(None) => (),
            Err(e) => {
                debug!("run_once(): {:?}", e);
                self.stats.record_rx_error();
            },
        }

        match self.engine.receive(self.channel, &mut self.appbuf) {
            Ok(_) => self.received += 1,
            Err(e) if e.errno == libc::EAGAIN => (),
            Err(e) => trace!("run_once(): {:?}", e),
        }

        let payload: String = format!("Counter: sent: {}, recv: {}.\n", self.sent, self.received);
        match self.engine.send(&mut self.link, self.channel, payload.as_bytes()) {
            Ok(_) => {
                self.stats.record_sent(payload.len());
                self.sent += 1;
            },
            Err(e) => {
                trace!("run_once(): {:?}", e);
                self.stats.record_error(payload.len());
            },
        }

        if let Some(sample) = self.signals.poll_timer(&self.stats, Instant::now()) {
            self.last_sample = Some(sample);
        }

        if self.signals.should_stop() {
            self.state = DriverState::Stopped;
        }
        self.state
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.signals.stop_flag()
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    pub fn last_sample(&self) -> Option<&TelemetrySample> {
        self.last_sample.as_ref()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn link(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn engine(&mut self) -> &mut E {
        &mut self.engine
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
