// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use ::anyhow::Result;
use ::linkshim::{
    runtime::limits,
    test_helpers::{
        self,
        TestEngine,
        TestLinkLayer,
    },
    ChannelConfig,
    ChannelId,
    DriverLoop,
    DriverState,
    ProtocolEngine,
    RawSocketTransport,
    RuntimeStats,
    SignalController,
    StopFlag,
    TelemetrySample,
};
use ::socket2::{
    Domain,
    Socket,
    Type,
};
use ::std::{
    io::ErrorKind,
    thread::{
        self,
        JoinHandle,
    },
    time::{
        Duration,
        Instant,
    },
};

//==============================================================================
// Standalone Functions
//==============================================================================

fn new_connected_engine() -> Result<(TestEngine, ChannelId)> {
    let mut engine: TestEngine = TestEngine::new();
    engine.init()?;
    let channel: ChannelId = engine.create(&ChannelConfig::new(
        test_helpers::alice_addr(),
        test_helpers::bob_addr(),
        libc::IPPROTO_TCP as u8,
    ))?;
    engine.connect(channel)?;
    Ok((engine, channel))
}

fn new_driver(interval: Duration) -> Result<DriverLoop<TestLinkLayer, TestEngine>> {
    let (engine, channel): (TestEngine, ChannelId) = new_connected_engine()?;
    let signals: SignalController = SignalController::new(interval, Instant::now());
    Ok(DriverLoop::new(TestLinkLayer::new(), engine, channel, signals))
}

/// Creates a transport whose socket never becomes writable, and the socket at the other end of its link.
fn new_congested_transport(send_timeout: Duration) -> Result<(RawSocketTransport, Socket)> {
    let (local, remote): (Socket, Socket) = Socket::pair(Domain::UNIX, Type::DGRAM, None)?;
    let writer: Socket = local.try_clone()?;
    writer.set_nonblocking(true)?;

    // Fill the peer's receive queue. Nobody drains it.
    loop {
        match writer.send(&[0u8; 1024]) {
            Ok(_) => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok((RawSocketTransport::from_socket(local, 0, send_timeout)?, remote))
}

fn payload(sent: u64, received: u64) -> Vec<u8> {
    format!("Counter: sent: {}, recv: {}.\n", sent, received).into_bytes()
}

//==============================================================================
// Tests
//==============================================================================

/// One diagnostic payload goes out per iteration.
#[test]
fn one_payload_per_iteration() -> Result<()> {
    let mut driver: DriverLoop<TestLinkLayer, TestEngine> = new_driver(Duration::from_secs(3600))?;
    for _ in 0..10 {
        linkshim::ensure_eq!(driver.run_once(), DriverState::Running);
    }

    let frames: Vec<Vec<u8>> = driver
        .link()
        .pop_all_frames()
        .into_iter()
        .map(|frame| frame.into_bytes())
        .collect();
    linkshim::ensure_eq!(frames.len(), 10);
    for (i, frame) in frames.iter().enumerate() {
        linkshim::ensure_eq!(frame, &payload(i as u64, 0));
    }
    linkshim::ensure_eq!(driver.sent(), 10);
    Ok(())
}

/// Counters grow by exactly the payload length of each send.
#[test]
fn counters_track_payload_lengths() -> Result<()> {
    let mut driver: DriverLoop<TestLinkLayer, TestEngine> = new_driver(Duration::from_secs(3600))?;
    let mut expected_sent: u64 = 0;
    let mut expected_errors: u64 = 0;

    // Accepted.
    expected_sent += payload(driver.sent(), driver.received()).len() as u64;
    driver.run_once();

    // Link busy.
    driver.link().set_busy_sends(1);
    expected_errors += payload(driver.sent(), driver.received()).len() as u64;
    driver.run_once();

    // Link write error.
    driver.link().set_write_error(Some(libc::ENOBUFS));
    expected_errors += payload(driver.sent(), driver.received()).len() as u64;
    driver.run_once();
    driver.link().set_write_error(None);

    // Engine refusal.
    driver.engine().set_fail_sends(true);
    expected_errors += payload(driver.sent(), driver.received()).len() as u64;
    driver.run_once();
    driver.engine().set_fail_sends(false);

    // Accepted again.
    expected_sent += payload(driver.sent(), driver.received()).len() as u64;
    driver.run_once();

    let stats: RuntimeStats = *driver.stats();
    linkshim::ensure_eq!(stats.bytes_sent(), expected_sent);
    linkshim::ensure_eq!(stats.error_bytes(), expected_errors);
    linkshim::ensure_eq!(driver.sent(), 2);
    // Failed sends are never retried.
    linkshim::ensure_eq!(driver.link().num_outgoing(), 2);
    Ok(())
}

/// Inbound frames are handed to the demultiplexer before the iteration sends.
#[test]
fn inbound_is_processed_before_outbound() -> Result<()> {
    let mut driver: DriverLoop<TestLinkLayer, TestEngine> = new_driver(Duration::from_secs(3600))?;
    driver.link().push_frame(vec![1, 2, 3]);
    driver.engine().push_inbound(b"data".to_vec());
    driver.run_once();

    linkshim::ensure_eq!(driver.engine().processed().to_vec(), vec![vec![1_u8, 2, 3]]);
    linkshim::ensure_eq!(driver.received(), 1);
    match driver.link().pop_frame() {
        Some(frame) => linkshim::ensure_eq!(frame.into_bytes(), payload(0, 1)),
        None => anyhow::bail!("a payload should have been sent"),
    }
    Ok(())
}

/// Oversized inbound frames are forwarded truncated, and are not errors.
#[test]
fn oversized_inbound_frame_is_truncated() -> Result<()> {
    let mut driver: DriverLoop<TestLinkLayer, TestEngine> = new_driver(Duration::from_secs(3600))?;
    driver.link().push_frame(vec![0x5a; 5000]);
    driver.run_once();

    linkshim::ensure_eq!(driver.engine().processed().len(), 1);
    linkshim::ensure_eq!(driver.engine().processed()[0].len(), limits::RECVBUF_SIZE);
    linkshim::ensure_eq!(driver.stats().rx_errors(), 0);
    linkshim::ensure_eq!(driver.stats().error_bytes(), 0);
    Ok(())
}

/// Receive errors are tallied and the loop keeps going.
#[test]
fn receive_errors_are_tallied() -> Result<()> {
    let mut driver: DriverLoop<TestLinkLayer, TestEngine> = new_driver(Duration::from_secs(3600))?;
    driver.link().set_rx_errors(2);
    driver.link().push_frame(vec![0; 60]);
    for _ in 0..3 {
        linkshim::ensure_eq!(driver.run_once(), DriverState::Running);
    }

    linkshim::ensure_eq!(driver.stats().rx_errors(), 2);
    linkshim::ensure_eq!(driver.engine().processed().len(), 1);
    linkshim::ensure_eq!(driver.sent(), 3);
    Ok(())
}

/// Telemetry ticks do not disturb the loop.
#[test]
fn loop_runs_across_telemetry_ticks() -> Result<()> {
    let mut driver: DriverLoop<TestLinkLayer, TestEngine> = new_driver(Duration::from_millis(10))?;
    let start: Instant = Instant::now();
    while start.elapsed() < Duration::from_millis(50) {
        linkshim::ensure_eq!(driver.run_once(), DriverState::Running);
        driver.link().pop_all_frames();
    }
    linkshim::ensure_eq!(driver.stats().bytes_sent() > 0, true);
    Ok(())
}

/// A stop request ends the loop at the end of the current iteration.
#[test]
fn stop_request_ends_run() -> Result<()> {
    let mut driver: DriverLoop<TestLinkLayer, TestEngine> = new_driver(Duration::from_secs(3600))?;
    let stop: StopFlag = driver.stop_flag();

    let handle: JoinHandle<(DriverState, RuntimeStats)> = thread::spawn(move || {
        let stats: RuntimeStats = driver.run();
        (driver.state(), stats)
    });
    thread::sleep(Duration::from_millis(50));
    let requested: Instant = Instant::now();
    stop.raise(libc::SIGTERM);

    let (state, stats): (DriverState, RuntimeStats) = match handle.join() {
        Ok(result) => result,
        Err(_) => anyhow::bail!("driver thread panicked"),
    };
    linkshim::ensure_eq!(state, DriverState::Stopped);
    linkshim::ensure_eq!(requested.elapsed() < limits::SEND_TIMEOUT, true);
    linkshim::ensure_eq!(stats.bytes_sent() > 0, true);
    Ok(())
}

/// A stop request that arrives while a send waits for the link still ends the loop, within one send timeout.
#[test]
fn stop_request_ends_run_while_link_is_congested() -> Result<()> {
    let send_timeout: Duration = Duration::from_millis(1000);
    let (transport, remote): (RawSocketTransport, Socket) = new_congested_transport(send_timeout)?;
    let (engine, channel): (TestEngine, ChannelId) = new_connected_engine()?;
    let signals: SignalController = SignalController::new(Duration::from_secs(3600), Instant::now());
    let mut driver: DriverLoop<RawSocketTransport, TestEngine> = DriverLoop::new(transport, engine, channel, signals);
    let stop: StopFlag = driver.stop_flag();

    let handle: JoinHandle<(DriverState, RuntimeStats)> = thread::spawn(move || {
        let stats: RuntimeStats = driver.run();
        (driver.state(), stats)
    });
    // Lands in the middle of the first wait for writability.
    thread::sleep(Duration::from_millis(300));
    let requested: Instant = Instant::now();
    stop.raise(libc::SIGINT);

    let (state, stats): (DriverState, RuntimeStats) = match handle.join() {
        Ok(result) => result,
        Err(_) => anyhow::bail!("driver thread panicked"),
    };
    linkshim::ensure_eq!(state, DriverState::Stopped);
    linkshim::ensure_eq!(requested.elapsed() < send_timeout + Duration::from_millis(500), true);
    linkshim::ensure_eq!(stats.bytes_sent(), 0);
    linkshim::ensure_eq!(stats.error_bytes() > 0, true);

    drop(remote);
    Ok(())
}

/// Telemetry reports carry exactly the bytes the link accepted and the bytes that failed.
#[test]
fn telemetry_sample_matches_transmitted_bytes() -> Result<()> {
    // A zero interval reports on every iteration.
    let mut driver: DriverLoop<TestLinkLayer, TestEngine> = new_driver(Duration::ZERO)?;
    let mut expected_errors: u64 = 0;

    for i in 0..12 {
        match i % 4 {
            1 => {
                driver.link().set_busy_sends(1);
                expected_errors += payload(driver.sent(), driver.received()).len() as u64;
            },
            3 => {
                driver.link().set_write_error(Some(libc::ENOBUFS));
                expected_errors += payload(driver.sent(), driver.received()).len() as u64;
            },
            _ => driver.link().set_write_error(None),
        }
        thread::sleep(Duration::from_millis(1));
        driver.run_once();
    }
    driver.link().set_write_error(None);

    let transmitted: u64 = driver
        .link()
        .pop_all_frames()
        .iter()
        .map(|frame| frame.len() as u64)
        .sum();
    let sample: TelemetrySample = match driver.last_sample() {
        Some(sample) => *sample,
        None => anyhow::bail!("telemetry should have been reported"),
    };
    linkshim::ensure_eq!(driver.sent(), 6);
    linkshim::ensure_eq!(sample.bytes_sent, transmitted);
    linkshim::ensure_eq!(sample.error_bytes, expected_errors);
    linkshim::ensure_eq!(sample.bytes_sent, driver.stats().bytes_sent());
    Ok(())
}

/// Delivered signals set the stop flag of an installed controller. The first signal is the one kept.
#[test]
fn delivered_signal_sets_stop_flag() -> Result<()> {
    let signals: SignalController = SignalController::install(Duration::from_secs(3600), Instant::now())?;
    linkshim::ensure_eq!(signals.should_stop(), false);

    signal_hook::low_level::raise(libc::SIGTERM)?;
    linkshim::ensure_eq!(signals.should_stop(), true);
    linkshim::ensure_eq!(signals.stop_flag().signal(), Some(libc::SIGTERM));

    signal_hook::low_level::raise(libc::SIGINT)?;
    linkshim::ensure_eq!(signals.stop_flag().signal(), Some(libc::SIGTERM));
    Ok(())
}
