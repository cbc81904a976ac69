// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use ::anyhow::Result;
use ::linkshim::{
    engine::{
        ChannelHeader,
        EtherEngine,
        Ethernet2Header,
        ETHERNET2_HEADER_SIZE,
        ETHERTYPE_LINKSHIM,
    },
    test_helpers::{
        self,
        TestLinkLayer,
        ALICE_IPV4,
        ALICE_MAC,
        BOB_IPV4,
        BOB_MAC,
    },
    ChannelConfig,
    ChannelId,
    DriverLoop,
    DriverState,
    FrameDemultiplexer,
    OutboundFrame,
    ProtocolEngine,
    RouteEntry,
    RouteTable,
    SignalController,
};
use ::std::{
    net::SocketAddrV4,
    time::{
        Duration,
        Instant,
    },
};

//==============================================================================
// Constants
//==============================================================================

const PROTOCOL: u8 = libc::IPPROTO_TCP as u8;

//==============================================================================
// Standalone Functions
//==============================================================================

/// Creates an engine with a single connected channel from `local` to `remote`.
fn new_connected_engine(
    mtu: usize,
    local: SocketAddrV4,
    local_mac: ::linkshim::MacAddress,
    remote: SocketAddrV4,
    remote_mac: ::linkshim::MacAddress,
) -> Result<(EtherEngine, ChannelId)> {
    let mut engine: EtherEngine = EtherEngine::new(mtu);
    engine.init()?;
    engine.route_table().init()?;
    engine
        .route_table()
        .add(RouteEntry::new(*local.ip(), *remote.ip(), local_mac, remote_mac, PROTOCOL))?;
    let channel: ChannelId = engine.create(&ChannelConfig::new(local, remote, PROTOCOL))?;
    engine.connect(channel)?;
    Ok((engine, channel))
}

fn new_alice(mtu: usize) -> Result<(EtherEngine, ChannelId)> {
    new_connected_engine(
        mtu,
        test_helpers::alice_addr(),
        ALICE_MAC,
        test_helpers::bob_addr(),
        BOB_MAC,
    )
}

fn new_bob(mtu: usize) -> Result<(EtherEngine, ChannelId)> {
    new_connected_engine(
        mtu,
        test_helpers::bob_addr(),
        BOB_MAC,
        test_helpers::alice_addr(),
        ALICE_MAC,
    )
}

//==============================================================================
// Tests
//==============================================================================

#[test]
fn send_builds_addressed_frame() -> Result<()> {
    let mut link: TestLinkLayer = TestLinkLayer::new();
    let (mut alice, channel): (EtherEngine, ChannelId) = new_alice(1500)?;

    linkshim::ensure_eq!(alice.send(&mut link, channel, b"hello")?, 5);

    let frame: OutboundFrame = match link.pop_frame() {
        Some(frame) => frame,
        None => anyhow::bail!("a frame should have been transmitted"),
    };
    linkshim::ensure_eq!(frame.dst_link_addr(), BOB_MAC);
    linkshim::ensure_eq!(frame.protocol(), ETHERTYPE_LINKSHIM);

    let (eth_hdr, rest): (Ethernet2Header, &[u8]) = Ethernet2Header::parse(frame.as_bytes())?;
    linkshim::ensure_eq!(eth_hdr.src_addr(), ALICE_MAC);
    linkshim::ensure_eq!(eth_hdr.dst_addr(), BOB_MAC);
    let (ch_hdr, payload): (ChannelHeader, &[u8]) = ChannelHeader::parse(rest)?;
    linkshim::ensure_eq!(ch_hdr.src_port(), test_helpers::ALICE_PORT);
    linkshim::ensure_eq!(ch_hdr.dst_port(), test_helpers::BOB_PORT);
    linkshim::ensure_eq!(ch_hdr.protocol(), PROTOCOL);
    linkshim::ensure_eq!(payload, b"hello");
    Ok(())
}

#[test]
fn frames_reach_the_remote_channel() -> Result<()> {
    let mut link: TestLinkLayer = TestLinkLayer::new();
    let (mut alice, alice_channel): (EtherEngine, ChannelId) = new_alice(1500)?;
    let (mut bob, bob_channel): (EtherEngine, ChannelId) = new_bob(1500)?;

    alice.send(&mut link, alice_channel, b"ping")?;
    for frame in link.pop_all_frames() {
        bob.process(frame.as_bytes())?;
    }

    let mut buf: [u8; 64] = [0; 64];
    let nbytes: usize = bob.receive(bob_channel, &mut buf)?;
    linkshim::ensure_eq!(&buf[..nbytes], b"ping");

    // Alice does not hear her own frames.
    alice.send(&mut link, alice_channel, b"echo")?;
    for frame in link.pop_all_frames() {
        alice.process(frame.as_bytes())?;
    }
    linkshim::ensure_eq!(alice.pending(alice_channel)?, 0);
    Ok(())
}

#[test]
fn send_rejects_payloads_beyond_mtu() -> Result<()> {
    let mut link: TestLinkLayer = TestLinkLayer::new();
    let mtu: usize = 200;
    let (mut alice, channel): (EtherEngine, ChannelId) = new_alice(mtu)?;
    let max_payload: usize = mtu - RouteEntry::DEFAULT_HEADER_SIZE;

    alice.send(&mut link, channel, &vec![0u8; max_payload])?;
    linkshim::ensure_eq!(
        alice
            .send(&mut link, channel, &vec![0u8; max_payload + 1])
            .map_err(|e| e.errno),
        Err(libc::EMSGSIZE)
    );
    linkshim::ensure_eq!(link.num_outgoing(), 1);
    Ok(())
}

#[test]
fn send_reports_busy_link() -> Result<()> {
    let mut link: TestLinkLayer = TestLinkLayer::new();
    let (mut alice, channel): (EtherEngine, ChannelId) = new_alice(1500)?;

    link.set_busy_sends(1);
    linkshim::ensure_eq!(
        alice.send(&mut link, channel, b"x").map_err(|e| e.errno),
        Err(libc::EAGAIN)
    );
    link.set_write_error(Some(libc::ENETDOWN));
    linkshim::ensure_eq!(
        alice.send(&mut link, channel, b"x").map_err(|e| e.errno),
        Err(libc::ENETDOWN)
    );
    linkshim::ensure_eq!(link.num_outgoing(), 0);
    Ok(())
}

#[test]
fn send_on_unconnected_channel_fails() -> Result<()> {
    let mut link: TestLinkLayer = TestLinkLayer::new();
    let mut engine: EtherEngine = EtherEngine::new(1500);
    engine.init()?;
    let channel: ChannelId = engine.create(&ChannelConfig::new(
        SocketAddrV4::new(ALICE_IPV4, 1),
        SocketAddrV4::new(BOB_IPV4, 2),
        PROTOCOL,
    ))?;
    linkshim::ensure_eq!(
        engine.send(&mut link, channel, b"x").map_err(|e| e.errno),
        Err(libc::ENOTCONN)
    );
    Ok(())
}

#[test]
fn driver_exchanges_counters_between_engines() -> Result<()> {
    let (alice, alice_channel): (EtherEngine, ChannelId) = new_alice(1500)?;
    let (bob, bob_channel): (EtherEngine, ChannelId) = new_bob(1500)?;
    let interval: Duration = Duration::from_secs(3600);
    let mut alice: DriverLoop<TestLinkLayer, EtherEngine> = DriverLoop::new(
        TestLinkLayer::new(),
        alice,
        alice_channel,
        SignalController::new(interval, Instant::now()),
    );
    let mut bob: DriverLoop<TestLinkLayer, EtherEngine> = DriverLoop::new(
        TestLinkLayer::new(),
        bob,
        bob_channel,
        SignalController::new(interval, Instant::now()),
    );

    for _ in 0..4 {
        linkshim::ensure_eq!(alice.run_once(), DriverState::Running);
        linkshim::ensure_eq!(bob.run_once(), DriverState::Running);
        // Wire both links together.
        for frame in alice.link().pop_all_frames() {
            bob.link().push_frame(frame.into_bytes());
        }
        for frame in bob.link().pop_all_frames() {
            alice.link().push_frame(frame.into_bytes());
        }
    }

    // Each side consumed what the other sent one round earlier.
    linkshim::ensure_eq!(alice.sent(), 4);
    linkshim::ensure_eq!(bob.sent(), 4);
    linkshim::ensure_eq!(alice.received(), 3);
    linkshim::ensure_eq!(bob.received(), 3);
    linkshim::ensure_eq!(alice.stats().error_bytes(), 0);

    // Frames carry a full header in front of the payload.
    alice.run_once();
    match alice.link().pop_frame() {
        Some(frame) => linkshim::ensure_eq!(
            &frame.as_bytes()[(ETHERNET2_HEADER_SIZE + 5)..],
            b"Counter: sent: 4, recv: 4.\n"
        ),
        None => anyhow::bail!("a payload should have been sent"),
    }
    Ok(())
}
