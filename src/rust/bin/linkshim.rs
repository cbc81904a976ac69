// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![cfg_attr(feature = "strict", deny(warnings))]
#![deny(clippy::all)]

//==============================================================================
// Imports
//==============================================================================

use ::anyhow::Result;
use ::clap::{
    Arg,
    ArgMatches,
    Command,
};
use ::linkshim::{
    engine::{
        EtherEngine,
        RouteTable,
    },
    resolve_ipv4,
    runtime::logging,
    ChannelConfig,
    ChannelId,
    Config,
    DriverLoop,
    Fail,
    ProtocolEngine,
    RawSocketTransport,
    RouteEntry,
    RuntimeStats,
    SignalController,
};
use ::log::{
    error,
    info,
};
use ::rand::{
    rngs::SmallRng,
    Rng,
    SeedableRng,
};
use ::std::{
    net::{
        Ipv4Addr,
        SocketAddrV4,
    },
    time::Instant,
};

//==============================================================================
// Program Arguments
//==============================================================================

/// Program Arguments
#[derive(Debug)]
pub struct ProgramArguments {
    /// Source host (name or IPv4 address).
    src_host: String,
    /// Destination host (name or IPv4 address).
    dst_host: String,
    /// Source port.
    src_port: u16,
    /// Destination port.
    dst_port: u16,
    /// Protocol number.
    protocol: u8,
    /// Configuration file.
    config_path: Option<String>,
}

/// Associate functions for Program Arguments
impl ProgramArguments {
    /// Default source host.
    const DEFAULT_SRC_HOST: &'static str = "192.168.0.48";
    /// Default destination host.
    const DEFAULT_DST_HOST: &'static str = "192.168.4.78";
    /// Default destination port.
    const DEFAULT_DST_PORT: u16 = 1025;
    /// Default protocol number (TCP).
    const DEFAULT_PROTOCOL: u8 = libc::IPPROTO_TCP as u8;
    /// Usage line.
    const USAGE: &'static str = "-s saddr -d daddr -S sport -D dport -p proto [-c config] -h";

    /// Parses the program arguments from the command line interface.
    pub fn new(app_name: &'static str, app_author: &'static str, app_about: &'static str) -> Result<Self> {
        let matches: ArgMatches = Command::new(app_name)
            .author(app_author)
            .about(app_about)
            .arg(
                Arg::new("src")
                    .short('s')
                    .value_parser(clap::value_parser!(String))
                    .required(false)
                    .value_name("HOST")
                    .help("Sets source host"),
            )
            .arg(
                Arg::new("dst")
                    .short('d')
                    .value_parser(clap::value_parser!(String))
                    .required(false)
                    .value_name("HOST")
                    .help("Sets destination host"),
            )
            .arg(
                Arg::new("sport")
                    .short('S')
                    .value_parser(clap::value_parser!(String))
                    .required(false)
                    .value_name("PORT")
                    .help("Sets source port (random by default)"),
            )
            .arg(
                Arg::new("dport")
                    .short('D')
                    .value_parser(clap::value_parser!(String))
                    .required(false)
                    .value_name("PORT")
                    .help("Sets destination port"),
            )
            .arg(
                Arg::new("proto")
                    .short('p')
                    .value_parser(clap::value_parser!(String))
                    .required(false)
                    .value_name("NUMBER")
                    .help("Sets protocol number"),
            )
            .arg(
                Arg::new("config")
                    .short('c')
                    .value_parser(clap::value_parser!(String))
                    .required(false)
                    .value_name("FILE")
                    .help("Sets configuration file"),
            )
            .get_matches();

        // Default arguments.
        let mut args: ProgramArguments = ProgramArguments {
            src_host: Self::DEFAULT_SRC_HOST.to_string(),
            dst_host: Self::DEFAULT_DST_HOST.to_string(),
            src_port: SmallRng::from_entropy().gen(),
            dst_port: Self::DEFAULT_DST_PORT,
            protocol: Self::DEFAULT_PROTOCOL,
            config_path: None,
        };

        if let Some(host) = matches.get_one::<String>("src") {
            args.src_host = host.clone();
        }

        if let Some(host) = matches.get_one::<String>("dst") {
            args.dst_host = host.clone();
        }

        if let Some(port) = matches.get_one::<String>("sport") {
            args.set_src_port(port)?;
        }

        if let Some(port) = matches.get_one::<String>("dport") {
            args.set_dst_port(port)?;
        }

        if let Some(protocol) = matches.get_one::<String>("proto") {
            args.set_protocol(protocol)?;
        }

        if let Some(path) = matches.get_one::<String>("config") {
            args.config_path = Some(path.clone());
        }

        Ok(args)
    }

    pub fn get_src_host(&self) -> &str {
        &self.src_host
    }

    pub fn get_dst_host(&self) -> &str {
        &self.dst_host
    }

    pub fn get_src_port(&self) -> u16 {
        self.src_port
    }

    pub fn get_dst_port(&self) -> u16 {
        self.dst_port
    }

    pub fn get_protocol(&self) -> u8 {
        self.protocol
    }

    pub fn get_config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }

    fn set_src_port(&mut self, port_str: &str) -> Result<()> {
        self.src_port = port_str.parse()?;
        Ok(())
    }

    fn set_dst_port(&mut self, port_str: &str) -> Result<()> {
        self.dst_port = port_str.parse()?;
        Ok(())
    }

    fn set_protocol(&mut self, protocol_str: &str) -> Result<()> {
        self.protocol = protocol_str.parse()?;
        Ok(())
    }
}

//==============================================================================
// Standalone Functions
//==============================================================================

/// Logs a fatal initialization failure and turns it into an application error.
fn fatal(operation: &str, e: Fail) -> anyhow::Error {
    error!("{}(): {:?}", operation, e);
    anyhow::anyhow!("{} failed: {}", operation, e)
}

/// Drives the application.
fn main() -> Result<()> {
    logging::initialize();

    let app_name: &'static str = "linkshim";
    let args: ProgramArguments = ProgramArguments::new(
        app_name,
        "Microsoft Corporation",
        "Drives a protocol engine over a raw link-layer socket.",
    )?;

    // Resolve both ends before touching the network.
    let (src, dst): (Ipv4Addr, Ipv4Addr) =
        match (resolve_ipv4(args.get_src_host()), resolve_ipv4(args.get_dst_host())) {
            (Ok(src), Ok(dst)) => (src, dst),
            (Err(e), _) | (_, Err(e)) => {
                info!("Usage: {} {}", app_name, ProgramArguments::USAGE);
                return Err(fatal("resolve", e));
            },
        };

    let config: Config = match args.get_config_path() {
        Some(path) => Config::new(path),
        None => Config::from_env(),
    }
    .map_err(|e| fatal("config", e))?;

    let mut engine: EtherEngine = EtherEngine::new(config.mtu().map_err(|e| fatal("config", e))?);
    engine.init().map_err(|e| fatal("engine_init", e))?;
    engine.route_table().init().map_err(|e| fatal("route_init", e))?;

    let route: RouteEntry = RouteEntry::new(
        src,
        dst,
        config.local_link_addr().map_err(|e| fatal("config", e))?,
        config.remote_link_addr().map_err(|e| fatal("config", e))?,
        args.get_protocol(),
    );
    engine.route_table().add(route).map_err(|e| fatal("route_add", e))?;

    let transport: RawSocketTransport = RawSocketTransport::new(&config).map_err(|e| fatal("create_socket", e))?;
    let signals: SignalController = SignalController::install(
        config.telemetry_interval().map_err(|e| fatal("config", e))?,
        Instant::now(),
    )
    .map_err(|e| fatal("install_signals", e))?;

    let channel_config: ChannelConfig = ChannelConfig::new(
        SocketAddrV4::new(src, args.get_src_port()),
        SocketAddrV4::new(dst, args.get_dst_port()),
        args.get_protocol(),
    );
    let channel: ChannelId = engine
        .create(&channel_config)
        .map_err(|e| fatal("channel_create", e))?;
    engine.connect(channel).map_err(|e| fatal("channel_connect", e))?;
    info!("Connected ({}).", channel_config);

    let stats: RuntimeStats = DriverLoop::new(transport, engine, channel, signals).run();
    info!(
        "Terminated (bytes_sent={}, error_bytes={}, rx_errors={}).",
        stats.bytes_sent(),
        stats.error_bytes(),
        stats.rx_errors()
    );

    Ok(())
}
