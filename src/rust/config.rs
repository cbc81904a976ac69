// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    fail::Fail,
    limits,
    network::types::MacAddress,
};
use ::std::{
    fs,
    str::FromStr,
    time::Duration,
};
use ::yaml_rust::{
    yaml::Hash,
    Yaml,
    YamlLoader,
};

//======================================================================================================================
// Constants
//======================================================================================================================

/// Environment variable holding the path to the configuration file.
pub const CONFIG_PATH_ENV: &str = "LINKSHIM_CONFIG_PATH";

// Raw socket options.
mod raw_socket_config {
    pub const SECTION_NAME: &str = "raw_socket";
    pub const INTERFACE_NAME: &str = "interface_name";
    pub const INTERFACE_INDEX: &str = "interface_index";
    pub const SEND_TIMEOUT_MS: &str = "send_timeout_ms";
}

// Static route options.
mod route_config {
    pub const SECTION_NAME: &str = "route";
    pub const LOCAL_LINK_ADDR: &str = "local_link_addr";
    pub const REMOTE_LINK_ADDR: &str = "remote_link_addr";
    pub const MTU: &str = "mtu";
    pub const DEFAULT_LOCAL_LINK_ADDR: [u8; 6] = [0x00, 0x11, 0x09, 0x61, 0xEB, 0x0E];
    pub const DEFAULT_REMOTE_LINK_ADDR: [u8; 6] = [0x00, 0x0E, 0x0C, 0x83, 0x87, 0xF0];
}

// Telemetry options.
mod telemetry_config {
    pub const SECTION_NAME: &str = "telemetry";
    pub const INTERVAL_MS: &str = "interval_ms";
}

//======================================================================================================================
// Structures
//======================================================================================================================

/// Shim configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Yaml);

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl Config {
    /// Reads a configuration file into a [Config] object.
    pub fn new(config_path: &str) -> Result<Self, Fail> {
        let config_s: String = match fs::read_to_string(config_path) {
            Ok(config_s) => config_s,
            Err(e) => {
                let cause: String = format!("failed to read config file {:?}", config_path);
                error!("new(): {} ({:?})", cause, e);
                return Err(Fail::from_io(&cause, &e));
            },
        };
        Self::from_yaml_str(&config_s)
    }

    /// Parses a configuration out of a YAML document.
    pub fn from_yaml_str(config_s: &str) -> Result<Self, Fail> {
        let config: Vec<Yaml> = match YamlLoader::load_from_str(config_s) {
            Ok(config) => config,
            Err(e) => {
                let cause: String = format!("malformed config: {}", e);
                error!("from_yaml_str(): {}", cause);
                return Err(Fail::new(libc::EINVAL, &cause));
            },
        };
        match &config[..] {
            [] => Ok(Self::default()),
            [c] => Ok(Self(c.clone())),
            _ => Err(Fail::new(libc::EINVAL, "Wrong number of config objects")),
        }
    }

    /// Loads the configuration file named by [CONFIG_PATH_ENV], if any. Otherwise, falls back to defaults.
    pub fn from_env() -> Result<Self, Fail> {
        match ::std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::new(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Raw socket: index of the interface to bind to and to send through. An explicit index takes precedence over an
    /// interface name. Zero means no interface is configured.
    pub fn interface_index(&self) -> Result<i32, Fail> {
        if let Some(ifindex) = self.get_int_option(raw_socket_config::SECTION_NAME, raw_socket_config::INTERFACE_INDEX)? {
            return Ok(ifindex);
        }
        match self.get_str_option(raw_socket_config::SECTION_NAME, raw_socket_config::INTERFACE_NAME, |val: &str| {
            Some(val.to_string())
        })? {
            Some(ifname) => Self::get_ifindex(&ifname),
            None => Ok(0),
        }
    }

    /// Raw socket: how long a transmission waits for the socket to become writable.
    pub fn send_timeout(&self) -> Result<Duration, Fail> {
        match self.get_int_option(raw_socket_config::SECTION_NAME, raw_socket_config::SEND_TIMEOUT_MS)? {
            Some(ms) => Ok(Duration::from_millis(ms)),
            None => Ok(limits::SEND_TIMEOUT),
        }
    }

    /// Route: link address of the local interface.
    pub fn local_link_addr(&self) -> Result<MacAddress, Fail> {
        match self.get_str_option(route_config::SECTION_NAME, route_config::LOCAL_LINK_ADDR, |val: &str| {
            MacAddress::parse_canonical_str(val).ok()
        })? {
            Some(addr) => Ok(addr),
            None => Ok(MacAddress::new(route_config::DEFAULT_LOCAL_LINK_ADDR)),
        }
    }

    /// Route: link address of the next hop.
    pub fn remote_link_addr(&self) -> Result<MacAddress, Fail> {
        match self.get_str_option(route_config::SECTION_NAME, route_config::REMOTE_LINK_ADDR, |val: &str| {
            MacAddress::parse_canonical_str(val).ok()
        })? {
            Some(addr) => Ok(addr),
            None => Ok(MacAddress::new(route_config::DEFAULT_REMOTE_LINK_ADDR)),
        }
    }

    /// Route: link MTU (in bytes).
    pub fn mtu(&self) -> Result<usize, Fail> {
        match self.get_int_option(route_config::SECTION_NAME, route_config::MTU)? {
            Some(mtu) if mtu > 0 => Ok(mtu),
            Some(_) => Err(Fail::new(libc::ERANGE, "parameter \"mtu\" is out of range")),
            None => Ok(limits::DEFAULT_MTU),
        }
    }

    /// Telemetry: interval between two reports.
    pub fn telemetry_interval(&self) -> Result<Duration, Fail> {
        match self.get_int_option(telemetry_config::SECTION_NAME, telemetry_config::INTERVAL_MS)? {
            Some(0) => Err(Fail::new(libc::ERANGE, "parameter \"interval_ms\" is out of range")),
            Some(ms) => Ok(Duration::from_millis(ms)),
            None => Ok(limits::TELEMETRY_INTERVAL),
        }
    }

    //==================================================================================================================
    // Static Functions
    //==================================================================================================================

    /// Gets the interface index of the network interface named `ifname`.
    fn get_ifindex(ifname: &str) -> Result<i32, Fail> {
        let path: String = format!("/sys/class/net/{}/ifindex", ifname);
        let ifindex_s: String = match fs::read_to_string(&path) {
            Ok(ifindex_s) => ifindex_s,
            Err(e) => {
                let cause: String = format!("could not read ifindex of {:?}", ifname);
                error!("get_ifindex(): {} ({:?})", cause, e);
                return Err(Fail::from_io(&cause, &e));
            },
        };
        match ifindex_s.trim().parse() {
            Ok(ifindex) => Ok(ifindex),
            Err(_) => Err(Fail::new(libc::EINVAL, "could not parse ifindex")),
        }
    }

    /// Index `yaml` to find the value at `section.index`. Missing entries yield None.
    fn get_option<'a>(&'a self, section: &str, index: &str) -> Option<&'a Yaml> {
        match &self.0[section][index] {
            Yaml::BadValue | Yaml::Null => None,
            value => Some(value),
        }
    }

    /// Reads an integer option. The environment value overrides the config file if it exists.
    fn get_int_option<T: TryFrom<i64> + FromStr>(&self, section: &str, index: &str) -> Result<Option<T>, Fail> {
        if let Some(value) = Self::get_typed_env_option(index)? {
            return Ok(Some(value));
        }
        let val: i64 = match self.get_option(section, index) {
            Some(option) => match option.as_i64() {
                Some(val) => val,
                None => {
                    let message: String = format!("parameter {} has unexpected type", index);
                    return Err(Fail::new(libc::EINVAL, message.as_str()));
                },
            },
            None => return Ok(None),
        };
        match T::try_from(val) {
            Ok(val) => Ok(Some(val)),
            _ => {
                let message: String = format!("parameter \"{}\" is out of range", index);
                Err(Fail::new(libc::ERANGE, message.as_str()))
            },
        }
    }

    /// Reads a string option and runs it through `parser`. The environment value overrides the config file if it
    /// exists.
    fn get_str_option<T, Fn>(&self, section: &str, index: &str, parser: Fn) -> Result<Option<T>, Fail>
    where
        Fn: FnOnce(&str) -> Option<T>,
    {
        let value: String = if let Ok(var) = ::std::env::var(index.to_uppercase()) {
            var
        } else {
            match self.get_option(section, index) {
                Some(option) => match option.as_str() {
                    Some(value) => value.to_string(),
                    None => {
                        let message: String = format!("parameter {} has unexpected type", index);
                        return Err(Fail::new(libc::EINVAL, message.as_str()));
                    },
                },
                None => return Ok(None),
            }
        };
        match parser(&value) {
            Some(value) => Ok(Some(value)),
            None => {
                let message: String = format!("parameter {} has unexpected value", index);
                Err(Fail::new(libc::EINVAL, message.as_str()))
            },
        }
    }

    /// Get value where the environment value overrides the config file if it exists.
    fn get_typed_env_option<T: FromStr>(index: &str) -> Result<Option<T>, Fail> {
        // Check for the environment variable.
        if let Ok(var) = ::std::env::var(index.to_uppercase()) {
            if let Ok(value) = var.as_str().parse() {
                return Ok(Some(value));
            } else {
                let message: String = format!("parameter {} has unexpected type", index);
                return Err(Fail::new(libc::EINVAL, message.as_str()));
            }
        }
        Ok(None)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for Config {
    fn default() -> Self {
        Self(Yaml::Hash(Hash::new()))
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
