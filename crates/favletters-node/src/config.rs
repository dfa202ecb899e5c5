//! Node configuration from environment variables.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use favletters_core::EngineConfig;
use favletters_transfer::UdpBusConfig;
use tracing::warn;

/// Configuration for a tab process.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Directory holding the shared text store
    pub data_dir: PathBuf,

    /// Multicast bus settings
    pub bus: UdpBusConfig,

    /// Engine tuning
    pub engine: EngineConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./favletters-data"),
            bus: UdpBusConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    ///
    /// - `FAVLETTERS_DATA_DIR`     store directory (default `./favletters-data`)
    /// - `FAVLETTERS_GROUP`        multicast `ip:port` (default `239.255.70.86:47086`)
    /// - `FAVLETTERS_INTERFACE`    interface address to join on
    /// - `FAVLETTERS_TICK_MS`      maintenance tick period
    /// - `FAVLETTERS_STALE_MS`     eviction threshold
    /// - `FAVLETTERS_DEFAULT_TEXT` text used when nothing is stored
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("FAVLETTERS_DATA_DIR").filter(|v| !v.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("FAVLETTERS_GROUP") {
            match parse_group(raw.trim()) {
                Some(group) => config.bus.group = group,
                None => warn!("Ignoring FAVLETTERS_GROUP={:?}: not a multicast ip:port", raw),
            }
        }
        if let Some(interface) = parsed::<Ipv4Addr, _>(&lookup, "FAVLETTERS_INTERFACE") {
            config.bus.interface = interface;
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "FAVLETTERS_TICK_MS").filter(|ms| *ms > 0) {
            config.engine.tick_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed::<u64, _>(&lookup, "FAVLETTERS_STALE_MS") {
            config.engine.stale_threshold = Duration::from_millis(ms);
        }
        if let Some(text) = lookup("FAVLETTERS_DEFAULT_TEXT") {
            config.engine.default_text = text;
        }

        config
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

/// Parse a multicast group, rejecting unicast addresses.
pub fn parse_group(raw: &str) -> Option<SocketAddrV4> {
    raw.parse::<SocketAddrV4>()
        .ok()
        .filter(|addr| addr.ip().is_multicast())
}
