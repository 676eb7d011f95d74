use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chord::{DEFAULT_MAX_HOPS, DEFAULT_RPC_PORT};
use crate::error::ConfigError;
use crate::network::rpc::RpcSettings;

pub const DEFAULT_ADDRESS: Ipv4Addr = Ipv4Addr::LOCALHOST;
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Node settings. Any field missing from a config file takes its default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct NodeConfig {
    /// The node's address; its ring identifier is derived from it
    pub address: Ipv4Addr,
    pub rpc_port: u16,
    pub rpc_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub max_hops: usize,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            rpc_port: DEFAULT_RPC_PORT,
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            max_hops: DEFAULT_MAX_HOPS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_file: None,
        }
    }
}

impl NodeConfig {
    pub fn read_fs<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn rpc_settings(&self) -> RpcSettings {
        RpcSettings {
            port: self.rpc_port,
            timeout: Duration::from_millis(self.rpc_timeout_ms),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = NodeConfig::from_json(r#"{ "address": "10.0.0.7", "max_hops": 12 }"#).unwrap();
        assert_eq!(config.address, Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(config.max_hops, 12);
        assert_eq!(config.rpc_port, 12345);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_file, None);
        assert_eq!(NodeConfig::from_json("{}").unwrap(), NodeConfig::default());
    }

    #[test]
    fn settings_carry_both_timeouts() {
        let config = NodeConfig {
            rpc_timeout_ms: 2500,
            probe_timeout_ms: 300,
            rpc_port: 4000,
            ..NodeConfig::default()
        };
        let settings = config.rpc_settings();
        assert_eq!(settings.port, 4000);
        assert_eq!(settings.timeout, Duration::from_millis(2500));
        assert_eq!(settings.probe_timeout, Duration::from_millis(300));
    }

    #[test]
    fn bad_files_are_reported() {
        assert!(matches!(
            NodeConfig::from_json(r#"{ "address": "not-an-address" }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            NodeConfig::read_fs("/nonexistent/triad.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
