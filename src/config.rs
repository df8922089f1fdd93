//! Configuration loaded from CLI flags and an optional TOML file (§6
//! Configuration). Every tunable gets a default matching the collector's
//! historical fixed constants.

use std::net::Ipv4Addr;

use anyhow::Result;
use serde::Deserialize;

/// One `[[exclude]]` entry in the TOML config, or a CLI-supplied range.
#[derive(Debug, Clone, Deserialize)]
pub struct ExcludeRangeConfig {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address to listen for NetFlow datagrams on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: Ipv4Addr,
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Source address/port to bind the emit socket to.
    #[serde(default = "default_emit_src_addr")]
    pub emit_src_addr: Ipv4Addr,
    /// Destination address/port evicted summaries are sent to.
    #[serde(default = "default_emit_dst_addr")]
    pub emit_dst_addr: Ipv4Addr,
    #[serde(default = "default_emit_port")]
    pub emit_port: u16,

    /// Target size (bytes) for the listen socket's receive buffer.
    #[serde(default = "default_sock_buf")]
    pub recv_buffer_bytes: usize,
    /// Target size (bytes) for the emit socket's send buffer.
    #[serde(default = "default_sock_buf")]
    pub send_buffer_bytes: usize,

    /// Number of independently locked flow-index shards (§4.B).
    #[serde(default = "default_shards")]
    pub shards: usize,

    /// Idle-out threshold, seconds (§4.E).
    #[serde(default = "default_min_flow_age")]
    pub min_flow_age_secs: u64,
    /// Hard-out threshold, seconds (§4.E).
    #[serde(default = "default_max_flow_age")]
    pub max_flow_age_secs: u64,
    /// Janitor sweep period, seconds (§4.E).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Console/log statistics report period, seconds (§4.F).
    #[serde(default = "default_stats_rate")]
    pub stats_rate_secs: u64,

    /// Initial exclusion ranges (§4.A), applied at startup before any
    /// datagram is processed.
    #[serde(default)]
    pub exclude: Vec<ExcludeRangeConfig>,
}

fn default_listen_addr() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}
fn default_listen_port() -> u16 {
    2055
}
fn default_emit_src_addr() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}
fn default_emit_dst_addr() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}
fn default_emit_port() -> u16 {
    2056
}
fn default_sock_buf() -> usize {
    1024 * 1024
}
fn default_shards() -> usize {
    crate::flow::shard::DEFAULT_SHARDS
}
fn default_min_flow_age() -> u64 {
    60
}
fn default_max_flow_age() -> u64 {
    300
}
fn default_sweep_interval() -> u64 {
    5
}
fn default_stats_rate() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            listen_port: default_listen_port(),
            emit_src_addr: default_emit_src_addr(),
            emit_dst_addr: default_emit_dst_addr(),
            emit_port: default_emit_port(),
            recv_buffer_bytes: default_sock_buf(),
            send_buffer_bytes: default_sock_buf(),
            shards: default_shards(),
            min_flow_age_secs: default_min_flow_age(),
            max_flow_age_secs: default_max_flow_age(),
            sweep_interval_secs: default_sweep_interval(),
            stats_rate_secs: default_stats_rate(),
            exclude: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::de::from_str(&contents)?;
        Ok(config)
    }
}
