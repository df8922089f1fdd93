//! Emitter interface and JSON wire format (§4.G, §6 Output).
//!
//! The emitter never retains the summary past the call — the core
//! releases it immediately on return (§4.G), so `emit` takes `&FlowSummary`
//! rather than an owned value.

use std::net::{Ipv4Addr, UdpSocket};
use std::sync::Mutex;

use serde::Serialize;
use socket2::{Domain, Protocol, Socket, Type};

use crate::flow::FlowSummary;

#[derive(Serialize)]
struct SourceStatJson {
    flow_source: String,
    src_int: u16,
    dst_int: u16,
    num_packets: u64,
    num_bytes: u64,
    num_flows: u64,
}

#[derive(Serialize)]
struct FlowSummaryJson {
    src_addr: String,
    dst_addr: String,
    protocol: u8,
    src_port: u16,
    dst_port: u16,
    tcp_flags: u8,
    start_time: u64,
    end_time: u64,
    source_count: u8,
    source_stats: Vec<SourceStatJson>,
}

impl From<&FlowSummary> for FlowSummaryJson {
    fn from(summary: &FlowSummary) -> Self {
        FlowSummaryJson {
            src_addr: Ipv4Addr::from(summary.key.src_addr).to_string(),
            dst_addr: Ipv4Addr::from(summary.key.dst_addr).to_string(),
            protocol: summary.key.protocol,
            src_port: summary.key.src_port,
            dst_port: summary.key.dst_port,
            tcp_flags: summary.tcp_flags,
            start_time: summary.start_time,
            end_time: summary.end_time,
            source_count: summary.source_count() as u8,
            source_stats: summary
                .sources
                .iter()
                .map(|s| SourceStatJson {
                    flow_source: Ipv4Addr::from(s.exporter).to_string(),
                    src_int: s.src_int,
                    dst_int: s.dst_int,
                    num_packets: s.num_packets,
                    num_bytes: s.num_bytes,
                    num_flows: s.num_flows,
                })
                .collect(),
        }
    }
}

/// Render the exact JSON document described in §6 Output for one evicted
/// summary.
pub fn to_json(summary: &FlowSummary) -> serde_json::Result<String> {
    serde_json::to_string(&FlowSummaryJson::from(summary))
}

/// The emitter contract from §4.G: takes an evicted summary, produces zero
/// or more side effects, never retains a reference past the call.
pub trait Emitter: Send + Sync {
    fn emit(&self, summary: &FlowSummary);
}

/// Sends one JSON object per UDP datagram to a configured destination
/// (§6 Output: "datagram boundaries coincide with object boundaries").
pub struct UdpEmitter {
    socket: UdpSocket,
}

impl UdpEmitter {
    /// Bind the emit socket, connect it to `destination`, and try to grow
    /// its send buffer to `target_buffer_bytes` (best-effort, per §6
    /// Configuration's send-buffer target size — failures fall back to the
    /// kernel default rather than aborting startup).
    pub fn bind(
        source: std::net::SocketAddrV4,
        destination: std::net::SocketAddrV4,
        target_buffer_bytes: usize,
    ) -> std::io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.bind(&std::net::SocketAddr::V4(source).into())?;
        if let Err(e) = socket.set_send_buffer_size(target_buffer_bytes) {
            tracing::warn!(error = %e, target_buffer_bytes, "could not set emit socket send buffer size");
        }
        let socket: UdpSocket = socket.into();
        socket.connect(destination)?;
        Ok(Self { socket })
    }
}

impl Emitter for UdpEmitter {
    fn emit(&self, summary: &FlowSummary) {
        match to_json(summary) {
            Ok(json) => {
                // Emit failures are logged and the summary is still
                // dropped — no retry, no buffering (§7: at-least-once
                // delivery is an explicit non-goal).
                if let Err(e) = self.socket.send(json.as_bytes()) {
                    tracing::warn!(error = %e, "failed to send evicted flow summary");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize flow summary");
            }
        }
    }
}

/// In-memory emitter used by tests to assert on exactly what was evicted,
/// without a real socket.
#[derive(Default)]
pub struct CollectingEmitter {
    emitted: Mutex<Vec<FlowSummary>>,
}

impl CollectingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<FlowSummary> {
        std::mem::take(&mut self.emitted.lock().expect("collecting emitter mutex poisoned"))
    }
}

impl Emitter for CollectingEmitter {
    fn emit(&self, summary: &FlowSummary) {
        self.emitted
            .lock()
            .expect("collecting emitter mutex poisoned")
            .push(summary.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{FlowKey, SourceSummary};

    fn summary() -> FlowSummary {
        FlowSummary {
            key: FlowKey {
                protocol: 6,
                src_addr: u32::from(Ipv4Addr::new(10, 0, 0, 1)),
                dst_addr: u32::from(Ipv4Addr::new(10, 0, 0, 2)),
                src_port: 1234,
                dst_port: 80,
            },
            time_added: 1000,
            time_updated: 1000,
            start_time: 100,
            end_time: 100,
            tcp_flags: 0x02,
            sources: vec![SourceSummary {
                exporter: u32::from(Ipv4Addr::new(192, 0, 2, 1)),
                src_int: 1,
                dst_int: 2,
                num_packets: 5,
                num_bytes: 500,
                num_flows: 1,
            }],
        }
    }

    #[test]
    fn json_matches_scenario_1_shape() {
        let json = to_json(&summary()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["src_addr"], "10.0.0.1");
        assert_eq!(value["dst_addr"], "10.0.0.2");
        assert_eq!(value["protocol"], 6);
        assert_eq!(value["src_port"], 1234);
        assert_eq!(value["dst_port"], 80);
        assert_eq!(value["tcp_flags"], 2);
        assert_eq!(value["source_count"], 1);
        assert_eq!(value["source_stats"][0]["flow_source"], "192.0.2.1");
        assert_eq!(value["source_stats"][0]["num_packets"], 5);
        assert_eq!(value["source_stats"][0]["num_bytes"], 500);
        assert_eq!(value["source_stats"][0]["num_flows"], 1);
    }

    #[test]
    fn collecting_emitter_drains_exactly_once() {
        let emitter = CollectingEmitter::new();
        emitter.emit(&summary());
        emitter.emit(&summary());

        let drained = emitter.drain();
        assert_eq!(drained.len(), 2);
        assert!(emitter.drain().is_empty());
    }

    #[test]
    fn udp_emitter_round_trips_one_datagram_per_object() {
        let dest = UdpSocket::bind("127.0.0.1:0").unwrap();
        let dest_addr = match dest.local_addr().unwrap() {
            std::net::SocketAddr::V4(a) => a,
            _ => unreachable!(),
        };
        let source_addr: std::net::SocketAddrV4 = "127.0.0.1:0".parse().unwrap();

        let emitter = UdpEmitter::bind(source_addr, dest_addr, 64 * 1024).unwrap();
        emitter.emit(&summary());

        let mut buf = [0u8; 4096];
        let (len, _) = dest.recv_from(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(value["src_addr"], "10.0.0.1");
    }
}
