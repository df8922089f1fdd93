//! Monotonic counters and the one live-flow gauge (§4.F).
//!
//! Every counter but the gauge is a plain [`AtomicU64`] with [`Ordering::Relaxed`]
//! — small losses under contention on these are acceptable. `current_flows`
//! is the sole counter mutated by both the ingest path and the janitor, so
//! it gets its own atomic and is the one value callers should treat as
//! authoritative rather than advisory.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Protocol numbers the periodic console report calls out by name. Anything
/// else still increments `proto_flows[protocol]`, it's just not singled out
/// in the periodic report.
pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;
pub const PROTO_ICMP: u8 = 1;
pub const PROTO_IGMP: u8 = 2;
pub const PROTO_IP_IN_IP: u8 = 4;
pub const PROTO_GRE: u8 = 47;
pub const PROTO_ESP: u8 = 50;
pub const PROTO_AH: u8 = 51;
pub const PROTO_EIGRP: u8 = 88;
pub const PROTO_ETH_IN_IP: u8 = 97;
pub const PROTO_PIM: u8 = 103;
pub const PROTO_6IN4: u8 = 41;

#[derive(Debug, Default)]
pub struct Stats {
    pub flow_packets: AtomicU64,
    pub total_flows: AtomicU64,
    pub excluded_flows: AtomicU64,
    pub new_flows: AtomicU64,
    pub dup_flows: AtomicU64,
    /// The one gauge shared between ingest (increment) and the janitor
    /// (decrement). `i64` so a benign negative excursion under contention
    /// (see §9) is visible rather than silently wrapping.
    current_flows: AtomicI64,
    proto_flows: [AtomicU64; 256],
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_packet(&self) {
        self.flow_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_total_flow(&self) {
        self.total_flows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_excluded(&self) {
        self.excluded_flows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_new_flow(&self, protocol: u8) {
        self.new_flows.fetch_add(1, Ordering::Relaxed);
        self.current_flows.fetch_add(1, Ordering::Relaxed);
        self.proto_flows[protocol as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dup_flow(&self) {
        self.dup_flows.fetch_add(1, Ordering::Relaxed);
    }

    /// Called once per janitor pass with the total number of summaries
    /// evicted across every shard.
    pub fn record_evictions(&self, count: u64) {
        self.current_flows.fetch_sub(count as i64, Ordering::Relaxed);
    }

    pub fn current_flows(&self) -> i64 {
        self.current_flows.load(Ordering::Relaxed)
    }

    pub fn proto_flows(&self, protocol: u8) -> u64 {
        self.proto_flows[protocol as usize].load(Ordering::Relaxed)
    }

    pub fn flow_packets(&self) -> u64 {
        self.flow_packets.load(Ordering::Relaxed)
    }

    pub fn total_flows(&self) -> u64 {
        self.total_flows.load(Ordering::Relaxed)
    }

    pub fn excluded_flows(&self) -> u64 {
        self.excluded_flows.load(Ordering::Relaxed)
    }

    pub fn new_flows(&self) -> u64 {
        self.new_flows.load(Ordering::Relaxed)
    }

    pub fn dup_flows(&self) -> u64 {
        self.dup_flows.load(Ordering::Relaxed)
    }

    /// Render the periodic console report, printed every `STATS_RATE`
    /// seconds, as structured log fields.
    pub fn log_report(&self, runtime_secs: u64) {
        let total = self.total_flows();
        if self.new_flows() == 0 {
            tracing::info!("no flows observed yet");
            return;
        }

        let runtime = runtime_secs.max(1) as f64;
        tracing::info!(
            runtime_secs,
            total_packets = self.flow_packets(),
            total_flows = total,
            packet_rate = self.flow_packets() as f64 / runtime,
            flow_rate = total as f64 / runtime,
            new_flow_rate = self.new_flows() as f64 / runtime,
            excluded_flows = self.excluded_flows(),
            excluded_pct = pct(self.excluded_flows(), total),
            current_flows = self.current_flows(),
            new_flows = self.new_flows(),
            new_flows_pct = pct(self.new_flows(), total),
            tcp_pct = pct(self.proto_flows(PROTO_TCP), self.new_flows()),
            udp_pct = pct(self.proto_flows(PROTO_UDP), self.new_flows()),
            icmp_pct = pct(self.proto_flows(PROTO_ICMP), self.new_flows()),
            igmp_pct = pct(self.proto_flows(PROTO_IGMP), self.new_flows()),
            ip_in_ip_pct = pct(self.proto_flows(PROTO_IP_IN_IP), self.new_flows()),
            gre_pct = pct(self.proto_flows(PROTO_GRE), self.new_flows()),
            esp_pct = pct(self.proto_flows(PROTO_ESP), self.new_flows()),
            ah_pct = pct(self.proto_flows(PROTO_AH), self.new_flows()),
            eigrp_pct = pct(self.proto_flows(PROTO_EIGRP), self.new_flows()),
            eth_in_ip_pct = pct(self.proto_flows(PROTO_ETH_IN_IP), self.new_flows()),
            pim_pct = pct(self.proto_flows(PROTO_PIM), self.new_flows()),
            six_in_four_pct = pct(self.proto_flows(PROTO_6IN4), self.new_flows()),
            "netflow collector stats"
        );
    }
}

fn pct(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_flow_updates_gauge_and_proto_counter() {
        let stats = Stats::new();
        stats.record_new_flow(PROTO_TCP);
        assert_eq!(stats.current_flows(), 1);
        assert_eq!(stats.new_flows(), 1);
        assert_eq!(stats.proto_flows(PROTO_TCP), 1);
    }

    #[test]
    fn eviction_decrements_gauge_only() {
        let stats = Stats::new();
        stats.record_new_flow(PROTO_UDP);
        stats.record_new_flow(PROTO_UDP);
        stats.record_evictions(2);
        assert_eq!(stats.current_flows(), 0);
        assert_eq!(stats.new_flows(), 2, "new_flows is monotonic, not affected by eviction");
    }

    #[test]
    fn gauge_can_go_negative_under_contention_per_design_notes() {
        let stats = Stats::new();
        stats.record_evictions(3);
        assert_eq!(stats.current_flows(), -3);
    }
}
