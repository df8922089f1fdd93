//! Ingest path (§4.D): consumes one normalized record at a time, applies
//! exclusions, and routes into the sharded flow index.

use std::net::{SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, warn};

use crate::collector::Collector;
use crate::decode::{self, NetflowVersion, NormalizedRecord};
use crate::flow::{FlowSummary, ProbeResult};

/// Apply one normalized record to the collector (§4.D, steps 1–7). This is
/// the pure, synchronous core of ingest — no I/O, no suspension — so it
/// can be unit tested directly against a `Collector` without a socket.
pub fn ingest_record(collector: &Collector, record: &NormalizedRecord) {
    collector.stats.record_total_flow();

    if collector.exclusions.contains(record.src_addr) || collector.exclusions.contains(record.dst_addr) {
        collector.stats.record_excluded();
        return;
    }

    let key = record.key();
    let protocol = record.protocol;

    match collector.index.probe_or_insert(
        key,
        || {
            let mut summary = FlowSummary::from_record(record);
            summary.update_source(record);
            summary
        },
        |existing| existing.merge(record),
    ) {
        ProbeResult::Inserted => collector.stats.record_new_flow(protocol),
        ProbeResult::Merged => collector.stats.record_dup_flow(),
    }
}

/// The blocking UDP receive loop (§5: "socket receive (blocking with a
/// short poll timeout), then purely CPU-bound per record, then one shard
/// lock acquisition per record"). Runs until `shutdown` is observed.
///
/// `SO_RCVTIMEO` (set via [`UdpSocket::set_read_timeout`]) gives this loop
/// a short poll timeout so it wakes up periodically to check `shutdown`
/// even with no traffic arriving.
pub fn run_ingest_loop(
    collector: Arc<Collector>,
    socket: UdpSocket,
    shutdown: Arc<AtomicBool>,
    clock: Arc<dyn crate::clock::Clock>,
) {
    socket
        .set_read_timeout(Some(Duration::from_millis(100)))
        .expect("setting read timeout must succeed on a valid socket");

    let mut buf = [0u8; 65_535];
    while !shutdown.load(Ordering::Relaxed) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(ok) => ok,
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                continue;
            }
            Err(e) => {
                warn!(error = %e, "netflow listen socket recv error");
                continue;
            }
        };

        collector.stats.record_packet();
        let recv_time = clock.now_secs();
        let peer_addr: u32 = match peer {
            std::net::SocketAddr::V4(v4) => u32::from(*v4.ip()),
            std::net::SocketAddr::V6(_) => {
                debug!("ignoring datagram from an IPv6 peer (IPv6 is a non-goal)");
                continue;
            }
        };

        match decode::decode(&buf[..len], peer_addr, recv_time) {
            Ok(records) => {
                for record in &records {
                    ingest_record(&collector, record);
                }
            }
            Err(e) => {
                debug!(error = %e, len, "dropping undecodable datagram");
            }
        }
    }
}

/// Bind the listen socket with the configured receive-buffer target size.
/// Buffer sizing failures are logged but not fatal — the kernel default is
/// used instead.
pub fn bind_listen_socket(addr: SocketAddrV4, target_buffer_bytes: usize) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.bind(&std::net::SocketAddr::V4(addr).into())?;
    if let Err(e) = socket.set_recv_buffer_size(target_buffer_bytes) {
        warn!(error = %e, target_buffer_bytes, "could not set listen socket receive buffer size");
    }
    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclude::ExclusionSet;

    fn record(exporter: u32, sp: u16) -> NormalizedRecord {
        NormalizedRecord {
            version: NetflowVersion::V5,
            exporter,
            recv_time: 1000,
            src_int: 1,
            dst_int: 2,
            src_addr: 0x0A000001,
            dst_addr: 0x0A000002,
            protocol: 6,
            src_port: sp,
            dst_port: 80,
            tcp_flags: 0x02,
            num_packets: 5,
            num_bytes: 500,
            start_time: 100,
            end_time: 100,
        }
    }

    #[test]
    fn new_record_creates_summary_with_one_source() {
        let collector = Collector::new(16, ExclusionSet::new());
        ingest_record(&collector, &record(0xC0000201, 1234));

        assert_eq!(collector.index.count(), 1);
        assert_eq!(collector.stats.new_flows(), 1);
        assert_eq!(collector.stats.dup_flows(), 0);
    }

    #[test]
    fn duplicate_record_merges_not_inserts() {
        let collector = Collector::new(16, ExclusionSet::new());
        ingest_record(&collector, &record(0xC0000201, 1234));
        ingest_record(&collector, &record(0xC0000201, 1234));

        assert_eq!(collector.index.count(), 1);
        assert_eq!(collector.stats.new_flows(), 1);
        assert_eq!(collector.stats.dup_flows(), 1);
    }

    #[test]
    fn excluded_source_never_reaches_the_index() {
        let mut exclusions = ExclusionSet::new();
        exclusions.add(0x0A000001, 0x0A000001).unwrap();
        let collector = Collector::new(16, exclusions);

        ingest_record(&collector, &record(0xC0000201, 1234));

        assert_eq!(collector.index.count(), 0);
        assert_eq!(collector.stats.excluded_flows(), 1);
        assert_eq!(collector.stats.total_flows(), 1);
    }

    #[test]
    fn exclusion_insensitivity_for_unrelated_workload() {
        let collector_plain = Collector::new(16, ExclusionSet::new());
        ingest_record(&collector_plain, &record(0xC0000201, 1234));

        let mut exclusions = ExclusionSet::new();
        exclusions.add(0x2C000000, 0x2CFFFFFF).unwrap(); // 44.0.0.0/8, unrelated
        let collector_excluded = Collector::new(16, exclusions);
        ingest_record(&collector_excluded, &record(0xC0000201, 1234));

        assert_eq!(collector_plain.index.count(), collector_excluded.index.count());
        assert_eq!(collector_plain.stats.excluded_flows(), 0);
        assert_eq!(collector_excluded.stats.excluded_flows(), 0);
    }
}
