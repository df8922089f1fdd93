//! NetFlow v5 wire decoding (§6 Input).
//!
//! A 24-byte header followed by `flow_count` 48-byte records, all fields
//! big-endian on the wire.

use super::record::{NetflowVersion, NormalizedRecord};
use super::DecodeError;

pub const HEADER_LEN: usize = 24;
pub const RECORD_LEN: usize = 48;

struct Header {
    uptime_millis: u32,
    unix_secs: u32,
    flow_count: u16,
}

fn parse_header(buf: &[u8]) -> Result<Header, DecodeError> {
    if buf.len() < HEADER_LEN {
        return Err(DecodeError::Truncated {
            needed: HEADER_LEN,
            got: buf.len(),
        });
    }
    let version = u16::from_be_bytes([buf[0], buf[1]]);
    if version != 5 {
        return Err(DecodeError::WrongVersion {
            expected: 5,
            got: version,
        });
    }
    Ok(Header {
        flow_count: u16::from_be_bytes([buf[2], buf[3]]),
        uptime_millis: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        unix_secs: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
    })
}

/// `curtime - ((uptime - record_ts) / 1000)`: converts a router-uptime-relative
/// millisecond timestamp to wall-clock seconds.
fn absolute_time(unix_secs: u32, uptime_millis: u32, record_millis: u32) -> u64 {
    let delta_secs = uptime_millis.wrapping_sub(record_millis) / 1000;
    unix_secs.wrapping_sub(delta_secs) as u64
}

pub fn decode(buf: &[u8], exporter: u32, recv_time: u64) -> Result<Vec<NormalizedRecord>, DecodeError> {
    let header = parse_header(buf)?;
    let count = header.flow_count as usize;
    let expected_len = HEADER_LEN + count * RECORD_LEN;
    if buf.len() != expected_len {
        return Err(DecodeError::SizeMismatch {
            flow_count: header.flow_count,
            got: buf.len(),
            expected: expected_len,
        });
    }

    let mut records = Vec::with_capacity(count);
    for i in 0..count {
        let off = HEADER_LEN + i * RECORD_LEN;
        let r = &buf[off..off + RECORD_LEN];

        let src_addr = u32::from_be_bytes([r[0], r[1], r[2], r[3]]);
        let dst_addr = u32::from_be_bytes([r[4], r[5], r[6], r[7]]);
        let src_int = u16::from_be_bytes([r[12], r[13]]);
        let dst_int = u16::from_be_bytes([r[14], r[15]]);
        let num_packets = u32::from_be_bytes([r[16], r[17], r[18], r[19]]) as u64;
        let num_bytes = u32::from_be_bytes([r[20], r[21], r[22], r[23]]) as u64;
        let rec_start = u32::from_be_bytes([r[24], r[25], r[26], r[27]]);
        let rec_end = u32::from_be_bytes([r[28], r[29], r[30], r[31]]);
        let src_port = u16::from_be_bytes([r[32], r[33]]);
        let dst_port = u16::from_be_bytes([r[34], r[35]]);
        let tcp_flags = r[37];
        let protocol = r[38];

        records.push(NormalizedRecord {
            version: NetflowVersion::V5,
            exporter,
            recv_time,
            src_int,
            dst_int,
            src_addr,
            dst_addr,
            protocol,
            src_port,
            dst_port,
            tcp_flags,
            num_packets,
            num_bytes,
            start_time: absolute_time(header.unix_secs, header.uptime_millis, rec_start),
            end_time: absolute_time(header.unix_secs, header.uptime_millis, rec_end),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn build_packet(src: Ipv4Addr, dst: Ipv4Addr, num_packets: u32, num_bytes: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + RECORD_LEN);
        buf.extend_from_slice(&5u16.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&10_000u32.to_be_bytes()); // uptime
        buf.extend_from_slice(&1_700_000_000u32.to_be_bytes()); // unix_secs
        buf.extend_from_slice(&0u32.to_be_bytes()); // nsec
        buf.extend_from_slice(&42u32.to_be_bytes()); // flow_sequence
        buf.push(0);
        buf.push(0);
        buf.extend_from_slice(&0u16.to_be_bytes());

        buf.extend_from_slice(&src.octets());
        buf.extend_from_slice(&dst.octets());
        buf.extend_from_slice(&Ipv4Addr::UNSPECIFIED.octets()); // next_hop
        buf.extend_from_slice(&1u16.to_be_bytes()); // input
        buf.extend_from_slice(&2u16.to_be_bytes()); // output
        buf.extend_from_slice(&num_packets.to_be_bytes());
        buf.extend_from_slice(&num_bytes.to_be_bytes());
        buf.extend_from_slice(&9_000u32.to_be_bytes()); // start (uptime-relative ms)
        buf.extend_from_slice(&9_500u32.to_be_bytes()); // end
        buf.extend_from_slice(&12345u16.to_be_bytes());
        buf.extend_from_slice(&80u16.to_be_bytes());
        buf.push(0);
        buf.push(0x02);
        buf.push(6);
        buf.push(0);
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.push(24);
        buf.push(24);
        buf.extend_from_slice(&0u16.to_be_bytes());

        buf
    }

    #[test]
    fn decodes_single_record() {
        let pkt = build_packet(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), 5, 500);
        let records = decode(&pkt, 0xC0000201, 1_700_000_100).expect("should decode");
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.src_addr, u32::from(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(r.dst_addr, u32::from(Ipv4Addr::new(10, 0, 0, 2)));
        assert_eq!(r.protocol, 6);
        assert_eq!(r.src_port, 12345);
        assert_eq!(r.dst_port, 80);
        assert_eq!(r.num_packets, 5);
        assert_eq!(r.num_bytes, 500);
        assert_eq!(r.tcp_flags, 0x02);
    }

    #[test]
    fn rejects_wrong_version() {
        let mut pkt = build_packet(Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(2, 2, 2, 2), 1, 1);
        pkt[1] = 9;
        assert!(matches!(
            decode(&pkt, 0, 0),
            Err(DecodeError::WrongVersion { expected: 5, got: 9 })
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        let buf = vec![0u8; 10];
        assert!(matches!(decode(&buf, 0, 0), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn rejects_size_mismatch() {
        let pkt = build_packet(Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(2, 2, 2, 2), 1, 1);
        let truncated = &pkt[..pkt.len() - 10];
        assert!(matches!(
            decode(truncated, 0, 0),
            Err(DecodeError::SizeMismatch { .. })
        ));
    }
}
