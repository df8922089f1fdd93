//! NetFlow v7 wire decoding (§6 Input).
//!
//! Same record shape as v5 with a slightly different header (no sampling
//! fields, a `reserved` word instead) and a per-record `flow_src` field
//! that supersedes the packet's source address as the exporter identity.

use super::record::{NetflowVersion, NormalizedRecord};
use super::DecodeError;

pub const HEADER_LEN: usize = 24;
pub const RECORD_LEN: usize = 52;

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
    if version != 7 {
        return Err(DecodeError::WrongVersion {
            expected: 7,
            got: version,
        });
    }
    Ok(Header {
        flow_count: u16::from_be_bytes([buf[2], buf[3]]),
        uptime_millis: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        unix_secs: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
    })
}

fn absolute_time(unix_secs: u32, uptime_millis: u32, record_millis: u32) -> u64 {
    let delta_secs = uptime_millis.wrapping_sub(record_millis) / 1000;
    unix_secs.wrapping_sub(delta_secs) as u64
}

pub fn decode(buf: &[u8], recv_time: u64) -> Result<Vec<NormalizedRecord>, DecodeError> {
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
        let flow_src = u32::from_be_bytes([r[48], r[49], r[50], r[51]]);

        records.push(NormalizedRecord {
            version: NetflowVersion::V7,
            exporter: flow_src,
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
