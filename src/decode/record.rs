//! The normalized flow record (§3) — the decoder's output and the ingest
//! path's input. All addresses/ports are host byte order by the time a
//! `NormalizedRecord` exists; byte-order conversion is the decoder's job.

use crate::flow::key::FlowKey;

/// Which wire format produced this record. Carried only for diagnostics —
/// it plays no role in flow identity or aggregation (§3 [SUPPLEMENT]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetflowVersion {
    V5,
    V7,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub version: NetflowVersion,
    pub exporter: u32,
    pub recv_time: u64,
    pub src_int: u16,
    pub dst_int: u16,
    pub src_addr: u32,
    pub dst_addr: u32,
    pub protocol: u8,
    pub src_port: u16,
    pub dst_port: u16,
    pub tcp_flags: u8,
    pub num_packets: u64,
    pub num_bytes: u64,
    pub start_time: u64,
    pub end_time: u64,
}

impl NormalizedRecord {
    pub fn key(&self) -> FlowKey {
        FlowKey {
            protocol: self.protocol,
            src_addr: self.src_addr,
            dst_addr: self.dst_addr,
            src_port: self.src_port,
            dst_port: self.dst_port,
        }
    }
}
