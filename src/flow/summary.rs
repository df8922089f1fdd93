//! Flow summary and per-exporter source list (§3, §4.C).

use super::key::FlowKey;
use crate::decode::record::{NetflowVersion, NormalizedRecord};

/// Per-exporter sub-summary. The source list is ordered by exporter
/// address ascending and the exporter address is unique within the list
/// (§3). Kept as a `Vec` rather than a singly linked list — `source_count`
/// is small in practice (§4.C), so a linear scan over a `Vec` has the same
/// asymptotics with far better cache behavior and no per-node allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub exporter: u32,
    pub src_int: u16,
    pub dst_int: u16,
    pub num_packets: u64,
    pub num_bytes: u64,
    pub num_flows: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSummary {
    pub key: FlowKey,
    /// Receive time of the record that created this summary. Immutable.
    pub time_added: u64,
    /// Receive time of the most recently merged record.
    pub time_updated: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub tcp_flags: u8,
    pub sources: Vec<SourceSummary>,
}

impl FlowSummary {
    /// Build the candidate summary for a fresh ingest (§4.D step 3), with
    /// an empty source list — the caller applies the first source-list
    /// update separately, same as every subsequent merge.
    pub fn from_record(record: &NormalizedRecord) -> Self {
        Self {
            key: record.key(),
            time_added: record.recv_time,
            time_updated: record.recv_time,
            start_time: record.start_time,
            end_time: record.end_time,
            tcp_flags: record.tcp_flags,
            sources: Vec::new(),
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Fold a record into an existing summary that shares its key (§4.C).
    /// `time_added` and identity fields are never touched.
    pub fn merge(&mut self, record: &NormalizedRecord) {
        self.tcp_flags |= record.tcp_flags;
        self.start_time = self.start_time.min(record.start_time);
        self.end_time = self.end_time.max(record.end_time);
        self.time_updated = record.recv_time;
        self.update_source(record);
    }

    /// Walk the ascending-exporter source list, updating an existing entry
    /// or splicing a new one in at the point where ordering is preserved
    /// (§4.C). Also used for the first record of a newly created summary.
    pub fn update_source(&mut self, record: &NormalizedRecord) {
        match self
            .sources
            .binary_search_by(|s| s.exporter.cmp(&record.exporter))
        {
            Ok(idx) => {
                let entry = &mut self.sources[idx];
                entry.num_packets += record.num_packets;
                entry.num_bytes += record.num_bytes;
                entry.num_flows += 1;
            }
            Err(idx) => {
                self.sources.insert(
                    idx,
                    SourceSummary {
                        exporter: record.exporter,
                        src_int: record.src_int,
                        dst_int: record.dst_int,
                        num_packets: record.num_packets,
                        num_bytes: record.num_bytes,
                        num_flows: 1,
                    },
                );
            }
        }
    }
}
