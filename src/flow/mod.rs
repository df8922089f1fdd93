//! Flow identity, in-memory summaries, and the sharded index that holds
//! them (§3, §4.B, §4.C).

pub mod key;
pub mod shard;
pub mod summary;

pub use key::{shard_hash, FlowKey};
pub use shard::{FlowIndex, ProbeResult};
pub use summary::{FlowSummary, SourceSummary};
