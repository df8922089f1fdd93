//! The single opaque collector value (§9: "naturally modeled as a single
//! opaque 'collector' value passed explicitly to ingest and janitor,
//! rather than as process-scope variables"). Bundles the shard array, the
//! read-only exclusion set, and the statistics counters.

use std::sync::Arc;

use crate::exclude::ExclusionSet;
use crate::flow::FlowIndex;
use crate::stats::Stats;

pub struct Collector {
    pub index: FlowIndex,
    pub exclusions: ExclusionSet,
    pub stats: Stats,
}

impl Collector {
    pub fn new(n_shards: usize, exclusions: ExclusionSet) -> Arc<Self> {
        Arc::new(Self {
            index: FlowIndex::new(n_shards),
            exclusions,
            stats: Stats::new(),
        })
    }
}
