//! The eviction sweeper (§4.E): periodically walks every shard, evicting
//! flows that are either idle or simply old, and hands each evicted
//! summary to the configured [`Emitter`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::collector::Collector;
use crate::emit::Emitter;

/// `true` iff `summary` should be evicted on this sweep (§4.E):
/// idle-out (no record seen for `min_flow_age` seconds) OR hard-out
/// (the flow has existed for `max_flow_age` seconds regardless of
/// recent activity). Hard-out dominates idle-out — a flow kept alive by
/// continuous traffic is still evicted once it's old enough (§8
/// Scenario 6).
fn should_evict(
    summary: &crate::flow::FlowSummary,
    now: u64,
    min_flow_age_secs: u64,
    max_flow_age_secs: u64,
) -> bool {
    let idle_out = now.saturating_sub(summary.time_updated) > min_flow_age_secs;
    let hard_out = now.saturating_sub(summary.time_added) > max_flow_age_secs;
    idle_out || hard_out
}

/// One full sweep: every shard, in order, each under its own lock for the
/// duration of its pass (§4.B `iterate_and_evict`). Returns the number of
/// flows evicted, which the caller feeds to [`crate::stats::Stats::record_evictions`].
pub fn sweep_once(
    collector: &Collector,
    emitter: &dyn Emitter,
    now: u64,
    min_flow_age_secs: u64,
    max_flow_age_secs: u64,
) -> u64 {
    let mut evicted_count = 0u64;
    for shard_idx in 0..collector.index.shard_count() {
        collector.index.iterate_and_evict(
            shard_idx,
            |summary| should_evict(summary, now, min_flow_age_secs, max_flow_age_secs),
            |summary| {
                evicted_count += 1;
                emitter.emit(&summary);
            },
        );
    }
    collector.stats.record_evictions(evicted_count);
    evicted_count
}

/// The janitor's run loop (§4.E, §5: "one OS thread woken periodically,
/// interruptible on shutdown rather than sleeping through it"). Sleeps in
/// short slices so `shutdown` is checked at sub-second granularity instead
/// of blocking for the full `sweep_interval`.
pub fn run_janitor_loop(
    collector: Arc<Collector>,
    emitter: Arc<dyn Emitter>,
    clock: Arc<dyn Clock>,
    shutdown: Arc<AtomicBool>,
    min_flow_age_secs: u64,
    max_flow_age_secs: u64,
    sweep_interval_secs: u64,
    stats_rate_secs: u64,
) {
    let start = clock.now_secs();
    let mut next_sweep = start;
    let mut next_report = start;

    while !shutdown.load(Ordering::Relaxed) {
        let now = clock.now_secs();

        if now >= next_sweep {
            let evicted = sweep_once(&collector, emitter.as_ref(), now, min_flow_age_secs, max_flow_age_secs);
            if evicted > 0 {
                debug!(evicted, "janitor sweep evicted flows");
            }
            next_sweep = now + sweep_interval_secs.max(1);
        }

        if now >= next_report {
            collector.stats.log_report(now.saturating_sub(start));
            next_report = now + stats_rate_secs.max(1);
        }

        std::thread::sleep(Duration::from_millis(100));
    }
}
