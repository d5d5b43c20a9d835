//! Read statistics: hit/miss counts and cumulative latency
//!
//! Averages and throughput are derived on demand from the totals. With no
//! observations they are `None`, never zero.
//!
//! Recording is lock-free between recorders. Snapshots and resets exclude
//! recorders, so a count is never observed without its latency.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;

/// Concurrent accumulator of read latency samples
#[derive(Debug, Default)]
pub struct StatsTracker {
    /// Shared by recorders, exclusive for snapshot and reset
    gate: RwLock<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    hit_nanos: AtomicU64,
    miss_nanos: AtomicU64,
}

impl StatsTracker {
    /// Create a zeroed tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read resolved from the hot tier
    pub fn record_hit(&self, elapsed: Duration) {
        let _shared = self.gate.read();
        self.hit_nanos.fetch_add(nanos(elapsed), Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a read resolved from the durable tier
    pub fn record_miss(&self, elapsed: Duration) {
        let _shared = self.gate.read();
        self.miss_nanos.fetch_add(nanos(elapsed), Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Total hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        let _exclusive = self.gate.write();
        StatsSnapshot {
            hit_count: self.hits(),
            miss_count: self.misses(),
            hit_total_time_ms: millis(self.hit_nanos.load(Ordering::Relaxed)),
            miss_total_time_ms: millis(self.miss_nanos.load(Ordering::Relaxed)),
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        let _exclusive = self.gate.write();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.hit_nanos.store(0, Ordering::Relaxed);
        self.miss_nanos.store(0, Ordering::Relaxed);
    }
}

fn nanos(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

fn millis(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

/// Counters captured by [`StatsTracker::snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Reads served by the hot tier
    pub hit_count: u64,
    /// Reads that fell back to the durable tier
    pub miss_count: u64,
    /// Cumulative backend time spent on hits
    pub hit_total_time_ms: f64,
    /// Cumulative backend time spent on misses
    pub miss_total_time_ms: f64,
}

impl StatsSnapshot {
    /// Mean latency of a hit, undefined before the first hit
    pub fn hit_avg_time_ms(&self) -> Option<f64> {
        average(self.hit_total_time_ms, self.hit_count)
    }

    /// Mean latency of a miss, undefined before the first miss
    pub fn miss_avg_time_ms(&self) -> Option<f64> {
        average(self.miss_total_time_ms, self.miss_count)
    }

    /// Hits per second at the mean hit latency
    pub fn hit_ops_per_sec(&self) -> Option<f64> {
        throughput(self.hit_avg_time_ms())
    }

    /// Misses per second at the mean miss latency
    pub fn miss_ops_per_sec(&self) -> Option<f64> {
        throughput(self.miss_avg_time_ms())
    }

    /// Reads counted in either bucket
    pub fn total_reads(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    /// Fraction of reads served by the hot tier (0.0 with no reads)
    pub fn hit_ratio(&self) -> f64 {
        match self.total_reads() {
            0 => 0.0,
            total => self.hit_count as f64 / total as f64,
        }
    }
}

fn average(total_ms: f64, count: u64) -> Option<f64> {
    (count > 0).then(|| total_ms / count as f64)
}

fn throughput(avg_ms: Option<f64>) -> Option<f64> {
    avg_ms.filter(|avg| *avg > 0.0).map(|avg| 1000.0 / avg)
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
        }
        write!(
            f,
            "hit_count={} miss_count={} hit_avg_time_ms={} miss_avg_time_ms={} \
             hit_ops_per_sec={} miss_ops_per_sec={}",
            self.hit_count,
            self.miss_count,
            opt(self.hit_avg_time_ms()),
            opt(self.miss_avg_time_ms()),
            opt(self.hit_ops_per_sec()),
            opt(self.miss_ops_per_sec()),
        )
    }
}
