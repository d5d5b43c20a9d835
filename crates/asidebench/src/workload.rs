//! Load phases driven against a cache orchestrator

use std::sync::atomic::{AtomicU64, Ordering};

use asidecache::{CacheOrchestrator, DocumentStore, KeyValueStore, StatsSnapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Shape of the generated load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    /// Keys `1..=messages` are written and read
    pub messages: u64,
    /// Bytes per value
    pub message_size: usize,
    /// Threads sharing each phase
    pub workers: usize,
    /// Seed for the random-read key sequence
    pub seed: u64,
}

/// Statistics captured at the end of a phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport {
    pub phase: &'static str,
    pub info: StatsSnapshot,
    pub resident: u64,
    pub total: u64,
    pub message_size: usize,
}

impl PhaseReport {
    /// Hit throughput in bytes per second
    pub fn hit_bytes_per_sec(&self) -> Option<f64> {
        self.info.hit_ops_per_sec().map(|ops| ops * self.message_size as f64)
    }

    /// Miss throughput in bytes per second
    pub fn miss_bytes_per_sec(&self) -> Option<f64> {
        self.info.miss_ops_per_sec().map(|ops| ops * self.message_size as f64)
    }

    pub fn print(&self) {
        fn rate(value: Option<f64>) -> String {
            value.map_or_else(|| "-".to_string(), |v| format!("{:.0}", v))
        }
        let pct = if self.total == 0 {
            0.0
        } else {
            self.resident as f64 * 100.0 / self.total as f64
        };
        println!("\n== {}", self.phase);
        println!("   {}", self.info);
        println!("   Cache hit throughput:  {} [bytes/sec]", rate(self.hit_bytes_per_sec()));
        println!("   Cache miss throughput: {} [bytes/sec]", rate(self.miss_bytes_per_sec()));
        println!("   Resident keys:         {}/{} ({:.1}%)", self.resident, self.total, pct);
    }
}

impl Workload {
    /// Flush, then run sequential write, sequential read and random read.
    ///
    /// Statistics are reset before each phase. The store is not cleared, so
    /// data from earlier runs survives.
    pub fn run<K, D>(&self, cache: &CacheOrchestrator<K, D>) -> asidecache::Result<Vec<PhaseReport>>
    where
        K: KeyValueStore,
        D: DocumentStore,
    {
        let message = "0".repeat(self.message_size);
        let sequential: Vec<u64> = (1..=self.messages).collect();
        let mut reports = Vec::with_capacity(4);

        cache.flush()?;
        cache.reset_info();
        reports.push(self.report("start", cache)?);

        cache.reset_info();
        self.drive("sequential write", cache, &sequential, |key| {
            cache.write(key, &message).map(drop)
        })?;
        reports.push(self.report("sequential write", cache)?);

        cache.reset_info();
        self.drive("sequential read", cache, &sequential, |key| cache.read(key).map(drop))?;
        reports.push(self.report("sequential read", cache)?);

        cache.reset_info();
        let random = self.random_keys();
        self.drive("random read", cache, &random, |key| cache.read(key).map(drop))?;
        reports.push(self.report("random read", cache)?);

        Ok(reports)
    }

    fn random_keys(&self) -> Vec<u64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.messages)
            .map(|_| rng.random_range(1..=self.messages.max(1)))
            .collect()
    }

    fn drive<K, D, F>(
        &self,
        phase: &'static str,
        cache: &CacheOrchestrator<K, D>,
        keys: &[u64],
        op: F,
    ) -> asidecache::Result<()>
    where
        K: KeyValueStore,
        D: DocumentStore,
        F: Fn(&str) -> asidecache::Result<()> + Sync,
    {
        if keys.is_empty() {
            return Ok(());
        }
        info!(phase, keys = keys.len(), workers = self.workers, "starting phase");

        let total = keys.len() as u64;
        let step = (total / 10).max(1);
        let chunk = keys.len().div_ceil(self.workers.max(1));
        let done = AtomicU64::new(0);
        let (op, done) = (&op, &done);

        std::thread::scope(|s| {
            let workers: Vec<_> = keys
                .chunks(chunk)
                .map(|slice| {
                    s.spawn(move || -> asidecache::Result<()> {
                        for key in slice {
                            op(&key.to_string())?;
                            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                            if n % step == 0 {
                                info!(phase, progress = n * 100 / total, stats = %cache.info(), "progress");
                            }
                        }
                        Ok(())
                    })
                })
                .collect();

            workers
                .into_iter()
                .map(|worker| worker.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect::<asidecache::Result<()>>()
        })
    }

    fn report<K, D>(
        &self,
        phase: &'static str,
        cache: &CacheOrchestrator<K, D>,
    ) -> asidecache::Result<PhaseReport>
    where
        K: KeyValueStore,
        D: DocumentStore,
    {
        let info = cache.info();
        let mut resident = 0;
        for key in 1..=self.messages {
            if cache.is_cached(&key.to_string())? {
                resident += 1;
            }
        }
        Ok(PhaseReport {
            phase,
            info,
            resident,
            total: self.messages,
            message_size: self.message_size,
        })
    }
}
