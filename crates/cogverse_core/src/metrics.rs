//! Run counters and logging setup.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Ticks between periodic summaries.
pub const SUMMARY_INTERVAL: u64 = 1000;

/// Counters shared between the engine and the runner.
pub struct Metrics {
    tick_count: AtomicU64,
    population: AtomicU64,
    resource_count: AtomicU64,
    births: AtomicU64,
    deaths: AtomicU64,
    numeric_faults: AtomicU64,
    pub counters: Mutex<BTreeMap<String, u64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            population: AtomicU64::new(0),
            resource_count: AtomicU64::new(0),
            births: AtomicU64::new(0),
            deaths: AtomicU64::new(0),
            numeric_faults: AtomicU64::new(0),
            counters: Mutex::new(BTreeMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick with its duration.
    pub fn record_tick(
        &self,
        duration: Duration,
        population: usize,
        resources: usize,
        births: usize,
        deaths: usize,
    ) {
        let tick = self.tick_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.population.store(population as u64, Ordering::Relaxed);
        self.resource_count.store(resources as u64, Ordering::Relaxed);
        self.births.fetch_add(births as u64, Ordering::Relaxed);
        self.deaths.fetch_add(deaths as u64, Ordering::Relaxed);

        if tick % SUMMARY_INTERVAL == 0 {
            tracing::info!(
                tick,
                population,
                resources,
                births = self.births(),
                deaths = self.deaths(),
                duration_ms = duration.as_millis() as u64,
                "Simulation tick"
            );
        }
    }

    pub fn record_fault(&self) {
        self.numeric_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments a named counter.
    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        *counters.entry(name.to_string()).or_insert(0) += 1;
    }

    #[must_use]
    pub fn counter(&self, name: &str) -> u64 {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.get(name).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn population(&self) -> u64 {
        self.population.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn births(&self) -> u64 {
        self.births.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn deaths(&self) -> u64 {
        self.deaths.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn numeric_faults(&self) -> u64 {
        self.numeric_faults.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs the end-of-run summary.
    pub fn log_summary(&self) {
        tracing::info!(
            ticks = self.tick_count(),
            population = self.population(),
            resources = self.resource_count.load(Ordering::Relaxed),
            births = self.births(),
            deaths = self.deaths(),
            numeric_faults = self.numeric_faults(),
            elapsed_ms = self.elapsed().as_millis() as u64,
            "Run finished"
        );
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `level`; a second
/// call is a no-op.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .finish(),
    )
    .ok();
}
