//! Headless runner: drives the world until it reaches its step limit, the
//! population dies out, an interrupt arrives or the engine fails.

pub mod shutdown;

pub use shutdown::ShutdownManager;

use crate::model::config::AppConfig;
use crate::model::world::World;
use anyhow::Result;
use chrono::{DateTime, Utc};
use cogverse_core::metrics::Metrics;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    StepLimit,
    Extinction,
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopReason::StepLimit => "step limit reached",
            StopReason::Extinction => "population extinct",
            StopReason::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Ticks between status reports; 0 disables them.
    pub status_interval: u64,
    /// Emit status reports as JSON lines instead of text.
    pub json: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            status_interval: 100,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub config_fingerprint: String,
    pub started_at: String,
    pub finished_at: String,
    pub steps: u64,
    pub population: usize,
    pub births: u64,
    pub deaths: u64,
    pub known_traits: usize,
    pub signal_events: usize,
    pub reason: StopReason,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "run {} ({})", self.run_id, self.reason)?;
        writeln!(
            f,
            "  {} steps from {} to {}",
            self.steps, self.started_at, self.finished_at
        )?;
        write!(
            f,
            "  population {}  births {}  deaths {}  cultural traits {}  emergence events {}",
            self.population, self.births, self.deaths, self.known_traits, self.signal_events
        )
    }
}

pub struct App {
    pub world: World,
    pub shutdown: ShutdownManager,
    pub options: RunOptions,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    metrics: Arc<Metrics>,
    fingerprint: String,
}

impl App {
    pub fn new(config: AppConfig, options: RunOptions) -> Result<Self> {
        let fingerprint = config.fingerprint();
        let metrics = Arc::new(Metrics::new());
        let world = World::with_metrics(config, Arc::clone(&metrics))?;
        let run_id = Uuid::new_v4();
        tracing::info!(
            run_id = %run_id,
            seed = world.seed,
            fingerprint = %fingerprint,
            "Run created"
        );
        Ok(Self {
            world,
            shutdown: ShutdownManager::new(),
            options,
            run_id,
            started_at: Utc::now(),
            metrics,
            fingerprint,
        })
    }

    /// Ticks until a stop condition holds. Interrupts are honored between
    /// ticks only; engine faults end the run with an error.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let reason = loop {
            if self.shutdown.is_shutdown_requested() {
                break StopReason::Interrupted;
            }
            if self.world.time.finished() {
                break StopReason::StepLimit;
            }
            if self.world.population() == 0 {
                break StopReason::Extinction;
            }

            let started = Instant::now();
            let outcome = self.world.step().map_err(|e| {
                tracing::error!(error = %e, step = ?e.step(), "Engine failure, run halted");
                e
            })?;

            if self.options.status_interval > 0
                && (outcome.tick + 1) % self.options.status_interval == 0
            {
                self.print_status()?;
            }

            match self.world.time.remaining_budget(started.elapsed()) {
                Some(left) if !left.is_zero() => tokio::time::sleep(left).await,
                _ => tokio::task::yield_now().await,
            }
        };

        if reason == StopReason::Interrupted {
            self.shutdown.set_exit_code(130);
        }
        self.metrics.log_summary();
        let summary = self.summary(reason);
        tracing::info!(
            run_id = %summary.run_id,
            reason = %reason,
            steps = summary.steps,
            ticks_per_second = self.world.time.achieved_fps(),
            "Run stopped"
        );
        Ok(summary)
    }

    fn print_status(&self) -> Result<()> {
        let status = self.world.status();
        if self.options.json {
            println!("{}", serde_json::to_string(&status)?);
        } else {
            println!("{status}");
        }
        Ok(())
    }

    pub fn summary(&self, reason: StopReason) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            config_fingerprint: self.fingerprint.clone(),
            started_at: self.started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
            steps: self.world.tick(),
            population: self.world.population(),
            births: self.metrics.births(),
            deaths: self.metrics.deaths(),
            known_traits: self.world.culture.len(),
            signal_events: self.world.observer.history().len(),
            reason,
        }
    }
}
