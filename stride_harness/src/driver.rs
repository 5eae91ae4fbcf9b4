//! Experiment driver - runs the evaluation matrix end to end.
//!
//! ```text
//! for each scenario point (R, C, S):
//!     provision sender + receiver environments
//!     evict once
//!     for each pattern:
//!         for rep in 1..=N:
//!             [evict if should_evict(R, rep)]
//!             send -> settle -> receive -> score -> append row -> settle
//!     tear down both environments   (on every exit path)
//! ```
//!
//! Execution is strictly sequential; rows are appended in exactly the order
//! transmissions run.

use crate::config::{HarnessConfig, ScenarioPoint};
use crate::error::HarnessError;
use crate::eviction::should_evict;
use crate::interrupt::Interrupt;
use crate::patterns::{generate_patterns, Pattern};
use crate::result_log::{ResultLog, TransmissionRecord};
use crate::scoring::bit_errors;
use crate::transport::Transport;

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use stride_env::{CacheEvictor, EnvironmentBackend, EnvironmentHandle, HarnessClock, TokioClock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const RULE: &str = "══════════════════════════════════════════════════════════════════════";

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Identifier of this run
    pub run_id: Uuid,

    /// Scenario points executed
    pub scenarios: usize,

    /// Rows appended to the result log
    pub transmissions: u64,

    /// Transmissions received without a single bit error
    pub error_free: u64,

    /// Wall time of the whole run in seconds
    pub duration_secs: f64,

    /// Result log location
    pub output_path: PathBuf,

    /// Pattern seed, if any
    pub seed: Option<u64>,
}

/// Both environments of one scenario.
struct ScenarioEnvironments {
    sender: EnvironmentHandle,
    receiver: EnvironmentHandle,
}

/// Fixed facts about the run, shared by every scenario.
struct RunPlan {
    experiment_start: f64,
    total_scenarios: usize,
    total_transmissions: u64,
}

/// Sequences scenarios, patterns and repetitions against the agents.
pub struct ExperimentDriver {
    /// Immutable run configuration
    config: HarnessConfig,

    /// Environment lifecycle
    backend: Arc<dyn EnvironmentBackend>,

    /// Agent round trips
    transport: Arc<dyn Transport>,

    /// Page cache eviction
    evictor: Arc<dyn CacheEvictor>,

    /// Settle delays and durations
    clock: Arc<dyn HarnessClock>,

    /// External cancellation
    interrupt: Interrupt,

    /// Fixed patterns replacing the generated ones
    patterns: Option<Vec<Pattern>>,

    /// Progress counters
    scenario_count: usize,
    transmission_count: u64,
    error_free_count: u64,
}

impl ExperimentDriver {
    /// Creates a driver. Fails if the configuration is invalid.
    pub fn new(
        config: HarnessConfig,
        backend: Arc<dyn EnvironmentBackend>,
        transport: Arc<dyn Transport>,
        evictor: Arc<dyn CacheEvictor>,
    ) -> Result<Self, HarnessError> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            transport,
            evictor,
            clock: Arc::new(TokioClock::new()),
            interrupt: Interrupt::never(),
            patterns: None,
            scenario_count: 0,
            transmission_count: 0,
            error_free_count: 0,
        })
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn HarnessClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the cancellation signal.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Transmits these patterns instead of generating them.
    ///
    /// Each must be `message_length` bits long.
    pub fn with_patterns(mut self, patterns: Vec<Pattern>) -> Result<Self, HarnessError> {
        if patterns.is_empty() {
            return Err(HarnessError::invalid("no patterns supplied"));
        }
        if let Some(p) = patterns.iter().find(|p| p.len() != self.config.message_length) {
            return Err(HarnessError::invalid(format!(
                "pattern {} has {} bits, expected {}",
                p.preview(16),
                p.len(),
                self.config.message_length
            )));
        }
        self.patterns = Some(patterns);
        Ok(self)
    }

    /// The configuration this driver runs.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Scenarios started so far.
    pub fn scenario_count(&self) -> usize {
        self.scenario_count
    }

    /// Transmissions started so far.
    pub fn transmission_count(&self) -> u64 {
        self.transmission_count
    }

    /// Runs the full matrix.
    ///
    /// On error or interrupt the in-flight scenario's environments are torn
    /// down first; rows already written stay in the log.
    pub async fn run(&mut self) -> Result<RunSummary, HarnessError> {
        let run_id = Uuid::new_v4();
        let started = self.clock.now();
        let experiment_start = self
            .clock
            .system_time()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        let patterns = match &self.patterns {
            Some(patterns) => patterns.clone(),
            None => generate_patterns(
                self.config.pattern_count,
                self.config.message_length,
                self.config.seed,
            )?,
        };
        let points = self.config.scenario_points();
        let plan = RunPlan {
            experiment_start,
            total_scenarios: points.len(),
            total_transmissions: self.config.total_transmissions(patterns.len()),
        };

        self.print_header(run_id, &patterns);
        let mut log = ResultLog::create(&self.config.output_path)?;

        for point in &points {
            if self.interrupt.is_fired() {
                return Err(HarnessError::Interrupted);
            }
            self.scenario_count += 1;

            info!("");
            info!("{}", RULE);
            info!("Scenario {}/{}:", self.scenario_count, plan.total_scenarios);
            info!("  R={} (evict every {})", point.evict_interval, point.evict_description());
            info!("  C={}", point.runtime);
            info!("  S={}", point.stride);
            info!("{}", RULE);

            self.run_scenario(point, &patterns, &mut log, &plan).await?;
            info!("Scenario {}/{} complete.", self.scenario_count, plan.total_scenarios);
        }

        let duration_secs = (self.clock.now() - started).as_secs_f64();
        let summary = RunSummary {
            run_id,
            scenarios: self.scenario_count,
            transmissions: log.rows_written(),
            error_free: self.error_free_count,
            duration_secs,
            output_path: self.config.output_path.clone(),
            seed: self.config.seed,
        };

        info!("");
        info!("{}", RULE);
        info!("Experiment complete!");
        info!("Total scenarios: {}", summary.scenarios);
        info!("Total duration: {:.2}s", summary.duration_secs);
        info!("Total transmissions: {}", summary.transmissions);
        info!("Error-free transmissions: {}", summary.error_free);
        info!("Results saved to: {}", summary.output_path.display());
        info!("{}", RULE);

        Ok(summary)
    }

    /// One scenario: provision, run the body, always tear down.
    async fn run_scenario(
        &mut self,
        point: &ScenarioPoint,
        patterns: &[Pattern],
        log: &mut ResultLog,
        plan: &RunPlan,
    ) -> Result<(), HarnessError> {
        let envs = self.provision(point).await?;

        let interrupt = self.interrupt.clone();
        let outcome = tokio::select! {
            biased;
            _ = interrupt.fired() => Err(HarnessError::Interrupted),
            result = self.scenario_body(point, patterns, &envs, log, plan) => result,
        };

        if let Err(e) = &outcome {
            warn!("Scenario {} aborted: {}", point, e);
        }
        let teardown = self.teardown(&envs).await;

        // The body's error wins over a teardown error.
        outcome.and(teardown)
    }

    async fn scenario_body(
        &mut self,
        point: &ScenarioPoint,
        patterns: &[Pattern],
        envs: &ScenarioEnvironments,
        log: &mut ResultLog,
        plan: &RunPlan,
    ) -> Result<(), HarnessError> {
        // Initial eviction, regardless of the interval.
        self.evict().await?;

        let settle = self.config.settle_delay();
        for pattern in patterns {
            info!("");
            info!("Pattern: {}", pattern.preview(50));

            for rep in 1..=self.config.repetitions {
                if self.interrupt.is_fired() {
                    return Err(HarnessError::Interrupted);
                }
                let record = self.transmit(point, pattern, rep, envs, plan).await?;
                // An agent killed by the same signal degrades to sentinels; drop that row.
                if self.interrupt.is_fired() {
                    return Err(HarnessError::Interrupted);
                }
                log.append(&record)?;
                self.clock.sleep(settle).await;
            }
        }
        Ok(())
    }

    /// One transmission: optional evict, send, settle, receive, score.
    async fn transmit(
        &mut self,
        point: &ScenarioPoint,
        pattern: &Pattern,
        rep: u32,
        envs: &ScenarioEnvironments,
        plan: &RunPlan,
    ) -> Result<TransmissionRecord, HarnessError> {
        let started = self.clock.now();
        self.transmission_count += 1;

        if should_evict(point.evict_interval, rep) {
            debug!("Evicting before repetition {}", rep);
            self.evict().await?;
        }

        let sent = self.transport.send(&envs.sender, pattern, point).await;
        self.clock.sleep(self.config.settle_delay()).await;
        let received = self.transport.receive(&envs.receiver, point).await;

        let errors = bit_errors(pattern.as_str(), &received.pattern);
        let duration_ms = (self.clock.now() - started).as_secs_f64() * 1000.0;

        let status = if errors == 0 {
            self.error_free_count += 1;
            "✓".to_string()
        } else {
            format!("✗ ({} errors)", errors)
        };
        let latency = if !received.min_cycles.is_empty() && !received.max_cycles.is_empty() {
            format!(" [{}-{} cycles]", received.min_cycles, received.max_cycles)
        } else {
            String::new()
        };
        info!(
            "  Rep {:3}/{}: {} {:.2}ms (send:{:.2}ms){} [{}/{}]",
            rep,
            self.config.repetitions,
            status,
            duration_ms,
            sent.millis(),
            latency,
            self.transmission_count,
            plan.total_transmissions
        );

        Ok(TransmissionRecord {
            experiment_start_time: plan.experiment_start,
            cache_evict_interval: point.evict_interval,
            runtime: point.runtime.clone(),
            stride_size: point.stride,
            pattern: pattern.as_str().to_string(),
            repetition: rep,
            received_pattern: received.pattern,
            bit_errors: errors,
            duration_ms,
            send_cycles: sent.cycles,
            send_ns: sent.nanos,
            cached_count: received.cached_count,
            avg_cycles: received.avg_cycles,
            min_cycles: received.min_cycles,
            max_cycles: received.max_cycles,
            cycle_values: received.cycle_values,
        })
    }

    async fn evict(&self) -> Result<(), HarnessError> {
        self.evictor.evict().await?;
        Ok(())
    }

    /// Fresh sender and receiver environments for `point`.
    async fn provision(&self, point: &ScenarioPoint) -> Result<ScenarioEnvironments, HarnessError> {
        info!("Setting up environments...");
        let sender = self
            .backend
            .provision(&self.config.sender_environment, &point.runtime)
            .await?;
        info!("  Started {} {}", sender, sender.short_id());

        let receiver = match self
            .backend
            .provision(&self.config.receiver_environment, &point.runtime)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(te) = self.backend.teardown(&sender).await {
                    error!("Failed to remove {}: {}", sender, te);
                }
                return Err(e.into());
            }
        };
        info!("  Started {} {}", receiver, receiver.short_id());

        Ok(ScenarioEnvironments { sender, receiver })
    }

    /// Destroys both environments, attempting each even if one fails.
    async fn teardown(&self, envs: &ScenarioEnvironments) -> Result<(), HarnessError> {
        info!("Cleaning up environments...");
        let mut first_error = None;
        for handle in [&envs.sender, &envs.receiver] {
            if let Err(e) = self.backend.teardown(handle).await {
                error!("Failed to remove {}: {}", handle, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn print_header(&self, run_id: Uuid, patterns: &[Pattern]) {
        let c = &self.config;
        info!("Starting strided page covert channel experiment (run {})", run_id);
        info!("Configuration:");
        info!("  Target file: {}", c.target_file);
        info!("  Message length: {} bits", c.message_length);
        info!("  Repetitions per scenario: {}", c.repetitions);
        info!("  Patterns: {}", patterns.len());
        match c.seed {
            Some(seed) => info!("  Random seed: {}", seed),
            None => info!("  Random seed: None (truly random)"),
        }
        info!("  Output file: {}", c.output_path.display());
        info!("");
        info!("Evaluation Matrix:");
        info!("  R (Cache evict intervals): {:?}", c.evict_intervals);
        info!("  C (Runtimes): {:?}", c.runtimes);
        info!("  S (Stride sizes): {:?}", c.stride_sizes);
        info!("");
        info!("Patterns:");
        for (i, pattern) in patterns.iter().enumerate() {
            info!("  Pattern {}: {}", i + 1, pattern);
        }
    }
}
