//! Single runs and multi-seed policy comparisons.
//!
//! Every seed is replayed under both policies, so the two controllers always
//! face identical arrival traces.

use crate::config::ScenarioConfig;
use crate::control::{Policy, SignalScheduler};
use crate::error::SimResult;
use crate::simulation::{Direction, PerDirection, PoissonSampler, SimulationEngine};
use serde::Serialize;
use std::fmt;

/// Headline figures of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub policy: Policy,
    pub scheduler_name: String,
    pub seed: Option<u64>,
    pub duration: f64,
    pub total_arrived: u64,
    pub total_departed: u64,
    pub still_waiting: u64,
    pub average_wait: f64,
    pub p95_wait: f64,
    pub max_queue_total: usize,
    /// Departed vehicles per second of requested duration.
    pub throughput: f64,
    pub max_queue_length: PerDirection<usize>,
    pub max_consecutive_skips: PerDirection<u32>,
}

impl RunSummary {
    pub fn from_engine<S: PoissonSampler>(
        engine: &SimulationEngine<S>,
        seed: Option<u64>,
        duration: f64,
    ) -> Self {
        let metrics = engine.metrics();
        let throughput = if duration > 0.0 {
            metrics.total_departed() as f64 / duration
        } else {
            0.0
        };
        Self {
            policy: engine.scheduler().policy(),
            scheduler_name: engine.scheduler().name(),
            seed,
            duration: engine.current_time(),
            total_arrived: metrics.total_arrived(),
            total_departed: metrics.total_departed(),
            still_waiting: engine.state().total_queued() as u64,
            average_wait: metrics.average_wait(),
            p95_wait: metrics.percentile_wait(95.0),
            max_queue_total: metrics.max_queue_length_overall(),
            throughput,
            max_queue_length: *metrics.max_queue_length(),
            max_consecutive_skips: *metrics.max_consecutive_skips(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "Controller: {}", self.scheduler_name)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Simulation Duration: {:.1} seconds", self.duration)?;
        writeln!(f, "Total Vehicles Arrived: {}", self.total_arrived)?;
        writeln!(f, "Total Vehicles Departed: {}", self.total_departed)?;
        writeln!(f, "Vehicles Still Waiting: {}", self.still_waiting)?;
        writeln!(f)?;
        writeln!(f, "Wait Time Statistics:")?;
        writeln!(f, "  Average Wait Time: {:.2} seconds", self.average_wait)?;
        writeln!(f, "  95th Percentile Wait: {:.2} seconds", self.p95_wait)?;
        writeln!(f)?;
        writeln!(f, "Queue Statistics:")?;
        writeln!(f, "  Max Queue Lengths:")?;
        for (direction, max_len) in self.max_queue_length.iter() {
            writeln!(f, "    {direction}: {max_len}")?;
        }
        writeln!(f)?;
        writeln!(f, "Fairness Statistics:")?;
        writeln!(f, "  Max Consecutive Skips:")?;
        for (direction, skips) in self.max_consecutive_skips.iter() {
            writeln!(f, "    {direction}: {skips}")?;
        }
        write!(f, "{rule}")
    }
}

pub fn run_single(
    scenario: &ScenarioConfig,
    policy: Policy,
    seed: Option<u64>,
) -> SimResult<RunSummary> {
    let seed = seed.or(scenario.simulation.seed);
    let mut engine = scenario.build_engine(policy, seed)?;
    engine.run(scenario.simulation.duration)?;
    Ok(RunSummary::from_engine(&engine, seed, scenario.simulation.duration))
}

/// Run both policies over every seed.
pub fn compare(
    scenario: &ScenarioConfig,
    seeds: impl IntoIterator<Item = u64>,
) -> SimResult<Comparison> {
    let mut comparison = Comparison::default();
    for seed in seeds {
        log::info!("Seed {seed}: running both controllers");
        comparison
            .fixed
            .push(run_single(scenario, Policy::FixedTimer, Some(seed))?);
        comparison
            .adaptive
            .push(run_single(scenario, Policy::AdaptiveFair, Some(seed))?);
    }
    Ok(comparison)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    AverageWait,
    P95Wait,
    MaxQueue,
    Throughput,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::AverageWait,
        Metric::P95Wait,
        Metric::MaxQueue,
        Metric::Throughput,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::AverageWait => "Average Wait Time (s)",
            Metric::P95Wait => "95th Percentile Wait (s)",
            Metric::MaxQueue => "Max Queue Length",
            Metric::Throughput => "Throughput (veh/s)",
        }
    }

    pub fn higher_is_better(self) -> bool {
        matches!(self, Metric::Throughput)
    }

    pub fn value(self, run: &RunSummary) -> f64 {
        match self {
            Metric::AverageWait => run.average_wait,
            Metric::P95Wait => run.p95_wait,
            Metric::MaxQueue => run.max_queue_total as f64,
            Metric::Throughput => run.throughput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanStd {
    pub mean: f64,
    /// Sample standard deviation; zero with fewer than two runs.
    pub std: f64,
}

impl MeanStd {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, std: 0.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() < 2 {
            0.0
        } else {
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            var.sqrt()
        };
        Self { mean, std }
    }
}

/// Paired fixed/adaptive results, one pair per seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Comparison {
    pub fixed: Vec<RunSummary>,
    pub adaptive: Vec<RunSummary>,
}

impl Comparison {
    pub fn runs(&self, policy: Policy) -> &[RunSummary] {
        match policy {
            Policy::FixedTimer => &self.fixed,
            Policy::AdaptiveFair => &self.adaptive,
        }
    }

    pub fn stats(&self, policy: Policy, metric: Metric) -> MeanStd {
        let values: Vec<f64> = self.runs(policy).iter().map(|r| metric.value(r)).collect();
        MeanStd::of(&values)
    }

    /// Percent improvement of adaptive over fixed; positive means adaptive is better.
    pub fn improvement(&self, metric: Metric) -> f64 {
        let fixed = self.stats(Policy::FixedTimer, metric).mean;
        let adaptive = self.stats(Policy::AdaptiveFair, metric).mean;
        if fixed == 0.0 {
            return 0.0;
        }
        if metric.higher_is_better() {
            (adaptive - fixed) / fixed * 100.0
        } else {
            (fixed - adaptive) / fixed * 100.0
        }
    }

    pub fn mean_max_skips(&self, policy: Policy, direction: Direction) -> f64 {
        let values: Vec<f64> = self
            .runs(policy)
            .iter()
            .map(|r| r.max_consecutive_skips[direction] as f64)
            .collect();
        MeanStd::of(&values).mean
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        let thin = "-".repeat(70);
        let policies = [Policy::FixedTimer, Policy::AdaptiveFair];

        writeln!(f, "{rule}")?;
        writeln!(f, "RESULTS SUMMARY ({} seeds)", self.fixed.len())?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Performance Metrics (mean ± std):")?;
        writeln!(f, "{thin}")?;
        for metric in Metric::ALL {
            writeln!(f)?;
            writeln!(f, "{}:", metric.label())?;
            for policy in policies {
                let stats = self.stats(policy, metric);
                writeln!(
                    f,
                    "  {:<10}: {:8.2} ± {:6.2}",
                    policy.to_string(),
                    stats.mean,
                    stats.std
                )?;
            }
            writeln!(f, "  {:<10}: {:+7.2}%", "Improvement", self.improvement(metric))?;
        }
        writeln!(f)?;
        writeln!(f, "Fairness Metrics (Max Consecutive Skips):")?;
        writeln!(f, "{thin}")?;
        for direction in Direction::ALL {
            writeln!(f, "Direction {direction}:")?;
            for policy in policies {
                writeln!(
                    f,
                    "  {:<10}: {:6.2}",
                    policy.to_string(),
                    self.mean_max_skips(policy, direction)
                )?;
            }
        }
        write!(f, "{rule}")
    }
}
