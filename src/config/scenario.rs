use super::Validate;
use crate::control::{AdaptiveFairParams, FixedTimerParams, Policy, Scheduler, SchedulerConfig};
use crate::error::{check_duration, ConfigError};
use crate::simulation::arrivals::validate_rates;
use crate::simulation::{ArrivalSource, PerDirection, SimulationEngine};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A complete experiment description. Both policies are configured so the
/// same file drives a side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub simulation: SimulationParams,
    pub arrivals: PerDirection<f64>,
    pub fixed_timer: FixedTimerParams,
    pub adaptive_fair: AdaptiveFairParams,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationParams::default(),
            arrivals: PerDirection {
                north: 0.4,
                east: 0.2,
                south: 0.3,
                west: 0.15,
            },
            fixed_timer: FixedTimerParams::default(),
            adaptive_fair: AdaptiveFairParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationParams {
    pub dt: f64,
    /// Vehicles per second one green approach can discharge.
    pub saturation_flow: f64,
    pub duration: f64,
    /// `None` means entropy seeding; results are then not reproducible.
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dt: 1.0,
            saturation_flow: 1.0,
            duration: 1800.0,
            seed: Some(42),
        }
    }
}

impl ScenarioConfig {
    pub fn scheduler_config(&self, policy: Policy) -> SchedulerConfig {
        match policy {
            Policy::FixedTimer => SchedulerConfig::FixedTimer(self.fixed_timer.clone()),
            Policy::AdaptiveFair => SchedulerConfig::AdaptiveFair(self.adaptive_fair.clone()),
        }
    }

    /// Engine for `policy`, seeded with `seed` (falling back to the scenario seed).
    pub fn build_engine(
        &self,
        policy: Policy,
        seed: Option<u64>,
    ) -> Result<SimulationEngine, ConfigError> {
        let scheduler = Scheduler::from_config(&self.scheduler_config(policy))?;
        let arrivals = ArrivalSource::seeded(self.arrivals, seed.or(self.simulation.seed))?;
        SimulationEngine::new(
            scheduler,
            arrivals,
            self.simulation.saturation_flow,
            self.simulation.dt,
        )
    }
}

impl Validate for ScenarioConfig {
    fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if !sim.dt.is_finite() || sim.dt <= 0.0 {
            return Err(ConfigError::InvalidTimeStep(sim.dt).into());
        }
        if !sim.saturation_flow.is_finite() || sim.saturation_flow < 0.0 {
            return Err(ConfigError::InvalidSaturationFlow(sim.saturation_flow).into());
        }
        check_duration("duration", sim.duration)?;

        validate_rates(&self.arrivals)?;
        self.fixed_timer.validate()?;
        self.adaptive_fair.validate()?;
        Ok(())
    }
}
