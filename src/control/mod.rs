use crate::error::ConfigError;
use crate::simulation::{IntersectionState, SignalLightState, SignalPhase};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod adaptive;
pub mod fixed_timer;

pub use adaptive::*;
pub use fixed_timer::*;

/// A signal-control policy.
///
/// `decide` runs once per tick, before departures, and returns the phase and
/// light to commit. It may update `state.control` (timer, time since served,
/// skip counts); those fields are the policy's working memory.
pub trait SignalScheduler {
    fn decide(
        &self,
        state: &mut IntersectionState,
        current_time: f64,
        dt: f64,
    ) -> (SignalPhase, SignalLightState);

    fn name(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    FixedTimer,
    AdaptiveFair,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::FixedTimer => f.write_str("fixed"),
            Policy::AdaptiveFair => f.write_str("adaptive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SchedulerConfig {
    FixedTimer(FixedTimerParams),
    AdaptiveFair(AdaptiveFairParams),
}

impl SchedulerConfig {
    pub fn policy(&self) -> Policy {
        match self {
            SchedulerConfig::FixedTimer(_) => Policy::FixedTimer,
            SchedulerConfig::AdaptiveFair(_) => Policy::AdaptiveFair,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scheduler {
    FixedTimer(FixedTimerScheduler),
    AdaptiveFair(AdaptiveFairScheduler),
}

impl Scheduler {
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, ConfigError> {
        Ok(match config {
            SchedulerConfig::FixedTimer(params) => {
                Scheduler::FixedTimer(FixedTimerScheduler::new(params.green_time, params.yellow_time)?)
            }
            SchedulerConfig::AdaptiveFair(params) => {
                Scheduler::AdaptiveFair(AdaptiveFairScheduler::new(params.clone())?)
            }
        })
    }

    pub fn policy(&self) -> Policy {
        match self {
            Scheduler::FixedTimer(_) => Policy::FixedTimer,
            Scheduler::AdaptiveFair(_) => Policy::AdaptiveFair,
        }
    }
}

impl From<FixedTimerScheduler> for Scheduler {
    fn from(scheduler: FixedTimerScheduler) -> Self {
        Scheduler::FixedTimer(scheduler)
    }
}

impl From<AdaptiveFairScheduler> for Scheduler {
    fn from(scheduler: AdaptiveFairScheduler) -> Self {
        Scheduler::AdaptiveFair(scheduler)
    }
}

impl SignalScheduler for Scheduler {
    fn decide(
        &self,
        state: &mut IntersectionState,
        current_time: f64,
        dt: f64,
    ) -> (SignalPhase, SignalLightState) {
        match self {
            Scheduler::FixedTimer(scheduler) => scheduler.decide(state, current_time, dt),
            Scheduler::AdaptiveFair(scheduler) => scheduler.decide(state, current_time, dt),
        }
    }

    fn name(&self) -> String {
        match self {
            Scheduler::FixedTimer(scheduler) => scheduler.name(),
            Scheduler::AdaptiveFair(scheduler) => scheduler.name(),
        }
    }
}
