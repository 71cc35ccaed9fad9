use super::SignalScheduler;
use crate::error::{check_duration, ConfigError};
use crate::simulation::{Direction, IntersectionState, SignalLightState, SignalPhase};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveFairParams {
    /// Green is never cut shorter than this, not even for fairness.
    pub min_green: f64,
    /// Green is always cut once it lasts this long.
    pub max_green: f64,
    pub yellow_time: f64,
    /// Opposing demand must exceed current demand by more than this to switch.
    pub extension_threshold: u32,
    pub max_wait_time: f64,
    pub max_skips: u32,
}

impl Default for AdaptiveFairParams {
    fn default() -> Self {
        Self {
            min_green: 5.0,
            max_green: 30.0,
            yellow_time: 3.0,
            extension_threshold: 2,
            max_wait_time: 90.0,
            max_skips: 3,
        }
    }
}

impl AdaptiveFairParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_duration("min_green", self.min_green)?;
        check_duration("max_green", self.max_green)?;
        check_duration("yellow_time", self.yellow_time)?;
        check_duration("max_wait_time", self.max_wait_time)?;
        if self.min_green > self.max_green {
            return Err(ConfigError::GreenBoundsInverted {
                min_green: self.min_green,
                max_green: self.max_green,
            });
        }
        Ok(())
    }
}

/// Why a green phase was terminated, in rule priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchReason {
    Fairness,
    MaxGreen,
    Demand,
}

impl fmt::Display for SwitchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchReason::Fairness => f.write_str("fairness bound"),
            SwitchReason::MaxGreen => f.write_str("max green"),
            SwitchReason::Demand => f.write_str("queue demand"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveFairScheduler {
    params: AdaptiveFairParams,
}

impl AdaptiveFairScheduler {
    pub fn new(params: AdaptiveFairParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &AdaptiveFairParams {
        &self.params
    }

    pub fn fairness_violated(&self, state: &IntersectionState, phase: SignalPhase) -> bool {
        let directions = phase.directions();
        let max_wait = directions
            .iter()
            .map(|&d| state.control.time_since_served[d])
            .fold(0.0, f64::max);
        let max_skips = directions
            .iter()
            .map(|&d| state.control.consecutive_skips[d])
            .max()
            .unwrap_or(0);
        max_wait >= self.params.max_wait_time || max_skips >= self.params.max_skips
    }

    /// Evaluate the termination rules against the current green phase.
    /// Expects `phase_timer` to already include this tick.
    pub fn switch_reason(&self, state: &IntersectionState) -> Option<SwitchReason> {
        let timer = state.control.phase_timer;
        let opposing = state.active_phase.opposing();
        let min_green_served = timer >= self.params.min_green;

        if min_green_served && self.fairness_violated(state, opposing) {
            return Some(SwitchReason::Fairness);
        }
        if timer >= self.params.max_green {
            return Some(SwitchReason::MaxGreen);
        }
        if min_green_served {
            let current_queue = state.phase_queue_length(state.active_phase);
            let opposing_queue = state.phase_queue_length(opposing);
            let threshold = self.params.extension_threshold as usize;
            if current_queue == 0 || opposing_queue > current_queue + threshold {
                return Some(SwitchReason::Demand);
            }
        }
        None
    }

    fn age_wait_clocks(state: &mut IntersectionState, dt: f64) {
        for direction in Direction::ALL {
            let served = state.is_served(direction);
            let waited = &mut state.control.time_since_served[direction];
            *waited = if served { 0.0 } else { *waited + dt };
        }
    }
}

impl SignalScheduler for AdaptiveFairScheduler {
    fn decide(
        &self,
        state: &mut IntersectionState,
        current_time: f64,
        dt: f64,
    ) -> (SignalPhase, SignalLightState) {
        state.control.phase_timer += dt;
        Self::age_wait_clocks(state, dt);

        let phase = state.active_phase;
        let opposing = phase.opposing();

        match state.signal_state {
            SignalLightState::Green => match self.switch_reason(state) {
                Some(reason) => {
                    log::debug!(
                        "t={:.1}: ending {} green after {:.1}s ({})",
                        current_time,
                        phase,
                        state.control.phase_timer,
                        reason
                    );
                    state.control.phase_timer = 0.0;
                    for direction in phase.directions() {
                        state.control.consecutive_skips[direction] = 0;
                    }
                    for direction in opposing.directions() {
                        state.control.consecutive_skips[direction] += 1;
                    }
                    (phase, SignalLightState::Yellow)
                }
                None => (phase, SignalLightState::Green),
            },
            SignalLightState::Yellow if state.control.phase_timer >= self.params.yellow_time => {
                state.control.phase_timer = 0.0;
                for direction in opposing.directions() {
                    state.control.consecutive_skips[direction] = 0;
                }
                (opposing, SignalLightState::Green)
            }
            current => (phase, current),
        }
    }

    fn name(&self) -> String {
        format!(
            "AdaptiveFair(min={}s,max={}s)",
            self.params.min_green, self.params.max_green
        )
    }
}
