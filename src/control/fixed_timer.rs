use super::SignalScheduler;
use crate::error::{check_duration, ConfigError};
use crate::simulation::{IntersectionState, SignalLightState, SignalPhase};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedTimerParams {
    pub green_time: f64,
    pub yellow_time: f64,
}

impl Default for FixedTimerParams {
    fn default() -> Self {
        Self {
            green_time: 20.0,
            yellow_time: 3.0,
        }
    }
}

impl FixedTimerParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_duration("green_time", self.green_time)?;
        check_duration("yellow_time", self.yellow_time)
    }
}

/// Oblivious baseline: NS-Green, NS-Yellow, EW-Green, EW-Yellow, repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedTimerScheduler {
    green_time: f64,
    yellow_time: f64,
}

impl FixedTimerScheduler {
    pub fn new(green_time: f64, yellow_time: f64) -> Result<Self, ConfigError> {
        FixedTimerParams {
            green_time,
            yellow_time,
        }
        .validate()?;
        Ok(Self {
            green_time,
            yellow_time,
        })
    }

    pub fn green_time(&self) -> f64 {
        self.green_time
    }

    pub fn yellow_time(&self) -> f64 {
        self.yellow_time
    }

    pub fn cycle_time(&self) -> f64 {
        2.0 * (self.green_time + self.yellow_time)
    }
}

impl SignalScheduler for FixedTimerScheduler {
    fn decide(
        &self,
        state: &mut IntersectionState,
        _current_time: f64,
        dt: f64,
    ) -> (SignalPhase, SignalLightState) {
        let timer = &mut state.control.phase_timer;
        *timer += dt;

        match state.signal_state {
            SignalLightState::Green if *timer >= self.green_time => {
                *timer = 0.0;
                (state.active_phase, SignalLightState::Yellow)
            }
            SignalLightState::Yellow if *timer >= self.yellow_time => {
                *timer = 0.0;
                (state.active_phase.opposing(), SignalLightState::Green)
            }
            current => (state.active_phase, current),
        }
    }

    fn name(&self) -> String {
        format!("FixedTimer(G={}s)", self.green_time)
    }
}
