use thiserror::Error;

use crate::simulation::{Direction, SignalPhase};

/// Rejected parameters, reported when a component is constructed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("arrival rate for {direction} must be finite and non-negative, got {rate}")]
    InvalidArrivalRate { direction: Direction, rate: f64 },

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidDuration { name: &'static str, value: f64 },

    #[error("min_green ({min_green}s) must not exceed max_green ({max_green}s)")]
    GreenBoundsInverted { min_green: f64, max_green: f64 },

    #[error("time step must be finite and positive, got {0}")]
    InvalidTimeStep(f64),

    #[error("saturation flow must be finite and non-negative, got {0}")]
    InvalidSaturationFlow(f64),

    #[error("arrival rate {rate} for {direction} overflows over a {dt}s time step")]
    ArrivalMeanOverflow { direction: Direction, rate: f64, dt: f64 },
}

/// Broken engine invariants. These indicate a logic defect, never bad input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("active phase {0} was committed with a red light")]
    RedActivePhase(SignalPhase),

    #[error("phase timer left the valid range: {0}")]
    InvalidPhaseTimer(f64),

    #[error("conservation broken: {departed} departed + {queued} queued != {arrived} arrived")]
    Conservation {
        arrived: u64,
        departed: u64,
        queued: u64,
    },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invariant violated at t={time}: {violation}")]
    Invariant {
        time: f64,
        violation: InvariantViolation,
    },
}

pub type SimResult<T> = Result<T, SimError>;

pub(crate) fn check_duration(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { name, value })
    }
}
