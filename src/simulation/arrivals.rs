use super::{PerDirection, Vehicle, VehicleId};
use crate::error::ConfigError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Poisson};
use std::collections::VecDeque;

/// A source of Poisson-distributed counts.
///
/// The arrival source draws exactly once per non-zero-rate direction per tick,
/// so two samplers that return the same sequence of counts reproduce the same
/// arrival trace.
pub trait PoissonSampler {
    /// Draw one count with the given mean. `mean` is always positive.
    fn draw(&mut self, mean: f64) -> u64;

    fn restart(&mut self);
}

/// `StdRng`-backed sampler. Falls back to OS entropy when no seed is given.
#[derive(Debug, Clone)]
pub struct SeededSampler {
    seed: Option<u64>,
    rng: StdRng,
}

impl SeededSampler {
    pub fn new(seed: Option<u64>) -> Self {
        if seed.is_none() {
            log::warn!("No arrival seed supplied; this run will not be reproducible");
        }
        Self {
            seed,
            rng: Self::make_rng(seed),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl PoissonSampler for SeededSampler {
    fn draw(&mut self, mean: f64) -> u64 {
        debug_assert!(
            mean > 0.0 && mean.is_finite(),
            "Poisson mean must be positive and finite, got {mean}"
        );
        // `Poisson::new` rejects only non-positive means.
        Poisson::new(mean).map_or(0, |poisson| {
            let count: f64 = poisson.sample(&mut self.rng);
            count as u64
        })
    }

    fn restart(&mut self) {
        self.rng = Self::make_rng(self.seed);
    }
}

/// Replays a fixed sequence of counts, then yields zero forever.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSampler {
    script: Vec<u64>,
    remaining: VecDeque<u64>,
}

impl ScriptedSampler {
    pub fn new(script: impl IntoIterator<Item = u64>) -> Self {
        let script: Vec<u64> = script.into_iter().collect();
        Self {
            remaining: script.iter().copied().collect(),
            script,
        }
    }
}

impl PoissonSampler for ScriptedSampler {
    fn draw(&mut self, _mean: f64) -> u64 {
        self.remaining.pop_front().unwrap_or(0)
    }

    fn restart(&mut self) {
        self.remaining = self.script.iter().copied().collect();
    }
}

#[derive(Debug, Clone)]
pub struct ArrivalSource<S = SeededSampler> {
    rates: PerDirection<f64>,
    sampler: S,
    next_id: u64,
}

impl ArrivalSource<SeededSampler> {
    pub fn seeded(rates: PerDirection<f64>, seed: Option<u64>) -> Result<Self, ConfigError> {
        Self::new(rates, SeededSampler::new(seed))
    }
}

impl<S: PoissonSampler> ArrivalSource<S> {
    pub fn new(rates: PerDirection<f64>, sampler: S) -> Result<Self, ConfigError> {
        validate_rates(&rates)?;
        Ok(Self {
            rates,
            sampler,
            next_id: 0,
        })
    }

    pub fn rates(&self) -> &PerDirection<f64> {
        &self.rates
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Vehicles arriving during `[current_time, current_time + dt)`, all
    /// stamped with `current_time`, in N, E, S, W order.
    pub fn generate(&mut self, current_time: f64, dt: f64) -> Vec<Vehicle> {
        let mut arrivals = Vec::new();
        for (direction, &rate) in self.rates.iter() {
            let mean = rate * dt;
            if mean <= 0.0 {
                continue;
            }
            let count = self.sampler.draw(mean);
            for _ in 0..count {
                arrivals.push(Vehicle::new(VehicleId(self.next_id), direction, current_time));
                self.next_id += 1;
            }
        }
        arrivals
    }

    pub fn restart(&mut self) {
        self.sampler.restart();
        self.next_id = 0;
    }
}

pub(crate) fn validate_rates(rates: &PerDirection<f64>) -> Result<(), ConfigError> {
    for (direction, &rate) in rates.iter() {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::InvalidArrivalRate { direction, rate });
        }
    }
    Ok(())
}
