use super::{
    ArrivalSource, IntersectionState, MetricsCollector, MetricsSnapshot, PoissonSampler,
    SeededSampler, SignalLightState, SignalPhase, Vehicle,
};
use crate::control::{Scheduler, SignalScheduler};
use crate::error::{check_duration, ConfigError, InvariantViolation, SimError, SimResult};

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub time: f64,
    pub phase: SignalPhase,
    pub signal_state: SignalLightState,
    pub arrivals: Vec<Vehicle>,
    pub departures: Vec<Vehicle>,
}

/// Drives one intersection tick by tick: arrivals, signal decision,
/// departures, metrics, time advance.
#[derive(Debug, Clone)]
pub struct SimulationEngine<S = SeededSampler> {
    scheduler: Scheduler,
    arrivals: ArrivalSource<S>,
    dt: f64,
    saturation_flow: f64,
    departures_per_tick: usize,
    state: IntersectionState,
    metrics: MetricsCollector,
    current_time: f64,
    ticks: u64,
}

impl<S: PoissonSampler> SimulationEngine<S> {
    pub fn new(
        scheduler: impl Into<Scheduler>,
        arrivals: ArrivalSource<S>,
        saturation_flow: f64,
        dt: f64,
    ) -> Result<Self, ConfigError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ConfigError::InvalidTimeStep(dt));
        }
        if !saturation_flow.is_finite() || saturation_flow < 0.0 {
            return Err(ConfigError::InvalidSaturationFlow(saturation_flow));
        }
        for (direction, &rate) in arrivals.rates().iter() {
            if !(rate * dt).is_finite() {
                return Err(ConfigError::ArrivalMeanOverflow { direction, rate, dt });
            }
        }
        // Truncation is deliberate: fractional quanta discharge nothing.
        let departures_per_tick = (saturation_flow * dt).floor() as usize;
        if departures_per_tick == 0 {
            log::warn!(
                "saturation_flow * dt = {:.3} truncates to zero departures per tick",
                saturation_flow * dt
            );
        }

        Ok(Self {
            scheduler: scheduler.into(),
            arrivals,
            dt,
            saturation_flow,
            departures_per_tick,
            state: IntersectionState::new(),
            metrics: MetricsCollector::new(),
            current_time: 0.0,
            ticks: 0,
        })
    }

    pub fn state(&self) -> &IntersectionState {
        &self.state
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn arrivals(&self) -> &ArrivalSource<S> {
        &self.arrivals
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn saturation_flow(&self) -> f64 {
        self.saturation_flow
    }

    pub fn departures_per_tick(&self) -> usize {
        self.departures_per_tick
    }

    /// Back to t=0: empty queues, NS green, zeroed control memory, empty
    /// metrics, and the arrival stream rewound to its seed.
    pub fn reset(&mut self) {
        self.state = IntersectionState::new();
        self.metrics = MetricsCollector::new();
        self.arrivals.restart();
        self.current_time = 0.0;
        self.ticks = 0;
    }

    /// Reset, then execute `floor(duration / dt)` ticks.
    pub fn run(&mut self, duration: f64) -> SimResult<()> {
        check_duration("duration", duration)?;
        self.reset();

        let steps = (duration / self.dt).floor() as u64;
        log::info!(
            "Running {} for {:.1}s ({} ticks of {}s)",
            self.scheduler.name(),
            duration,
            steps,
            self.dt
        );
        for _ in 0..steps {
            self.step()?;
        }
        log::info!(
            "{} finished: {} arrived, {} departed, {} still queued",
            self.scheduler.name(),
            self.metrics.total_arrived(),
            self.metrics.total_departed(),
            self.state.total_queued()
        );
        Ok(())
    }

    pub fn step(&mut self) -> SimResult<TickOutcome> {
        let now = self.current_time;

        // 1. Arrivals
        let arrivals = self.arrivals.generate(now, self.dt);
        for vehicle in &arrivals {
            self.state.enqueue(*vehicle);
            self.metrics.record_arrival();
        }

        // 2. Signal decision
        let previous = (self.state.active_phase, self.state.signal_state);
        let (phase, signal_state) = self.scheduler.decide(&mut self.state, now, self.dt);
        self.state.active_phase = phase;
        self.state.signal_state = signal_state;
        if (phase, signal_state) != previous {
            log::debug!(
                "t={:.1}: signal {}-{} -> {}-{}",
                now,
                previous.0,
                previous.1,
                phase,
                signal_state
            );
        }

        // 3. Departures
        let departures = self.discharge(now);

        // 4. Metrics
        self.metrics.record_tick(&self.state, now);

        log::trace!(
            "t={:.1}: +{} arrived, -{} departed, queues {:?}",
            now,
            arrivals.len(),
            departures.len(),
            self.state.queue_lengths()
        );

        // 5. Advance
        self.current_time += self.dt;
        self.ticks += 1;

        self.check_invariants()
            .map_err(|violation| SimError::Invariant { time: now, violation })?;

        Ok(TickOutcome {
            time: now,
            phase,
            signal_state,
            arrivals,
            departures,
        })
    }

    fn discharge(&mut self, now: f64) -> Vec<Vehicle> {
        let mut departed = Vec::new();
        if self.state.signal_state != SignalLightState::Green {
            return departed;
        }
        for direction in self.state.active_phase.directions() {
            for _ in 0..self.departures_per_tick {
                let Some(mut vehicle) = self.state.dequeue(direction) else {
                    break;
                };
                vehicle.depart(now);
                self.metrics.record_departure(&vehicle, now);
                departed.push(vehicle);
            }
        }
        departed
    }

    /// Checks that never fail for a correct engine and scheduler.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.state.signal_state == SignalLightState::Red {
            return Err(InvariantViolation::RedActivePhase(self.state.active_phase));
        }

        let timer = self.state.control.phase_timer;
        if !timer.is_finite() || timer < 0.0 {
            return Err(InvariantViolation::InvalidPhaseTimer(timer));
        }

        let arrived = self.metrics.total_arrived();
        let departed = self.metrics.total_departed();
        let queued = self.state.total_queued() as u64;
        if departed + queued != arrived {
            return Err(InvariantViolation::Conservation {
                arrived,
                departed,
                queued,
            });
        }
        Ok(())
    }
}
