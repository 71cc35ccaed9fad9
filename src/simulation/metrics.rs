use super::{IntersectionState, PerDirection, SignalLightState, SignalPhase, Vehicle};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseRecord {
    pub time: f64,
    pub phase: SignalPhase,
    pub signal_state: SignalLightState,
}

/// Accumulates wait samples, high-water marks and per-tick histories for a run.
///
/// Every wait sample is retained so percentiles are exact. Memory therefore
/// grows linearly with the number of departures, which suits bounded-duration
/// experiments.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    total_arrived: u64,
    total_departed: u64,
    total_wait_time: f64,
    wait_times: Vec<f64>,
    max_queue_length: PerDirection<usize>,
    max_consecutive_skips: PerDirection<u32>,
    queue_history: Vec<PerDirection<usize>>,
    phase_history: Vec<PhaseRecord>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_arrival(&mut self) {
        self.total_arrived += 1;
    }

    pub fn record_departure(&mut self, vehicle: &Vehicle, departure_time: f64) {
        let wait = departure_time - vehicle.arrival_time;
        debug_assert!(wait >= 0.0, "vehicle {:?} departed before it arrived", vehicle.id);
        self.total_departed += 1;
        self.total_wait_time += wait;
        self.wait_times.push(wait);
    }

    /// Fold the end-of-tick intersection state into maxima and histories.
    pub fn record_tick(&mut self, state: &IntersectionState, time: f64) {
        let lengths = state.queue_lengths();
        for (direction, &length) in lengths.iter() {
            let max_len = &mut self.max_queue_length[direction];
            *max_len = (*max_len).max(length);
            let max_skips = &mut self.max_consecutive_skips[direction];
            *max_skips = (*max_skips).max(state.control.consecutive_skips[direction]);
        }
        self.queue_history.push(lengths);
        self.phase_history.push(PhaseRecord {
            time,
            phase: state.active_phase,
            signal_state: state.signal_state,
        });
    }

    pub fn total_arrived(&self) -> u64 {
        self.total_arrived
    }

    pub fn total_departed(&self) -> u64 {
        self.total_departed
    }

    pub fn total_wait_time(&self) -> f64 {
        self.total_wait_time
    }

    pub fn wait_times(&self) -> &[f64] {
        &self.wait_times
    }

    pub fn average_wait(&self) -> f64 {
        if self.total_departed == 0 {
            return 0.0;
        }
        self.total_wait_time / self.total_departed as f64
    }

    /// Linear-interpolation percentile over all samples; `p` is clamped to [0, 100].
    pub fn percentile_wait(&self, p: f64) -> f64 {
        percentile(&self.wait_times, p)
    }

    pub fn max_queue_length(&self) -> &PerDirection<usize> {
        &self.max_queue_length
    }

    pub fn max_queue_length_overall(&self) -> usize {
        self.max_queue_length.values().copied().max().unwrap_or(0)
    }

    pub fn max_consecutive_skips(&self) -> &PerDirection<u32> {
        &self.max_consecutive_skips
    }

    pub fn queue_history(&self) -> &[PerDirection<usize>] {
        &self.queue_history
    }

    pub fn phase_history(&self) -> &[PhaseRecord] {
        &self.phase_history
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_arrived: self.total_arrived,
            total_departed: self.total_departed,
            average_wait: self.average_wait(),
            p95_wait: self.percentile_wait(95.0),
            wait_times: self.wait_times.clone(),
            max_queue_length: self.max_queue_length,
            max_consecutive_skips: self.max_consecutive_skips,
            queue_history: self.queue_history.clone(),
            phase_history: self.phase_history.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_arrived: u64,
    pub total_departed: u64,
    pub average_wait: f64,
    pub p95_wait: f64,
    pub wait_times: Vec<f64>,
    pub max_queue_length: PerDirection<usize>,
    pub max_consecutive_skips: PerDirection<u32>,
    pub queue_history: Vec<PerDirection<usize>>,
    pub phase_history: Vec<PhaseRecord>,
}

impl MetricsSnapshot {
    pub fn percentile_wait(&self, p: f64) -> f64 {
        percentile(&self.wait_times, p)
    }
}

fn percentile(samples: &[f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
