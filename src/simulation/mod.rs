use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::ops::{Index, IndexMut};

pub mod arrivals;
pub mod engine;
pub mod metrics;

pub use arrivals::*;
pub use engine::*;
pub use metrics::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Canonical iteration order. Arrival sampling depends on it.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn phase(self) -> SignalPhase {
        match self {
            Direction::North | Direction::South => SignalPhase::NS,
            Direction::East | Direction::West => SignalPhase::EW,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Direction::North => "N",
            Direction::East => "E",
            Direction::South => "S",
            Direction::West => "W",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalPhase {
    NS,
    EW,
}

impl SignalPhase {
    pub fn directions(self) -> [Direction; 2] {
        match self {
            SignalPhase::NS => [Direction::North, Direction::South],
            SignalPhase::EW => [Direction::East, Direction::West],
        }
    }

    pub fn opposing(self) -> SignalPhase {
        match self {
            SignalPhase::NS => SignalPhase::EW,
            SignalPhase::EW => SignalPhase::NS,
        }
    }

    pub fn serves(self, direction: Direction) -> bool {
        direction.phase() == self
    }
}

impl fmt::Display for SignalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalPhase::NS => f.write_str("NS"),
            SignalPhase::EW => f.write_str("EW"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalLightState {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for SignalLightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            SignalLightState::Green => "G",
            SignalLightState::Yellow => "Y",
            SignalLightState::Red => "R",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PerDirection<T> {
    pub north: T,
    pub east: T,
    pub south: T,
    pub west: T,
}

impl<T> PerDirection<T> {
    pub fn from_fn(mut f: impl FnMut(Direction) -> T) -> Self {
        Self {
            north: f(Direction::North),
            east: f(Direction::East),
            south: f(Direction::South),
            west: f(Direction::West),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        Direction::ALL.into_iter().map(move |d| (d, &self[d]))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.iter().map(|(_, v)| v)
    }
}

impl<T> Index<Direction> for PerDirection<T> {
    type Output = T;

    fn index(&self, direction: Direction) -> &T {
        match direction {
            Direction::North => &self.north,
            Direction::East => &self.east,
            Direction::South => &self.south,
            Direction::West => &self.west,
        }
    }
}

impl<T> IndexMut<Direction> for PerDirection<T> {
    fn index_mut(&mut self, direction: Direction) -> &mut T {
        match direction {
            Direction::North => &mut self.north,
            Direction::East => &mut self.east,
            Direction::South => &mut self.south,
            Direction::West => &mut self.west,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub arrival_time: f64,
    pub direction: Direction,
    pub departure_time: Option<f64>,
}

impl Vehicle {
    pub fn new(id: VehicleId, direction: Direction, arrival_time: f64) -> Self {
        Self {
            id,
            arrival_time,
            direction,
            departure_time: None,
        }
    }

    pub(crate) fn depart(&mut self, time: f64) {
        debug_assert!(self.departure_time.is_none(), "vehicle {:?} departed twice", self.id);
        self.departure_time = Some(time);
    }

    pub fn wait_time(&self) -> Option<f64> {
        self.departure_time.map(|t| t - self.arrival_time)
    }
}

/// Scheduler-owned control fields, stored on the intersection so a
/// renderer can show them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ControlMemory {
    pub phase_timer: f64,
    pub time_since_served: PerDirection<f64>,
    pub consecutive_skips: PerDirection<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionState {
    queues: PerDirection<VecDeque<Vehicle>>,
    pub active_phase: SignalPhase,
    /// Green or Yellow for the active phase; the other phase is implicitly red.
    pub signal_state: SignalLightState,
    pub control: ControlMemory,
}

impl Default for IntersectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl IntersectionState {
    pub fn new() -> Self {
        Self {
            queues: PerDirection::default(),
            active_phase: SignalPhase::NS,
            signal_state: SignalLightState::Green,
            control: ControlMemory::default(),
        }
    }

    pub fn enqueue(&mut self, vehicle: Vehicle) {
        self.queues[vehicle.direction].push_back(vehicle);
    }

    pub fn dequeue(&mut self, direction: Direction) -> Option<Vehicle> {
        self.queues[direction].pop_front()
    }

    pub fn queue(&self, direction: Direction) -> &VecDeque<Vehicle> {
        &self.queues[direction]
    }

    pub fn queue_length(&self, direction: Direction) -> usize {
        self.queues[direction].len()
    }

    pub fn phase_queue_length(&self, phase: SignalPhase) -> usize {
        phase
            .directions()
            .iter()
            .map(|&d| self.queue_length(d))
            .sum()
    }

    pub fn total_queued(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    pub fn queue_lengths(&self) -> PerDirection<usize> {
        PerDirection::from_fn(|d| self.queue_length(d))
    }

    /// Light shown to one approach, with red made explicit for the idle phase.
    pub fn light_for(&self, direction: Direction) -> SignalLightState {
        if self.active_phase.serves(direction) {
            self.signal_state
        } else {
            SignalLightState::Red
        }
    }

    pub fn is_served(&self, direction: Direction) -> bool {
        self.active_phase.serves(direction) && self.signal_state == SignalLightState::Green
    }
}
