pub mod config;
pub mod control;
pub mod error;
pub mod experiment;
pub mod simulation;

pub use config::*;
pub use control::*;
pub use error::*;
pub use simulation::*;
