//! Discrete-time traffic simulation over a synthetic city grid.
//!
//! Cars follow shortest routes along one-way lanes while traffic lights cycle
//! green around block corners. Every car and every light runs as its own tokio
//! task over one shared [`Grid`](simulation_engine::grid::Grid).

pub mod communication;
pub mod config;
pub mod control_system;
pub mod error;
pub mod monitoring;
pub mod simulation_engine;

pub use config::SimulationConfig;
pub use error::{RouteError, SimulationError};
pub use simulation_engine::simulation::{Simulation, SimulationReport};
