use crate::simulation_engine::grid::Position;
use thiserror::Error;

/// Startup failures. Once tasks are running nothing in the engine fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("Can't be a negative number of cars (got {0})")]
    NegativeCars(i64),

    #[error("Max number of cars for this simulator is {max} (requested {requested})")]
    TooManyCars { requested: usize, max: usize },

    #[error("Can't be a negative number of stoplights (got {0})")]
    NegativeLights(i64),

    #[error("Impossible to have more stoplights ({requested}) than crossings ({available})")]
    TooManyLights { requested: usize, available: usize },

    #[error("`{name}` must be a non-empty range, got [{min}, {max})")]
    InvalidRange { name: &'static str, min: u64, max: u64 },

    #[error("grid width must be at least 1")]
    EmptyGrid,

    #[error("car {car} starting at {start} found no reachable destination after {attempts} attempts")]
    NoRoute {
        car: usize,
        start: Position,
        attempts: usize,
    },
}

/// Why the path finder could not produce a route.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    #[error("{0} is not a road cell")]
    NotRoad(Position),

    #[error("start and destination are the same cell {0}")]
    SameEndpoints(Position),

    #[error("no route from {start} to {goal}")]
    Unreachable { start: Position, goal: Position },
}
