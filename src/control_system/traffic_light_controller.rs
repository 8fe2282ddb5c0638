use crate::communication::messages::ShutdownSignal;
use crate::config::TickRange;
use crate::error::SimulationError;
use crate::simulation_engine::grid::{Grid, Position};
use crate::simulation_engine::intersections::{Intersection, IntersectionId};
use log::{debug, info};
use rand::seq::index;
use rand::Rng;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// A light bound to one intersection. Exactly one of its cells is green at a
/// time once it has cycled; freshly assigned lights start fully closed.
#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub id: IntersectionId,
    pub name: String,
    /// Own copy of the intersection's cells, cycled in order.
    pub cells: Vec<Position>,
    /// Index of the cell currently green.
    pub index: usize,
    /// Ticks between two cycles.
    pub period: u64,
}

impl TrafficLight {
    pub fn new(intersection: &Intersection, period: u64) -> Self {
        Self {
            id: intersection.id,
            name: intersection.name.clone(),
            cells: intersection.cells.clone(),
            index: 0,
            period,
        }
    }

    /// Closes every cell of the intersection.
    pub fn close_all(&self, grid: &Grid) {
        for position in &self.cells {
            grid.set_light(*position, false);
        }
    }

    pub fn current_cell(&self) -> Option<Position> {
        self.cells.get(self.index).copied()
    }

    /// Closes the green cell, advances to the next one and opens it.
    pub fn cycle(&mut self, grid: &Grid) {
        let Some(current) = self.current_cell() else {
            return;
        };
        grid.set_light(current, false);
        self.index = (self.index + 1) % self.cells.len();
        let next = self.cells[self.index];
        grid.set_light(next, true);
        debug!("{} switched green from {} to {}", self.name, current, next);
    }

    /// Cycles forever at the light's period until shutdown is signalled.
    pub async fn run(mut self, grid: Arc<Grid>, tick: Duration, mut shutdown: ShutdownSignal) {
        let period = tick.saturating_mul(u32::try_from(self.period).unwrap_or(u32::MAX));
        loop {
            self.cycle(&grid);
            tokio::select! {
                _ = sleep(period) => {}
                _ = shutdown.wait() => break,
            }
        }
        debug!("{} stopped", self.name);
    }
}

/// Picks `count` distinct intersections and binds a light with a random
/// period to each. The candidate slice is not modified.
pub fn assign_traffic_lights<R: Rng + ?Sized>(
    intersections: &[Intersection],
    count: usize,
    period: TickRange,
    rng: &mut R,
) -> Result<Vec<TrafficLight>, SimulationError> {
    if count > intersections.len() {
        return Err(SimulationError::TooManyLights {
            requested: count,
            available: intersections.len(),
        });
    }
    period.validate("light_period")?;

    Ok(index::sample(rng, intersections.len(), count)
        .into_iter()
        .map(|picked| TrafficLight::new(&intersections[picked], period.sample(rng)))
        .collect())
}

/// Owns every light of a run until they are handed to their tasks.
pub struct TrafficLightController {
    pub lights: Vec<TrafficLight>,
}

impl TrafficLightController {
    /// Assigns the lights and closes their cells on the grid.
    pub fn initialize<R: Rng + ?Sized>(
        grid: &Grid,
        intersections: &[Intersection],
        count: usize,
        period: TickRange,
        rng: &mut R,
    ) -> Result<Self, SimulationError> {
        let lights = assign_traffic_lights(intersections, count, period, rng)?;
        for light in &lights {
            light.close_all(grid);
            info!(
                "{} gets a traffic light over {} cells, period {} ticks",
                light.name,
                light.cells.len(),
                light.period
            );
        }
        Ok(Self { lights })
    }

    /// Spawns one task per light.
    pub fn spawn_all(
        self,
        grid: &Arc<Grid>,
        tick: Duration,
        shutdown: &ShutdownSignal,
    ) -> Vec<JoinHandle<()>> {
        self.lights
            .into_iter()
            .map(|light| tokio::spawn(light.run(Arc::clone(grid), tick, shutdown.clone())))
            .collect()
    }
}
