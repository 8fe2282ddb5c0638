// simulation.rs
//
// The coordinator: builds the grid, validates the run parameters, binds the
// traffic lights, places the cars with their routes, then runs one tokio task
// per light and per car until every car has reported on the completion channel.

use crate::communication::messages::{
    completion_channel, shutdown_channel, CarId, ShutdownHandle, ShutdownSignal,
};
use crate::config::SimulationConfig;
use crate::control_system::traffic_light_controller::TrafficLightController;
use crate::error::SimulationError;
use crate::simulation_engine::grid::{CellView, Grid, Position};
use crate::simulation_engine::intersections::{create_intersections, Intersection};
use crate::simulation_engine::route_generation::find_path;
use crate::simulation_engine::vehicles::{
    drive, lock_car, Car, CarStatus, SharedCar, MAX_SPEED, MIN_SPEED,
};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio::time::sleep;

/// The route computed for one car at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarRoute {
    pub car: CarId,
    pub start: Position,
    pub goal: Position,
    /// Cells after `start`, ending with `goal`.
    pub cells: Vec<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Every car reached its destination.
    Completed,
    /// Stopped by the deadline or an external shutdown before all cars arrived.
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub outcome: Outcome,
    pub routes: Vec<CarRoute>,
    /// Car ids in the order they reported completion.
    pub completion_order: Vec<CarId>,
    /// Final state of every car.
    pub cars: Vec<CarStatus>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub width: usize,
    pub cells: Vec<CellView>,
    pub cars: Vec<CarStatus>,
    pub completed: usize,
    pub total_cars: usize,
}

/// Read-only handle on a running simulation.
#[derive(Clone)]
pub struct SimulationMonitor {
    grid: Arc<Grid>,
    cars: Vec<SharedCar>,
    completed: Arc<AtomicUsize>,
}

impl SimulationMonitor {
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total_cars(&self) -> usize {
        self.cars.len()
    }

    pub fn is_finished(&self) -> bool {
        self.completed() >= self.total_cars()
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            width: self.grid.width(),
            cells: self.grid.snapshot(),
            cars: self.cars.iter().map(|car| lock_car(car).status()).collect(),
            completed: self.completed(),
            total_cars: self.cars.len(),
        }
    }
}

pub struct Simulation {
    config: SimulationConfig,
    grid: Arc<Grid>,
    intersections: Vec<Intersection>,
    lights: TrafficLightController,
    cars: Vec<SharedCar>,
    routes: Vec<CarRoute>,
    completed: Arc<AtomicUsize>,
    shutdown: ShutdownHandle,
    shutdown_signal: ShutdownSignal,
}

impl Simulation {
    /// Builds a run from `config`, seeded from `config.seed` when present.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, &mut rng)
    }

    /// Builds a run. Every validation happens here, before any task exists.
    pub fn with_rng<R: Rng + ?Sized>(
        config: SimulationConfig,
        rng: &mut R,
    ) -> Result<Self, SimulationError> {
        if config.width == 0 {
            return Err(SimulationError::EmptyGrid);
        }
        let grid = Grid::new(config.width);
        let streets = grid.street_cells();
        let car_count = config.validated_cars(streets.len())?;
        info!(
            "Built {0}x{0} grid with {1} road cells, {2} of them streets",
            grid.width(),
            grid.road_cells().len(),
            streets.len()
        );

        let intersections = create_intersections(&grid);
        let light_count = config.validated_lights(intersections.len())?;
        let lights = TrafficLightController::initialize(
            &grid,
            &intersections,
            light_count,
            config.light_period,
            rng,
        )?;

        let (cars, routes) = spawn_cars(&grid, &streets, car_count, config.route_attempts, rng)?;
        let (shutdown, shutdown_signal) = shutdown_channel();

        Ok(Self {
            config,
            grid: Arc::new(grid),
            intersections,
            lights,
            cars,
            routes,
            completed: Arc::new(AtomicUsize::new(0)),
            shutdown,
            shutdown_signal,
        })
    }

    pub fn grid(&self) -> &Arc<Grid> {
        &self.grid
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    pub fn lights(&self) -> &TrafficLightController {
        &self.lights
    }

    pub fn routes(&self) -> &[CarRoute] {
        &self.routes
    }

    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    pub fn monitor(&self) -> SimulationMonitor {
        SimulationMonitor {
            grid: Arc::clone(&self.grid),
            cars: self.cars.clone(),
            completed: Arc::clone(&self.completed),
        }
    }

    /// Handle to stop the run early; cars still on the grid vacate their cells.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Runs every light and car task until all cars report completion, the
    /// deadline passes, or shutdown is requested.
    pub async fn run(self) -> SimulationReport {
        let Simulation {
            config,
            grid,
            lights,
            cars,
            routes,
            completed,
            shutdown,
            shutdown_signal,
            ..
        } = self;

        let tick = config.tick();
        let total = cars.len();
        let (completions, mut finished) = completion_channel(total);

        let light_tasks = lights.spawn_all(&grid, tick, &shutdown_signal);
        let mut car_tasks = JoinSet::new();
        for car in &cars {
            car_tasks.spawn(drive(
                Arc::clone(car),
                Arc::clone(&grid),
                tick,
                Arc::clone(&completed),
                completions.clone(),
                shutdown_signal.clone(),
            ));
        }
        drop(completions);
        info!(
            "Simulation started: {} cars, {} traffic lights",
            total,
            light_tasks.len()
        );

        let deadline = config.deadline();
        let expired = async move {
            match deadline {
                Some(limit) => sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expired);

        let mut stop = shutdown_signal;
        let mut completion_order = Vec::with_capacity(total);
        while completion_order.len() < total {
            tokio::select! {
                received = finished.recv() => match received {
                    Some(id) => completion_order.push(id),
                    None => break,
                },
                _ = &mut expired => {
                    warn!(
                        "Deadline reached with {}/{} cars finished, cancelling",
                        completion_order.len(),
                        total
                    );
                    break;
                }
                _ = stop.wait() => {
                    warn!("Shutdown requested, cancelling simulation");
                    break;
                }
            }
        }

        shutdown.trigger();
        for task in light_tasks {
            if let Err(err) = task.await {
                error!("Traffic light task failed: {err}");
            }
        }
        while let Some(result) = car_tasks.join_next().await {
            if let Err(err) = result {
                error!("Car task failed: {err}");
            }
        }
        // Cars that arrived while the run was being cancelled.
        while let Ok(id) = finished.try_recv() {
            completion_order.push(id);
        }

        let outcome = if completion_order.len() == total {
            Outcome::Completed
        } else {
            Outcome::Cancelled
        };
        info!(
            "Simulation finished: {}/{} cars completed ({:?})",
            completion_order.len(),
            total,
            outcome
        );

        SimulationReport {
            outcome,
            routes,
            completion_order,
            cars: cars.iter().map(|car| lock_car(car).status()).collect(),
        }
    }
}

/// Places `count` cars on distinct street cells, each with a route to another
/// street cell. Destinations are re-drawn until a route exists.
fn spawn_cars<R: Rng + ?Sized>(
    grid: &Grid,
    streets: &[Position],
    count: usize,
    route_attempts: usize,
    rng: &mut R,
) -> Result<(Vec<SharedCar>, Vec<CarRoute>), SimulationError> {
    let mut cars = Vec::with_capacity(count);
    let mut routes = Vec::with_capacity(count);

    for (id, picked) in index::sample(rng, streets.len(), count)
        .into_iter()
        .enumerate()
    {
        let start = streets[picked];
        let (goal, route) = pick_destination(grid, streets, start, route_attempts, rng).ok_or(
            SimulationError::NoRoute {
                car: id,
                start,
                attempts: route_attempts,
            },
        )?;

        let placed = grid.occupy(start);
        debug_assert!(placed, "start {start} sampled twice");
        let speed = rng.random_range(MIN_SPEED..MAX_SPEED);
        info!(
            "Spawned car {} at {} heading to {} ({} cells, speed {})",
            id,
            start,
            goal,
            route.len(),
            speed
        );

        routes.push(CarRoute {
            car: id,
            start,
            goal,
            cells: route.clone(),
        });
        cars.push(Arc::new(Mutex::new(Car::new(id, start, speed, route))));
    }

    Ok((cars, routes))
}

fn pick_destination<R: Rng + ?Sized>(
    grid: &Grid,
    streets: &[Position],
    start: Position,
    attempts: usize,
    rng: &mut R,
) -> Option<(Position, Vec<Position>)> {
    for _ in 0..attempts {
        let goal = streets[rng.random_range(0..streets.len())];
        match find_path(grid, start, goal) {
            Ok(route) if !route.is_empty() => return Some((goal, route)),
            Ok(_) => {}
            Err(err) => warn!("Discarding destination for car at {start}: {err}"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cars: i64, lights: i64) -> SimulationConfig {
        SimulationConfig {
            seed: Some(11),
            ..SimulationConfig::new(cars, lights)
        }
    }

    #[test]
    fn builds_cars_on_distinct_occupied_streets() {
        let simulation = Simulation::new(config(16, 3)).unwrap();
        let grid = simulation.grid();
        assert_eq!(simulation.car_count(), 16);
        assert_eq!(grid.occupied_count(), 16);

        let mut starts: Vec<_> = simulation.routes().iter().map(|r| r.start).collect();
        starts.sort();
        starts.dedup();
        assert_eq!(starts.len(), 16);

        for route in simulation.routes() {
            assert!(grid.cell(route.start).unwrap().is_street());
            assert!(grid.cell(route.goal).unwrap().is_street());
            assert_ne!(route.start, route.goal);
            assert_eq!(route.cells.last(), Some(&route.goal));
        }
    }

    #[test]
    fn lights_close_their_cells_before_the_run() {
        let simulation = Simulation::new(config(0, 9)).unwrap();
        assert_eq!(simulation.lights().lights.len(), 9);
        let lights = &simulation.lights().lights;
        for position in lights.iter().flat_map(|light| light.cells.iter()) {
            let state = simulation.grid().cell(*position).unwrap().state();
            assert!(!state.light_open);
        }
    }

    #[test]
    fn invalid_counts_fail_construction() {
        assert_eq!(
            Simulation::new(config(17, 0)).err(),
            Some(SimulationError::TooManyCars {
                requested: 17,
                max: 16
            })
        );
        assert_eq!(
            Simulation::new(config(-2, 0)).err(),
            Some(SimulationError::NegativeCars(-2))
        );
        assert_eq!(
            Simulation::new(config(1, 10)).err(),
            Some(SimulationError::TooManyLights {
                requested: 10,
                available: 9
            })
        );
        assert_eq!(
            Simulation::new(config(1, -1)).err(),
            Some(SimulationError::NegativeLights(-1))
        );
        let empty = SimulationConfig {
            width: 0,
            ..config(0, 0)
        };
        assert_eq!(Simulation::new(empty).err(), Some(SimulationError::EmptyGrid));
    }

    #[test]
    fn unroutable_start_is_a_construction_error() {
        // In a single 7x7 block row 1 only leads to a dead end at (1, 6),
        // and (1, 5) reaches nothing but (1, 6).
        let grid = Grid::new(7);
        let streets = vec![Position::new(1, 5), Position::new(0, 3)];
        let mut rng = StdRng::seed_from_u64(3);
        let result = spawn_cars(&grid, &streets[..1], 1, 4, &mut rng);
        assert!(matches!(result, Err(SimulationError::NoRoute { car: 0, .. })));

        let destination = pick_destination(&grid, &streets, Position::new(1, 5), 8, &mut rng);
        assert_eq!(destination, None);
    }

    #[test]
    fn same_seed_same_routes() {
        let a = Simulation::new(config(8, 4)).unwrap();
        let b = Simulation::new(config(8, 4)).unwrap();
        assert_eq!(a.routes(), b.routes());
    }

    #[tokio::test]
    async fn zero_cars_finish_immediately() {
        let simulation = Simulation::new(config(0, 9)).unwrap();
        let report = simulation.run().await;
        assert_eq!(report.outcome, Outcome::Completed);
        assert!(report.completion_order.is_empty());
        assert!(report.routes.is_empty());
    }
}
