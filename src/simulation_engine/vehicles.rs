use crate::communication::messages::{CarId, CompletionSender, ShutdownSignal};
use crate::simulation_engine::grid::{Grid, Position};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{sleep, Duration};

/// Fastest a car can go: ticks waited between move attempts.
pub const MIN_SPEED: u64 = 50;
/// Slowest a car can go; a car pinned here is treated as stopped.
pub const MAX_SPEED: u64 = 250;
/// Speed change per attempt.
pub const SPEED_STEP: u64 = 10;
/// Blocked attempts after which the car stops backing off gradually.
pub const MAX_IMMOBILITY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: Position, to: Position },
    Blocked,
    /// Route already exhausted, nothing to attempt.
    Arrived,
}

/// Represents a car driving a precomputed route through the grid.
#[derive(Debug, Clone)]
pub struct Car {
    pub id: CarId,
    pub position: Position,
    /// Ticks waited before each move attempt. Lower is faster.
    pub speed: u64,
    /// Cells still to traverse, next cell first.
    pub route: VecDeque<Position>,
    /// Consecutive blocked attempts, 0..=3.
    pub immobility: u8,
    /// Move attempts made so far, successful or not.
    pub attempts: u32,
    pub finished: bool,
}

impl Car {
    pub fn new(id: CarId, start: Position, speed: u64, route: Vec<Position>) -> Self {
        Self {
            id,
            position: start,
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
            route: route.into(),
            immobility: 0,
            attempts: 0,
            finished: false,
        }
    }

    pub fn has_arrived(&self) -> bool {
        self.route.is_empty()
    }

    /// Tries to step onto the next route cell.
    ///
    /// A move needs an open light on the current cell and a free next cell.
    /// Moving speeds the car up; being blocked slows it down until the
    /// immobility counter saturates, after which speed is pinned to the maximum.
    pub fn attempt_move(&mut self, grid: &Grid) -> MoveOutcome {
        let Some(&next) = self.route.front() else {
            return MoveOutcome::Arrived;
        };
        self.attempts += 1;

        if grid.try_move(self.position, next) {
            let from = self.position;
            self.position = next;
            self.route.pop_front();
            self.accelerate();
            self.immobility = 0;
            MoveOutcome::Moved { from, to: next }
        } else {
            self.back_off();
            MoveOutcome::Blocked
        }
    }

    fn accelerate(&mut self) {
        self.speed = self.speed.saturating_sub(SPEED_STEP).max(MIN_SPEED);
    }

    fn back_off(&mut self) {
        if self.immobility < MAX_IMMOBILITY {
            self.immobility += 1;
            self.speed = (self.speed + SPEED_STEP).min(MAX_SPEED);
        } else {
            self.speed = MAX_SPEED;
        }
    }

    pub fn status(&self) -> CarStatus {
        CarStatus {
            id: self.id,
            position: self.position,
            speed: self.speed,
            remaining: self.route.len(),
            attempts: self.attempts,
            finished: self.finished,
        }
    }
}

/// Read-only view of a car for renderers and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarStatus {
    pub id: CarId,
    pub position: Position,
    pub speed: u64,
    pub remaining: usize,
    pub attempts: u32,
    pub finished: bool,
}

/// A car shared between its driving task and observers.
pub type SharedCar = Arc<Mutex<Car>>;

pub fn lock_car(car: &SharedCar) -> MutexGuard<'_, Car> {
    car.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives one car until its route is exhausted or shutdown is signalled.
///
/// On arrival the car vacates its last cell, bumps `completed` and reports its
/// id on the completion channel. A cancelled car vacates its cell without
/// reporting.
pub async fn drive(
    car: SharedCar,
    grid: Arc<Grid>,
    tick: Duration,
    completed: Arc<AtomicUsize>,
    completions: CompletionSender,
    mut shutdown: ShutdownSignal,
) {
    loop {
        let speed = {
            let car = lock_car(&car);
            if car.has_arrived() {
                break;
            }
            car.speed
        };

        let delay = tick.saturating_mul(u32::try_from(speed).unwrap_or(u32::MAX));
        tokio::select! {
            _ = sleep(delay) => {}
            _ = shutdown.wait() => {
                let car = lock_car(&car);
                grid.release(car.position);
                debug!("Car {} cancelled at {}", car.id, car.position);
                return;
            }
        }

        {
            let mut car = lock_car(&car);
            match car.attempt_move(&grid) {
                MoveOutcome::Moved { from, to } => {
                    debug!("Car {} moved {} -> {} (speed {})", car.id, from, to, car.speed)
                }
                MoveOutcome::Blocked => debug!(
                    "Car {} blocked at {} (speed {}, immobile {})",
                    car.id, car.position, car.speed, car.immobility
                ),
                MoveOutcome::Arrived => {}
            }
        }
    }

    let id = {
        let mut car = lock_car(&car);
        grid.release(car.position);
        car.finished = true;
        info!(
            "Car {} reached {} after {} attempts",
            car.id, car.position, car.attempts
        );
        car.id
    };
    completed.fetch_add(1, Ordering::SeqCst);
    if let Err(err) = completions.send(id).await {
        debug!("Car {} completion not delivered: {}", id, err);
    }
}
