use crate::error::SimulationError;
use crate::simulation_engine::grid::DEFAULT_WIDTH;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Half-open range of simulation ticks, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRange {
    pub min: u64,
    pub max: u64,
}

impl TickRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn validate(&self, name: &'static str) -> Result<(), SimulationError> {
        if self.min == 0 || self.min >= self.max {
            return Err(SimulationError::InvalidRange {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.random_range(self.min..self.max)
    }
}

/// Everything needed to set up one run.
///
/// Counts are signed because they come straight from user input; negative
/// values are rejected when the simulation is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub cars: i64,
    pub lights: i64,
    pub width: usize,
    /// Hard cap on cars, further limited by the number of street cells.
    pub max_cars: usize,
    /// Light cycle period in ticks.
    pub light_period: TickRange,
    /// Length of one tick in microseconds. Car speeds and light periods are
    /// expressed in ticks.
    pub tick_micros: u64,
    /// Destinations tried per car before giving up on finding a route.
    pub route_attempts: usize,
    /// Cancel the run after this many seconds, e.g. to break gridlock.
    pub deadline_secs: Option<u64>,
    pub seed: Option<u64>,
    /// Console refresh interval in milliseconds.
    pub refresh_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cars: 0,
            lights: 0,
            width: DEFAULT_WIDTH,
            max_cars: DEFAULT_WIDTH,
            light_period: TickRange::new(4000, 6000),
            tick_micros: 1000,
            route_attempts: 32,
            deadline_secs: None,
            seed: None,
            refresh_ms: 1000,
        }
    }
}

impl SimulationConfig {
    pub fn new(cars: i64, lights: i64) -> Self {
        Self {
            cars,
            lights,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_micros(self.tick_micros.max(1))
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(1))
    }

    /// Validates the car count against `street_cells`, the number of cells a
    /// car may start on.
    pub fn validated_cars(&self, street_cells: usize) -> Result<usize, SimulationError> {
        let requested = usize::try_from(self.cars)
            .map_err(|_| SimulationError::NegativeCars(self.cars))?;
        let max = self.max_cars.min(street_cells);
        if requested > max {
            return Err(SimulationError::TooManyCars { requested, max });
        }
        Ok(requested)
    }

    pub fn validated_lights(&self, intersections: usize) -> Result<usize, SimulationError> {
        let requested = usize::try_from(self.lights)
            .map_err(|_| SimulationError::NegativeLights(self.lights))?;
        if requested > intersections {
            return Err(SimulationError::TooManyLights {
                requested,
                available: intersections,
            });
        }
        Ok(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn car_count_bounds() {
        let config = SimulationConfig::new(16, 0);
        assert_eq!(config.validated_cars(120), Ok(16));
        assert_eq!(
            SimulationConfig::new(17, 0).validated_cars(120),
            Err(SimulationError::TooManyCars {
                requested: 17,
                max: 16
            })
        );
        assert_eq!(
            SimulationConfig::new(-1, 0).validated_cars(120),
            Err(SimulationError::NegativeCars(-1))
        );
        // A tiny grid caps the count below `max_cars`.
        assert_eq!(
            SimulationConfig::new(5, 0).validated_cars(4),
            Err(SimulationError::TooManyCars {
                requested: 5,
                max: 4
            })
        );
    }

    #[test]
    fn light_count_bounds() {
        let config = SimulationConfig::new(0, 9);
        assert_eq!(config.validated_lights(9), Ok(9));
        assert_eq!(
            SimulationConfig::new(0, 10).validated_lights(9),
            Err(SimulationError::TooManyLights {
                requested: 10,
                available: 9
            })
        );
        assert_eq!(
            SimulationConfig::new(0, -3).validated_lights(9),
            Err(SimulationError::NegativeLights(-3))
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = SimulationConfig::from_json_str(r#"{ "cars": 4, "lights": 2 }"#).unwrap();
        assert_eq!(config.cars, 4);
        assert_eq!(config.lights, 2);
        assert_eq!(config.width, DEFAULT_WIDTH);
        assert_eq!(config.light_period, TickRange::new(4000, 6000));
        assert_eq!(config.tick(), Duration::from_millis(1));
        assert_eq!(config.deadline(), None);
    }

    #[test]
    fn empty_ranges_are_rejected() {
        assert!(TickRange::new(10, 10).validate("light_period").is_err());
        assert!(TickRange::new(0, 10).validate("light_period").is_err());
        assert!(TickRange::new(1, 2).validate("light_period").is_ok());
    }
}
