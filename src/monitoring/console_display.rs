// console_display.rs
//
// Text rendering of simulation snapshots: the city map with car labels, a
// speed line per car still driving and the finished counter.

use crate::communication::messages::ShutdownSignal;
use crate::simulation_engine::grid::{CellKind, CellView, LaneDirection};
use crate::simulation_engine::simulation::{SimulationMonitor, SimulationSnapshot};
use crate::simulation_engine::vehicles::CarStatus;
use std::fmt::Write as _;
use std::io::{self, Write};
use tokio::time::{sleep, Duration};

/// Numerator of the tick-to-km/h conversion.
const SPEED_FACTOR: u64 = 1250;
/// Speeds above this many ticks are shown as standing still.
const STOPPED_THRESHOLD: u64 = 240;

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// Converts a tick delay into the km/h figure shown to users.
pub fn display_speed_kmh(speed: u64) -> u64 {
    if speed == 0 || speed > STOPPED_THRESHOLD {
        0
    } else {
        SPEED_FACTOR / speed
    }
}

fn car_label(cars: &[CarStatus], cell: &CellView) -> Option<String> {
    cars.iter()
        .find(|car| !car.finished && car.position == cell.position)
        .map(|car| format!("{:^3}", car.id + 1))
}

fn glyph(cell: &CellView) -> &'static str {
    match cell.kind {
        CellKind::Building => "···",
        CellKind::Road => match cell.direction {
            LaneDirection::Left | LaneDirection::Right => "===",
            LaneDirection::Down | LaneDirection::Up => " ║ ",
            LaneDirection::LeftDown | LaneDirection::RightDown => "  ┼",
            LaneDirection::LeftUp | LaneDirection::RightUp => "┼  ",
            LaneDirection::None => "   ",
        },
    }
}

/// Renders one frame.
pub fn render(snapshot: &SimulationSnapshot) -> String {
    let mut frame = String::new();

    for row in snapshot.cells.chunks(snapshot.width.max(1)) {
        for cell in row {
            match cell.occupied.then(|| car_label(&snapshot.cars, cell)).flatten() {
                Some(label) => frame.push_str(&label),
                None => frame.push_str(glyph(cell)),
            }
        }
        frame.push('\n');
    }

    frame.push('\n');
    for car in snapshot.cars.iter().filter(|car| !car.finished) {
        let _ = writeln!(
            frame,
            "Car {} speed: {} km/h",
            car.id + 1,
            display_speed_kmh(car.speed)
        );
    }
    let _ = writeln!(
        frame,
        "Cars finished: {}/{}",
        snapshot.completed, snapshot.total_cars
    );
    frame.push_str(&"-".repeat(64));
    frame.push('\n');
    frame
}

/// Redraws the console every `refresh` until all cars finished or shutdown.
pub async fn run_display(monitor: SimulationMonitor, refresh: Duration, mut shutdown: ShutdownSignal) {
    loop {
        let frame = render(&monitor.snapshot());
        {
            let mut stdout = io::stdout().lock();
            let _ = write!(stdout, "{CLEAR_SCREEN}{frame}");
            let _ = stdout.flush();
        }
        if monitor.is_finished() || shutdown.is_triggered() {
            break;
        }
        tokio::select! {
            _ = sleep(refresh) => {}
            _ = shutdown.wait() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::simulation_engine::simulation::Simulation;

    #[test]
    fn speed_conversion_matches_reference_table() {
        assert_eq!(display_speed_kmh(50), 25);
        assert_eq!(display_speed_kmh(125), 10);
        assert_eq!(display_speed_kmh(240), 5);
        assert_eq!(display_speed_kmh(241), 0);
        assert_eq!(display_speed_kmh(250), 0);
    }

    #[test]
    fn empty_city_frame() {
        let simulation = Simulation::new(SimulationConfig::new(0, 0)).unwrap();
        let frame = render(&simulation.monitor().snapshot());
        let lines: Vec<&str> = frame.lines().collect();

        assert_eq!(lines[0], "  ┼┼  ".to_owned() + &"===".repeat(5) + "  ┼┼  " + &"===".repeat(5) + "  ┼┼  ");
        assert_eq!(lines[2].chars().count(), 16 * 3);
        assert!(lines[2].contains("···"));
        assert!(frame.contains("Cars finished: 0/0"));
    }

    #[test]
    fn cars_are_labelled_from_one() {
        let config = SimulationConfig {
            seed: Some(5),
            ..SimulationConfig::new(2, 0)
        };
        let simulation = Simulation::new(config).unwrap();
        let frame = render(&simulation.monitor().snapshot());
        assert!(frame.contains(" 1 "));
        assert!(frame.contains(" 2 "));
        assert!(frame.contains("Car 1 speed:"));
        assert!(frame.contains("Car 2 speed:"));
        assert!(frame.contains("Cars finished: 0/2"));
    }
}
