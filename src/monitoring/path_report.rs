use crate::simulation_engine::simulation::{CarRoute, SimulationReport};
use serde::Serialize;
use std::error::Error;
use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;

/// One route cell, as written to the CSV export.
#[derive(Debug, Serialize)]
pub struct PathRecord {
    pub car: usize,
    pub step: usize,
    pub row: usize,
    pub col: usize,
}

/// Human-readable listing of every car's route, one numbered cell per line.
pub fn format_paths(routes: &[CarRoute]) -> String {
    let mut report = String::new();
    for route in routes {
        let _ = writeln!(report, "path of car {}:", route.car + 1);
        for (step, cell) in route.cells.iter().enumerate() {
            let _ = writeln!(report, "{}.- ({}, {})", step, cell.row, cell.col);
        }
    }
    report
}

pub fn path_records(routes: &[CarRoute]) -> Vec<PathRecord> {
    routes
        .iter()
        .flat_map(|route| {
            route.cells.iter().enumerate().map(|(step, cell)| PathRecord {
                car: route.car + 1,
                step,
                row: cell.row,
                col: cell.col,
            })
        })
        .collect()
}

pub fn write_paths_csv(path: &Path, routes: &[CarRoute]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_writer(File::create(path)?);
    for record in path_records(routes) {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_report_json(path: &Path, report: &SimulationReport) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
