// simulation_main.rs
use anyhow::{anyhow, Context, Result};
use city_traffic::monitoring::console_display::run_display;
use city_traffic::monitoring::path_report::{format_paths, write_paths_csv, write_report_json};
use city_traffic::{Simulation, SimulationConfig};
use clap::Parser;
use log::info;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "simulation_main")]
#[command(about = "Cars and traffic lights on a synthetic city grid")]
struct Cli {
    /// Number of cars (prompted for when not given)
    #[arg(long, allow_negative_numbers = true)]
    cars: Option<i64>,

    /// Number of traffic lights (prompted for when not given)
    #[arg(long, allow_negative_numbers = true)]
    lights: Option<i64>,

    /// JSON file with simulation settings; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible light and car placement
    #[arg(long)]
    seed: Option<u64>,

    /// Cancel the run after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Length of one simulation tick in microseconds
    #[arg(long)]
    tick_micros: Option<u64>,

    /// Console refresh interval in milliseconds
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// Do not draw the city while the simulation runs
    #[arg(long)]
    no_display: bool,

    /// Write the full run report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write every car's route as CSV
    #[arg(long)]
    paths_csv: Option<PathBuf>,
}

fn prompt_count(label: &str) -> Result<i64> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    line.trim()
        .parse()
        .with_context(|| format!("`{}` is not a valid number of {}", line.trim(), label.to_lowercase()))
}

fn build_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            SimulationConfig::from_json_str(&json)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };
    let from_file = cli.config.is_some();

    config.cars = match cli.cars {
        Some(cars) => cars,
        None if from_file => config.cars,
        None => prompt_count("Cars")?,
    };
    config.lights = match cli.lights {
        Some(lights) => lights,
        None if from_file => config.lights,
        None => prompt_count("Stoplights")?,
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if cli.deadline_secs.is_some() {
        config.deadline_secs = cli.deadline_secs;
    }
    if let Some(tick_micros) = cli.tick_micros {
        config.tick_micros = tick_micros;
    }
    if let Some(refresh_ms) = cli.refresh_ms {
        config.refresh_ms = refresh_ms;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let refresh = config.refresh_interval();
    let simulation = Simulation::new(config).context("invalid simulation parameters")?;
    info!(
        "{} cars placed, {} of {} intersections under traffic lights",
        simulation.car_count(),
        simulation.lights().lights.len(),
        simulation.intersections().len()
    );

    let shutdown = simulation.shutdown_handle();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.trigger();
        }
    });

    let display = (!cli.no_display)
        .then(|| tokio::spawn(run_display(simulation.monitor(), refresh, shutdown.subscribe())));

    let report = simulation.run().await;
    if let Some(display) = display {
        display.await?;
    }

    print!("{}", format_paths(&report.routes));
    println!("Simulation finished ({:?}).", report.outcome);

    if let Some(path) = &cli.report {
        write_report_json(path, &report)
            .map_err(|err| anyhow!("writing report {}: {err}", path.display()))?;
    }
    if let Some(path) = &cli.paths_csv {
        write_paths_csv(path, &report.routes)
            .map_err(|err| anyhow!("writing paths {}: {err}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file_which_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("city_traffic_cli_{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "cars": 5, "lights": 1, "tick_micros": 77, "refresh_ms": 10 }"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "simulation_main",
            "--config",
            path.to_str().unwrap(),
            "--lights",
            "3",
            "--seed",
            "9",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.cars, 5);
        assert_eq!(config.lights, 3);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.tick_micros, 77);
        assert_eq!(config.refresh_ms, 10);
        assert_eq!(config.width, SimulationConfig::default().width);
        assert_eq!(config.deadline_secs, None);
    }

    #[test]
    fn flags_alone_fill_in_defaults() {
        let cli = Cli::try_parse_from([
            "simulation_main",
            "--cars",
            "-2",
            "--lights",
            "0",
            "--tick-micros",
            "500",
            "--deadline-secs",
            "4",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();

        let expected = SimulationConfig {
            cars: -2,
            lights: 0,
            tick_micros: 500,
            deadline_secs: Some(4),
            ..SimulationConfig::default()
        };
        assert_eq!(config, expected);
    }

    #[test]
    fn unreadable_config_file_is_an_error() {
        let cli = Cli::try_parse_from([
            "simulation_main",
            "--config",
            "/nonexistent/city_traffic.json",
        ])
        .unwrap();
        assert!(build_config(&cli).is_err());
    }
}
