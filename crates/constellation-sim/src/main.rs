//! Constellation routing CLI
//!
//! Usage:
//!   sattrack --config sim.json paths
//!   sattrack --parameters parameter.txt --cost hops station-route
//!   sattrack --config sim.json --time 43200 coverage GS-1

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use constellation_routing::{CancelToken, CostModel};
use constellation_sim::report::{self, OutputFormat};
use constellation_sim::{Scenario, SimConfig, SimError};
use orbital_mechanics::SatId;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "sattrack",
    about = "Time-sliced routing over a LEO satellite constellation"
)]
struct Args {
    /// JSON simulation config
    #[arg(short, long, conflicts_with = "parameters")]
    config: Option<PathBuf>,

    /// Legacy `>>(key): (value)` parameter table
    #[arg(short, long)]
    parameters: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the query time (seconds past epoch)
    #[arg(short, long)]
    time: Option<u32>,

    /// Override the cost model (distance | hops)
    #[arg(long)]
    cost: Option<CostModel>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Distance and path for every satellite pair
    Paths,
    /// Best path between two satellites (defaults to the configured observer/target)
    Route { from: Option<SatId>, to: Option<SatId> },
    /// Best path between two ground stations (defaults to the first two configured)
    StationRoute {
        source: Option<String>,
        destination: Option<String>,
    },
    /// Satellites in view of a ground station
    Coverage { station: Option<String> },
    /// 0/1 link matrix
    Adjacency,
    /// Link counts and range summary
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = match (&args.config, &args.parameters) {
        (Some(path), _) => SimConfig::from_json_file(path)
            .with_context(|| format!("loading config {:?}", path))?,
        (None, Some(path)) => SimConfig::from_parameter_file(path)
            .with_context(|| format!("loading parameter table {:?}", path))?,
        (None, None) => {
            warn!("No configuration given, using the default Walker shell");
            SimConfig::default()
        }
    };
    if let Some(time) = args.time {
        config.time_s = time;
    }
    if let Some(cost) = args.cost {
        config.cost_model = cost;
    }
    config.validate().context("invalid configuration")?;

    info!(
        t = config.time_s,
        cost_model = ?config.cost_model,
        "Running {:?}",
        args.command
    );

    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let command = args.command.clone();
    let format = args.format;
    let output = args.output.clone();

    let mut query = tokio::task::spawn_blocking(move || -> Result<()> {
        let scenario = Scenario::load(config).context("building scenario")?;
        let out: Box<dyn Write> = match &output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating {:?}", path))?,
            )),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        run(&scenario, &command, format, &worker_cancel, out)?;
        Ok(())
    });

    tokio::select! {
        joined = &mut query => joined.context("query task panicked")??,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling query");
            cancel.cancel();
            match query.await.context("query task panicked")? {
                Err(e) if is_cancelled(&e) => info!("Query cancelled"),
                other => other?,
            }
        }
    }

    if let Some(path) = &args.output {
        info!("Wrote {:?}", path);
    }
    Ok(())
}

fn is_cancelled(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<SimError>(),
        Some(SimError::Routing(constellation_routing::RoutingError::Cancelled))
    )
}

fn run(
    scenario: &Scenario,
    command: &Command,
    format: OutputFormat,
    cancel: &CancelToken,
    mut out: Box<dyn Write>,
) -> constellation_sim::Result<()> {
    let config = scenario.config();

    match command {
        Command::Paths => {
            let table = scenario.route_table(config.cost_model, cancel)?;
            report::write_path_listing(&table, format, &mut out)?;
        }
        Command::Route { from, to } => {
            let from = from
                .or(config.observer)
                .ok_or_else(|| SimError::MissingInput("route source (or config observer)".into()))?;
            let to = to
                .or(config.target)
                .ok_or_else(|| SimError::MissingInput("route destination (or config target)".into()))?;
            let table = scenario.route_table(config.cost_model, cancel)?;
            report::write_route(&table.route(from, to)?, format, &mut out)?;
        }
        Command::StationRoute { source, destination } => {
            let (source, destination) = match (source, destination) {
                (Some(s), Some(d)) => (s.clone(), d.clone()),
                _ => scenario.default_station_pair()?,
            };
            let table = scenario.route_table(config.cost_model, cancel)?;
            let plan = scenario.station_route(&table, &source, &destination)?;
            report::write_station_route(&plan, format, &mut out)?;
        }
        Command::Coverage { station } => {
            let station = match station {
                Some(id) => id.clone(),
                None => scenario
                    .stations()
                    .iter()
                    .next()
                    .map(|s| s.id.clone())
                    .ok_or_else(|| SimError::MissingInput("no ground station configured".into()))?,
            };
            let report = scenario.coverage(&station)?;
            report::write_coverage(&report, format, &mut out)?;
        }
        Command::Adjacency => {
            let topology = scenario.topology(cancel)?;
            report::write_adjacency(&topology, format, &mut out)?;
        }
        Command::Stats => {
            let topology = scenario.topology(cancel)?;
            report::write_stats(&topology.stats(), format, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
