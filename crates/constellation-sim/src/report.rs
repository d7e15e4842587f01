//! Plain-text and JSON rendering of query results.

use std::io::Write;

use clap::ValueEnum;
use constellation_routing::export::write_adjacency_matrix;
use constellation_routing::{Route, RouteTable, StationRoute, Topology, TopologyStats};
use ground_stations::CoverageReport;
use orbital_mechanics::SatId;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn join_ids(ids: &[SatId]) -> String {
    ids.iter().map(SatId::to_string).collect::<Vec<_>>().join(" ")
}

fn write_json<W: Write, T: Serialize + ?Sized>(value: &T, mut out: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn route_line(route: &Route) -> String {
    match route.cost {
        Some(cost) => format!(
            "{} to {}: {:>10.3}  path: {}",
            route.from,
            route.to,
            cost,
            join_ids(&route.hops)
        ),
        None => format!("{} to {}: unreachable", route.from, route.to),
    }
}

/// Every pair `from <= to`, one line each.
pub fn write_path_listing<W: Write>(table: &RouteTable, format: OutputFormat, mut out: W) -> Result<()> {
    let routes = table.all_routes()?;
    match format {
        OutputFormat::Json => write_json(&routes, out),
        OutputFormat::Text => {
            for route in &routes {
                writeln!(out, "{}", route_line(route))?;
            }
            Ok(())
        }
    }
}

pub fn write_route<W: Write>(route: &Route, format: OutputFormat, mut out: W) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(route, out),
        OutputFormat::Text => {
            writeln!(out, "{}", route_line(route))?;
            Ok(())
        }
    }
}

pub fn write_station_route<W: Write>(plan: &StationRoute, format: OutputFormat, mut out: W) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(plan, out);
    }

    writeln!(out, "source coverage: {}", join_ids(&plan.uplinks))?;
    writeln!(out, "destination coverage: {}", join_ids(&plan.downlinks))?;
    writeln!(out)?;
    for candidate in &plan.candidates {
        writeln!(out, "{}", route_line(candidate))?;
    }
    writeln!(out)?;
    match &plan.best {
        Some(best) => writeln!(out, "best: {}", route_line(best))?,
        None => writeln!(out, "best: no route between the stations")?,
    }
    Ok(())
}

pub fn write_coverage<W: Write>(report: &CoverageReport, format: OutputFormat, mut out: W) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(report, out),
        OutputFormat::Text => {
            writeln!(out, "{}", report)?;
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct AdjacencyDocument {
    time_s: f64,
    satellites: Vec<SatId>,
    links: Vec<Vec<u8>>,
}

pub fn write_adjacency<W: Write>(topology: &Topology, format: OutputFormat, out: W) -> Result<()> {
    match format {
        OutputFormat::Text => Ok(write_adjacency_matrix(topology, out)?),
        OutputFormat::Json => {
            let satellites: Vec<SatId> = topology.shape().ids().collect();
            let n = satellites.len();
            let links = (0..n)
                .map(|i| {
                    (0..n)
                        .map(|j| {
                            let linked = topology.is_linked(satellites[i], satellites[j])?;
                            Ok(u8::from(linked))
                        })
                        .collect::<Result<Vec<u8>>>()
                })
                .collect::<Result<Vec<_>>>()?;
            write_json(
                &AdjacencyDocument {
                    time_s: topology.time_s(),
                    satellites,
                    links,
                },
                out,
            )
        }
    }
}

pub fn write_stats<W: Write>(stats: &TopologyStats, format: OutputFormat, mut out: W) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(stats, out);
    }

    let km = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.1} km", v));
    writeln!(out, "t = {}", stats.time_s)?;
    writeln!(out, "satellites:     {}", stats.satellites)?;
    writeln!(out, "feasible links: {}", stats.feasible_links)?;
    writeln!(out, "rejected pairs: {}", stats.rejected_pairs)?;
    writeln!(out, "faulted pairs:  {}", stats.faulted_pairs)?;
    writeln!(
        out,
        "link range:     min {} / mean {} / max {}",
        km(stats.min_range_km),
        km(stats.mean_range_km),
        km(stats.max_range_km)
    )?;
    Ok(())
}
