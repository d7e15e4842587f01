//! Constellation Simulation Driver
//!
//! Loads a validated [`SimConfig`], builds the SGP4 ephemeris for the
//! constellation and answers one query per invocation:
//!
//! | Query | Output |
//! |-------|--------|
//! | all-pairs listing | distance and path for every pair `i <= j` |
//! | route | best path between two satellites |
//! | station route | best uplink/downlink path between two ground stations |
//! | coverage | satellites in view of a ground station |
//! | adjacency | 0/1 link matrix for downstream tooling |
//! | stats | link counts and range summary |

use thiserror::Error;

pub mod config;
pub mod report;
pub mod scenario;

pub use config::{ConfigError, SimConfig};
pub use report::OutputFormat;
pub use scenario::Scenario;

#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Orbital(#[from] orbital_mechanics::OrbitalError),
    #[error(transparent)]
    Station(#[from] ground_stations::StationError),
    #[error(transparent)]
    Routing(#[from] constellation_routing::RoutingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing query input: {0}")]
    MissingInput(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
