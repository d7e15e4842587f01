//! One simulation run: configuration, ephemeris and stations.

use std::fs;

use constellation_routing::{CancelToken, CostModel, RouteTable, StationRoute, Topology};
use ground_stations::{coverage, CoverageReport, StationRegistry};
use orbital_mechanics::walker::satellites_from_catalog;
use orbital_mechanics::{ConstellationShape, LookAngleSource, Satellite, Sgp4Ephemeris};
use tracing::info;

use crate::config::{ConfigError, ConstellationSource, SimConfig};
use crate::{Result, SimError};

pub struct Scenario<S = Sgp4Ephemeris> {
    config: SimConfig,
    shape: ConstellationShape,
    source: S,
    stations: StationRegistry,
}

impl Scenario<Sgp4Ephemeris> {
    /// Builds the SGP4 ephemeris from the configured Walker shell or TLE
    /// catalogue.
    pub fn load(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let shape = config.shape()?;
        let satellites = load_satellites(&config, &shape)?;
        let ephemeris = Sgp4Ephemeris::new(config.epoch, shape, &satellites)?;

        info!(
            satellites = satellites.len(),
            orbits = shape.orbit_count(),
            stations = config.stations.len(),
            "Scenario loaded"
        );
        Self::with_source(config, ephemeris)
    }
}

impl<S: LookAngleSource> Scenario<S> {
    /// Uses `source` as the look-angle service instead of SGP4.
    pub fn with_source(config: SimConfig, source: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shape: config.shape()?,
            stations: config.station_registry()?,
            config,
            source,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn shape(&self) -> &ConstellationShape {
        &self.shape
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn stations(&self) -> &StationRegistry {
        &self.stations
    }

    pub fn time_s(&self) -> f64 {
        f64::from(self.config.time_s)
    }

    pub fn topology(&self, cancel: &CancelToken) -> Result<Topology> {
        let criteria = self.config.link_criteria()?;
        Ok(Topology::build(&self.shape, &self.source, &criteria, self.time_s(), cancel)?)
    }

    pub fn route_table(&self, cost_model: CostModel, cancel: &CancelToken) -> Result<RouteTable> {
        let topology = self.topology(cancel)?;
        Ok(RouteTable::compute(&topology, cost_model, cancel)?)
    }

    pub fn coverage(&self, station_id: &str) -> Result<CoverageReport> {
        let station = self.stations.get(station_id)?;
        let satellites = coverage(
            station,
            &self.shape,
            &self.source,
            self.time_s(),
            &self.config.coverage,
        )?;
        Ok(CoverageReport {
            station: station.id.clone(),
            time_s: self.time_s(),
            satellites,
        })
    }

    /// Best path from any satellite covering `source` to any satellite
    /// covering `destination`.
    pub fn station_route(&self, table: &RouteTable, source: &str, destination: &str) -> Result<StationRoute> {
        let uplinks = self.coverage(source)?.satellites;
        let downlinks = self.coverage(destination)?.satellites;
        Ok(StationRoute::plan(table, &uplinks, &downlinks)?)
    }

    /// The first and second configured stations, the legacy source/destination pair.
    pub fn default_station_pair(&self) -> Result<(String, String)> {
        let mut ids = self.stations.iter().map(|s| s.id.clone());
        match (ids.next(), ids.next()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(SimError::MissingInput(
                "station route needs two configured stations".into(),
            )),
        }
    }
}

fn load_satellites(config: &SimConfig, shape: &ConstellationShape) -> Result<Vec<Satellite>> {
    match &config.constellation {
        ConstellationSource::Walker { .. } => {
            let walker = config
                .walker()
                .ok_or_else(|| ConfigError::Invalid("walker constellation expected".into()))?;
            Ok(walker.satellites(config.epoch)?)
        }
        ConstellationSource::TleFile { path } => {
            info!("Loading TLE catalogue from {:?}", path);
            let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(satellites_from_catalog(&text, shape)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ShapeConfig, StationConfig, ToleranceConfig};
    use orbital_mechanics::{Aer, Body, OrbitalError, SatId};

    /// Satellites on a ring, 1000 km apart by slot distance; every
    /// satellite of orbit 0 is overhead of every station.
    struct Ring {
        shape: ConstellationShape,
    }

    impl LookAngleSource for Ring {
        fn look_angles(&self, from: &Body, to: &Body, _t_s: f64) -> orbital_mechanics::Result<Aer> {
            match (from, to) {
                (Body::Satellite(a), Body::Satellite(b)) => {
                    let n = self.shape.total();
                    let (i, j) = (self.shape.index_of(*a)?, self.shape.index_of(*b)?);
                    let d = i.abs_diff(j).min(n - i.abs_diff(j));
                    Ok(Aer::new(0.0, 0.0, 1000.0 * d as f64))
                }
                (Body::Ground(_), Body::Satellite(id)) => {
                    let elevation = if id.orbit == 0 { 60.0 } else { -30.0 };
                    Ok(Aer::new(0.0, elevation, 800.0))
                }
                _ => Err(OrbitalError::InvalidCoordinates("unsupported pair".into())),
            }
        }
    }

    fn config() -> SimConfig {
        let station = |id: &str, longitude| StationConfig {
            id: id.into(),
            name: String::new(),
            latitude: 0.0,
            longitude,
            altitude_m: 0.0,
        };
        SimConfig {
            shape: ShapeConfig {
                orbit_count: 2,
                sats_per_orbit: 3,
                total_sat_count: 6,
            },
            tolerance: ToleranceConfig {
                azimuth_deg: 1.0,
                elevation_deg: 1.0,
                range_km: 1000.0,
            },
            acquisition_delay_s: 0.0,
            stations: vec![station("GS-A", 10.0), station("GS-B", 20.0)],
            ..SimConfig::default()
        }
    }

    fn scenario() -> Scenario<Ring> {
        let shape = ConstellationShape::new(2, 3, 6).unwrap();
        Scenario::with_source(config(), Ring { shape }).unwrap()
    }

    #[test]
    fn test_topology_and_routes() {
        let scenario = scenario();
        let cancel = CancelToken::new();

        assert_eq!(scenario.topology(&cancel).unwrap().link_count(), 6);

        let table = scenario.route_table(CostModel::HopCount, &cancel).unwrap();
        let route = table.route(SatId::new(0, 0), SatId::new(1, 0)).unwrap();
        assert_eq!(route.hop_count(), Some(3));
    }

    #[test]
    fn test_coverage_and_station_route() {
        let scenario = scenario();
        let report = scenario.coverage("GS-A").unwrap();
        assert_eq!(
            report.satellites,
            vec![SatId::new(0, 0), SatId::new(0, 1), SatId::new(0, 2)]
        );

        let table = scenario.route_table(CostModel::HopCount, &CancelToken::new()).unwrap();
        let (a, b) = scenario.default_station_pair().unwrap();
        let plan = scenario.station_route(&table, &a, &b).unwrap();
        // Both stations see the same satellites, so the best route is a
        // single satellite
        assert_eq!(plan.best.unwrap().hops.len(), 1);
    }

    #[test]
    fn test_unknown_station() {
        assert!(matches!(
            scenario().coverage("GS-Z"),
            Err(SimError::Station(ground_stations::StationError::NotFound(_)))
        ));
    }

    #[test]
    fn test_walker_scenario_loads() {
        let scenario = Scenario::load(config()).unwrap();
        assert_eq!(scenario.shape().total(), 6);
        let aer = scenario
            .source()
            .look_angles(&Body::Satellite(SatId::new(0, 0)), &Body::Satellite(SatId::new(0, 1)), 0.0)
            .unwrap();
        assert!(aer.range_km > 1000.0);
    }

    #[test]
    fn test_missing_catalogue_is_config_error() {
        let mut config = config();
        config.constellation = ConstellationSource::TleFile {
            path: "/nonexistent/catalog.tle".into(),
        };
        assert!(matches!(
            Scenario::load(config),
            Err(SimError::Config(ConfigError::Io { .. }))
        ));
    }
}
