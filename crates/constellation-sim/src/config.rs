//! Simulation configuration
//!
//! One validated [`SimConfig`] drives a query. It is read from JSON, or from
//! the legacy `parameter.txt` table where every line has the form
//! `>>(key): (value)unit`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use constellation_routing::{AerTolerance, CostModel, FaultPolicy, LinkCriteria};
use ground_stations::{CoverageCriteria, GeoLocation, GroundStation, StationRegistry, TimeSampling};
use orbital_mechanics::{ConstellationShape, SatId, WalkerDelta};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Seconds in the one-day simulation window
pub const DAY_SECONDS: u32 = 86_400;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing parameter: {0}")]
    MissingKey(String),
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeConfig {
    pub orbit_count: u32,
    pub sats_per_orbit: u32,
    pub total_sat_count: usize,
}

/// Where the satellite element sets come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstellationSource {
    /// Synthetic Walker-delta shell over the configured shape
    Walker {
        altitude_km: f64,
        inclination_deg: f64,
        phasing: u32,
        #[serde(default = "default_eccentricity")]
        eccentricity: f64,
    },
    /// 2-line or 3-line TLE catalogue, assigned to ids in file order
    TleFile { path: PathBuf },
}

fn default_eccentricity() -> f64 {
    0.0001
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl StationConfig {
    pub fn to_station(&self) -> ground_stations::Result<GroundStation> {
        let name = if self.name.is_empty() { &self.id } else { &self.name };
        GroundStation::new(
            self.id.clone(),
            name.clone(),
            GeoLocation {
                latitude: self.latitude,
                longitude: self.longitude,
                altitude_m: self.altitude_m,
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub shape: ShapeConfig,
    /// Instant of `t = 0`
    pub epoch: DateTime<Utc>,
    pub constellation: ConstellationSource,
    pub tolerance: ToleranceConfig,
    /// Pointing/re-acquisition time a link must stay within tolerance for
    pub acquisition_delay_s: f64,
    pub coverage: CoverageCriteria,
    /// Query time, seconds past `epoch`
    pub time_s: u32,
    pub cost_model: CostModel,
    pub fault_policy: FaultPolicy,
    pub stations: Vec<StationConfig>,
    pub observer: Option<SatId>,
    pub target: Option<SatId>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            shape: ShapeConfig {
                orbit_count: 6,
                sats_per_orbit: 11,
                total_sat_count: 66,
            },
            epoch: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            constellation: ConstellationSource::Walker {
                altitude_km: 550.0,
                inclination_deg: 53.0,
                phasing: 1,
                eccentricity: default_eccentricity(),
            },
            tolerance: ToleranceConfig {
                azimuth_deg: 5.0,
                elevation_deg: 5.0,
                range_km: 5000.0,
            },
            acquisition_delay_s: 10.0,
            coverage: CoverageCriteria::default(),
            time_s: 0,
            cost_model: CostModel::Distance,
            fault_policy: FaultPolicy::Record,
            stations: Vec::new(),
            observer: None,
            target: None,
        }
    }
}

impl SimConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {:?}", path);
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_parameter_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading parameter table from {:?}", path);
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_parameter_table(&text)
    }

    /// Builds a configuration from the legacy `>>(key): (value)unit` table.
    ///
    /// Shape and tolerance keys are required; everything else falls back to
    /// [`SimConfig::default`]. Station altitudes in the table are in km.
    pub fn from_parameter_table(text: &str) -> Result<Self> {
        let table = parse_parameter_table(text)?;
        debug!(keys = table.len(), "Parameter table parsed");

        let mut config = SimConfig {
            shape: ShapeConfig {
                orbit_count: required(&table, "orbitCount")?,
                sats_per_orbit: required(&table, "satCountPerOrbit")?,
                total_sat_count: required(&table, "totalSatCount")?,
            },
            tolerance: ToleranceConfig {
                azimuth_deg: required(&table, "acceptableAzimuthDif")?,
                elevation_deg: required(&table, "acceptableElevationDif")?,
                range_km: required(&table, "acceptableRange")?,
            },
            ..SimConfig::default()
        };

        if let Some(delay) = optional(&table, "PAT_time")? {
            config.acquisition_delay_s = delay;
        }
        if let Some(elevation) = optional(&table, "groundStationAcceptableElevation")? {
            config.coverage.min_elevation_deg = elevation;
        }
        if let Some(distance) = optional(&table, "groundStationAcceptableDistance")? {
            config.coverage.max_range_km = distance;
        }
        if let Some(round) = table.get("round") {
            config.coverage.sampling = match round.to_ascii_uppercase().as_str() {
                "Y" => TimeSampling::Snap,
                "N" => TimeSampling::Exact,
                "I" | "INTERVAL" => TimeSampling::Interval,
                _ => return Err(invalid("round", round)),
            };
        }
        if let Some(time) = optional(&table, "time")? {
            config.time_s = time;
        }

        for suffix in ["", "1", "2"] {
            let lat_key = format!("stationLatitude{}", suffix);
            let lon_key = format!("stationLongitude{}", suffix);
            let (latitude, longitude) = match (optional::<f64>(&table, &lat_key)?, optional::<f64>(&table, &lon_key)?) {
                (Some(lat), Some(lon)) => (lat, lon),
                (None, None) => continue,
                (Some(_), None) => return Err(ConfigError::MissingKey(lon_key)),
                (None, Some(_)) => return Err(ConfigError::MissingKey(lat_key)),
            };
            let altitude_km: f64 = optional(&table, &format!("stationAltitude{}", suffix))?.unwrap_or(0.0);
            let id = format!("station{}", suffix);
            config.stations.push(StationConfig {
                name: id.clone(),
                id,
                latitude,
                longitude,
                altitude_m: altitude_km * 1000.0,
            });
        }

        let shape = config.shape()?;
        config.observer = table
            .get("observerId")
            .map(|v| parse_sat_ref("observerId", v, &shape))
            .transpose()?;
        config.target = table
            .get("otherId")
            .map(|v| parse_sat_ref("otherId", v, &shape))
            .transpose()?;

        config.validate()?;
        Ok(config)
    }

    pub fn shape(&self) -> Result<ConstellationShape> {
        let ShapeConfig {
            orbit_count,
            sats_per_orbit,
            total_sat_count,
        } = self.shape;
        ConstellationShape::new(orbit_count, sats_per_orbit, total_sat_count)
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Rejects every malformed field before any matrix is built.
    pub fn validate(&self) -> Result<()> {
        let shape = self.shape()?;

        let ToleranceConfig {
            azimuth_deg,
            elevation_deg,
            range_km,
        } = self.tolerance;
        for (key, value) in [
            ("tolerance.azimuth_deg", azimuth_deg),
            ("tolerance.elevation_deg", elevation_deg),
            ("tolerance.range_km", range_km),
            ("acquisition_delay_s", self.acquisition_delay_s),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, value));
            }
        }

        if self.time_s >= DAY_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "time {} s outside the simulation day [0, {})",
                self.time_s, DAY_SECONDS
            )));
        }

        if !(-90.0..=90.0).contains(&self.coverage.min_elevation_deg) {
            return Err(invalid("coverage.min_elevation_deg", self.coverage.min_elevation_deg));
        }
        if !self.coverage.max_range_km.is_finite() || self.coverage.max_range_km <= 0.0 {
            return Err(invalid("coverage.max_range_km", self.coverage.max_range_km));
        }

        if let ConstellationSource::Walker {
            altitude_km,
            inclination_deg,
            phasing,
            eccentricity,
        } = &self.constellation
        {
            if !altitude_km.is_finite() || *altitude_km <= 0.0 {
                return Err(invalid("constellation.altitude_km", altitude_km));
            }
            if !(0.0..=180.0).contains(inclination_deg) {
                return Err(invalid("constellation.inclination_deg", inclination_deg));
            }
            if *phasing >= shape.orbit_count() {
                return Err(invalid("constellation.phasing", phasing));
            }
            if !(0.0..1.0).contains(eccentricity) {
                return Err(invalid("constellation.eccentricity", eccentricity));
            }
        }

        self.station_registry()?;

        for (key, id) in [("observer", self.observer), ("target", self.target)] {
            if let Some(id) = id {
                if !shape.contains(id) {
                    return Err(invalid(key, id));
                }
            }
        }

        Ok(())
    }

    pub fn link_criteria(&self) -> Result<LinkCriteria> {
        let tolerance = AerTolerance::new(
            "isl",
            self.tolerance.azimuth_deg,
            self.tolerance.elevation_deg,
            self.tolerance.range_km,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(LinkCriteria {
            tolerance,
            acquisition_delay_s: self.acquisition_delay_s,
            fault_policy: self.fault_policy,
        })
    }

    pub fn station_registry(&self) -> Result<StationRegistry> {
        let stations = self
            .stations
            .iter()
            .map(StationConfig::to_station)
            .collect::<ground_stations::Result<Vec<_>>>()
            .and_then(|stations| StationRegistry::from_stations(stations))
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(stations)
    }

    /// Walker pattern over the configured shape, if the constellation is
    /// synthetic.
    pub fn walker(&self) -> Option<WalkerDelta> {
        match &self.constellation {
            ConstellationSource::Walker {
                altitude_km,
                inclination_deg,
                phasing,
                eccentricity,
            } => Some(WalkerDelta {
                total_satellites: self.shape.total_sat_count as u32,
                planes: self.shape.orbit_count,
                phasing: *phasing,
                altitude_km: *altitude_km,
                inclination_deg: *inclination_deg,
                eccentricity: *eccentricity,
            }),
            ConstellationSource::TleFile { .. } => None,
        }
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Splits `>>(key): (value)unit` lines into a key/value table.
///
/// Lines without the `>>` marker are comments. A later key overrides an
/// earlier one.
pub fn parse_parameter_table(text: &str) -> Result<HashMap<String, String>> {
    let mut table = HashMap::new();
    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(">>") else {
            continue;
        };
        let malformed = || ConfigError::Invalid(format!("line {}: malformed parameter '{}'", n + 1, line));

        let (key, value) = rest.split_once(':').ok_or_else(malformed)?;
        let key = key
            .trim()
            .strip_prefix('(')
            .and_then(|k| k.strip_suffix(')'))
            .ok_or_else(malformed)?;
        let value = value.trim().strip_prefix('(').ok_or_else(malformed)?;
        let (value, _unit) = value.split_once(')').ok_or_else(malformed)?;

        table.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(table)
}

fn optional<T: std::str::FromStr>(table: &HashMap<String, String>, key: &str) -> Result<Option<T>> {
    table
        .get(key)
        .map(|value| value.parse().map_err(|_| invalid(key, value)))
        .transpose()
}

fn required<T: std::str::FromStr>(table: &HashMap<String, String>, key: &str) -> Result<T> {
    optional(table, key)?.ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

/// `"<orbit>-<slot>"`, or a bare dense index.
fn parse_sat_ref(key: &str, value: &str, shape: &ConstellationShape) -> Result<SatId> {
    let id = match value.parse::<usize>() {
        Ok(index) => shape.sat_id(index).ok(),
        Err(_) => value.parse::<SatId>().ok(),
    };
    id.filter(|id| shape.contains(*id))
        .ok_or_else(|| invalid(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TABLE: &str = "\
# constellation
>>(orbitCount): (6)
>>(satCountPerOrbit): (11)
>>(totalSatCount): (66)
>>(acceptableAzimuthDif): (2.5)degree
>>(acceptableElevationDif): (1.5)degree
>>(acceptableRange): (4000)km
>>(PAT_time): (15)second
>>(groundStationAcceptableElevation): (10)degree
>>(groundStationAcceptableDistance): (1500)km
>>(round): (N)
>>(stationLatitude1): (25.03)
>>(stationLongitude1): (121.56)
>>(stationAltitude1): (0.01)km
>>(stationLatitude2): (35.68)
>>(stationLongitude2): (139.69)
>>(observerId): (1-3)
>>(otherId): (40)
>>(time):(43200)second";

    #[test]
    fn test_parameter_table_maps_keys() {
        let config = SimConfig::from_parameter_table(TABLE).unwrap();

        assert_eq!(config.shape().unwrap().total(), 66);
        assert_eq!(config.tolerance.azimuth_deg, 2.5);
        assert_eq!(config.tolerance.range_km, 4000.0);
        assert_eq!(config.acquisition_delay_s, 15.0);
        assert_eq!(config.coverage.min_elevation_deg, 10.0);
        assert_eq!(config.coverage.max_range_km, 1500.0);
        assert_eq!(config.coverage.sampling, TimeSampling::Exact);
        assert_eq!(config.time_s, 43200);
        assert_eq!(config.observer, Some(SatId::new(1, 3)));
        assert_eq!(config.target, Some(SatId::new(3, 7)));

        assert_eq!(config.stations.len(), 2);
        assert_eq!(config.stations[0].id, "station1");
        assert!((config.stations[0].altitude_m - 10.0).abs() < 1e-9);
        assert_eq!(config.stations[1].altitude_m, 0.0);
    }

    #[test]
    fn test_parameter_table_errors() {
        let non_numeric = TABLE.replace("(2.5)", "(wide)");
        assert!(matches!(
            SimConfig::from_parameter_table(&non_numeric),
            Err(ConfigError::InvalidValue { key, .. }) if key == "acceptableAzimuthDif"
        ));

        let missing = TABLE.replace(">>(totalSatCount): (66)", "");
        assert!(matches!(
            SimConfig::from_parameter_table(&missing),
            Err(ConfigError::MissingKey(key)) if key == "totalSatCount"
        ));

        let inconsistent = TABLE.replace("(66)", "(67)");
        assert!(matches!(
            SimConfig::from_parameter_table(&inconsistent),
            Err(ConfigError::Invalid(_))
        ));

        let late = TABLE.replace("(43200)", "(86400)");
        assert!(SimConfig::from_parameter_table(&late).is_err());

        let malformed = format!("{}\n>>orbitCount 6", TABLE);
        assert!(SimConfig::from_parameter_table(&malformed).is_err());
    }

    #[test]
    fn test_validate_rejects_each_field() {
        assert!(SimConfig::default().validate().is_ok());

        let mut c = SimConfig::default();
        c.tolerance.elevation_deg = -1.0;
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.tolerance.range_km = f64::INFINITY;
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.acquisition_delay_s = f64::NAN;
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.time_s = DAY_SECONDS;
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.coverage.min_elevation_deg = 91.0;
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.coverage.max_range_km = 0.0;
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.shape.total_sat_count = 65;
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.observer = Some(SatId::new(6, 0));
        assert!(c.validate().is_err());

        let mut c = SimConfig::default();
        c.stations = vec![
            StationConfig {
                id: "a".into(),
                name: String::new(),
                latitude: 0.0,
                longitude: 0.0,
                altitude_m: 0.0,
            };
            2
        ];
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_json_file_round_trip() {
        let json = r#"{
            "shape": {"orbit_count": 2, "sats_per_orbit": 3, "total_sat_count": 6},
            "constellation": {"kind": "tle_file", "path": "catalog.tle"},
            "tolerance": {"azimuth_deg": 1.0, "elevation_deg": 1.0, "range_km": 3000.0},
            "coverage": {"min_elevation_deg": 15.0, "max_range_km": 1200.0, "sampling": "interval"},
            "cost_model": "hop_count",
            "fault_policy": "abort",
            "stations": [{"id": "GS-1", "latitude": 25.0, "longitude": 121.5}],
            "observer": {"orbit": 0, "slot": 1},
            "time_s": 600
        }"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = SimConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.cost_model, CostModel::HopCount);
        assert_eq!(config.fault_policy, FaultPolicy::Abort);
        assert_eq!(config.coverage.sampling, TimeSampling::Interval);
        assert_eq!(config.observer, Some(SatId::new(0, 1)));
        assert!(config.walker().is_none());
        assert_eq!(config.station_registry().unwrap().get("GS-1").unwrap().name, "GS-1");
        // Defaults fill the rest
        assert_eq!(config.acquisition_delay_s, 10.0);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SimConfig::from_json_file("/nonexistent/sim.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
