//! Ground Stations Library
//!
//! Ground terminals of the constellation and the satellites each one can
//! reach at a given instant.

use orbital_mechanics::{Body, GeodeticPosition, OrbitalError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod coverage;

pub use coverage::{coverage, CoverageCriteria, CoverageReport, TimeSampling};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StationError {
    #[error("Station not found: {0}")]
    NotFound(String),
    #[error("Duplicate station id: {0}")]
    Duplicate(String),
    #[error("Invalid location for {station}: {reason}")]
    InvalidLocation { station: String, reason: String },
    #[error("Invalid coverage criteria: {0}")]
    InvalidCriteria(String),
    #[error("Propagation failed: {0}")]
    Propagation(#[from] OrbitalError),
}

pub type Result<T> = std::result::Result<T, StationError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundStation {
    pub id: String,
    pub name: String,
    pub location: GeoLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
}

impl GroundStation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: GeoLocation) -> Result<Self> {
        let station = Self {
            id: id.into(),
            name: name.into(),
            location,
        };
        station.validate()?;
        Ok(station)
    }

    pub fn validate(&self) -> Result<()> {
        let GeoLocation {
            latitude,
            longitude,
            altitude_m,
        } = self.location;
        let reason = if !(-90.0..=90.0).contains(&latitude) {
            Some(format!("latitude {} outside [-90, 90]", latitude))
        } else if !(-180.0..=180.0).contains(&longitude) {
            Some(format!("longitude {} outside [-180, 180]", longitude))
        } else if !altitude_m.is_finite() {
            Some(format!("altitude {} m", altitude_m))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(StationError::InvalidLocation {
                station: self.id.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    pub fn geodetic(&self) -> GeodeticPosition {
        GeodeticPosition {
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            altitude_km: self.location.altitude_m / 1000.0,
        }
    }

    /// The station as an observer for the look-angle service.
    pub fn body(&self) -> Body {
        Body::Ground(self.geodetic())
    }
}

/// Stations known to one simulation run.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: Vec<GroundStation>,
}

impl StationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_stations(stations: impl IntoIterator<Item = GroundStation>) -> Result<Self> {
        let mut registry = Self::new();
        for station in stations {
            registry.add(station)?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, station: GroundStation) -> Result<()> {
        station.validate()?;
        if self.stations.iter().any(|s| s.id == station.id) {
            return Err(StationError::Duplicate(station.id));
        }
        self.stations.push(station);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&GroundStation> {
        self.stations
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StationError::NotFound(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroundStation> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taipei() -> GroundStation {
        GroundStation::new(
            "GS-1",
            "Taipei",
            GeoLocation {
                latitude: 25.03,
                longitude: 121.56,
                altitude_m: 10.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_location() {
        let bad = GroundStation::new(
            "GS-X",
            "Nowhere",
            GeoLocation {
                latitude: 91.0,
                longitude: 0.0,
                altitude_m: 0.0,
            },
        );
        assert!(matches!(bad, Err(StationError::InvalidLocation { .. })));
    }

    #[test]
    fn test_body_uses_kilometres() {
        match taipei().body() {
            Body::Ground(geo) => {
                assert_eq!(geo.latitude, 25.03);
                assert!((geo.altitude_km - 0.01).abs() < 1e-12);
            }
            other => panic!("expected ground body, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_lookup_and_duplicates() {
        let mut registry = StationRegistry::from_stations([taipei()]).unwrap();
        assert_eq!(registry.get("GS-1").unwrap().name, "Taipei");
        assert!(matches!(registry.get("GS-9"), Err(StationError::NotFound(_))));
        assert!(matches!(registry.add(taipei()), Err(StationError::Duplicate(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_station_deserializes() {
        let json = r#"{"id":"GS-2","name":"Hsinchu","location":{"latitude":24.8,"longitude":120.97,"altitude_m":50.0}}"#;
        let station: GroundStation = serde_json::from_str(json).unwrap();
        assert!(station.validate().is_ok());
        assert_eq!(station.location.altitude_m, 50.0);
    }
}
