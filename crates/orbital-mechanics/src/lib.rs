//! Orbital Mechanics Library
//!
//! SGP4 propagation, coordinate transforms, topocentric look angles and
//! Walker Delta constellation modeling for LEO mega-constellations.
//!
//! The routing engine never touches orbital elements directly. It asks a
//! [`LookAngleSource`] for the azimuth/elevation/range triple between two
//! bodies at a simulated time, and addresses satellites through the dense
//! indexing of [`ConstellationShape`].

use chrono::{DateTime, Duration, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod ephemeris;
pub mod walker;

pub use ephemeris::{Body, LookAngleSource, Sgp4Ephemeris};
pub use walker::{ConstellationShape, SatId, WalkerDelta};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrbitalError {
    #[error("Invalid TLE format: {0}")]
    InvalidTle(String),
    #[error("Propagation failed: {0}")]
    PropagationFailed(String),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("Invalid constellation shape: {0}")]
    InvalidShape(String),
    #[error("Satellite index {index} out of range (constellation has {total} satellites)")]
    IndexOutOfRange { index: usize, total: usize },
    #[error("Unknown satellite: {0}")]
    UnknownSatellite(SatId),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// A satellite of the constellation together with its element set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Satellite {
    pub id: SatId,
    pub norad_id: u32,
    pub name: String,
    pub tle_line1: String,
    pub tle_line2: String,
}

/// ECI state in km and km/s.
#[derive(Debug, Clone, Copy)]
pub struct StateVector {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub epoch: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
}

/// Azimuth/elevation/range triple.
///
/// Used both for measured look angles (azimuth clockwise from north in
/// `[0, 360)`, elevation above the local horizon) and for deviations between
/// two look-angle samples, where every component is a magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aer {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

impl Aer {
    pub fn new(azimuth_deg: f64, elevation_deg: f64, range_km: f64) -> Self {
        Self {
            azimuth_deg,
            elevation_deg,
            range_km,
        }
    }
}

/// Converts simulation seconds past `epoch` into an absolute instant.
pub fn sim_instant(epoch: DateTime<Utc>, t_s: f64) -> DateTime<Utc> {
    epoch + Duration::milliseconds((t_s * 1000.0).round() as i64)
}

pub mod propagation {
    use super::*;

    /// Parsed element set, ready to be propagated repeatedly.
    pub struct TlePropagator {
        constants: sgp4::Constants,
        epoch: DateTime<Utc>,
    }

    impl TlePropagator {
        pub fn from_tle(tle_line1: &str, tle_line2: &str) -> Result<Self> {
            let elements = sgp4::Elements::from_tle(
                None,
                tle_line1.as_bytes(),
                tle_line2.as_bytes(),
            )
            .map_err(|e| OrbitalError::InvalidTle(format!("{:?}", e)))?;

            let constants = sgp4::Constants::from_elements(&elements)
                .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

            let epoch = DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc);

            Ok(Self { constants, epoch })
        }

        pub fn propagate(&self, time: DateTime<Utc>) -> Result<StateVector> {
            let duration = time.signed_duration_since(self.epoch);
            let minutes_since_epoch = duration.num_milliseconds() as f64 / 60_000.0;

            let prediction = self
                .constants
                .propagate(minutes_since_epoch)
                .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

            Ok(StateVector {
                position: Vector3::from(prediction.position),
                velocity: Vector3::from(prediction.velocity),
                epoch: time,
            })
        }
    }
}

pub mod transforms {
    use super::*;
    use std::f64::consts::TAU;

    pub const EARTH_RADIUS_KM: f64 = 6378.137;
    const EARTH_FLATTENING: f64 = 1.0 / 298.257223563;

    /// Greenwich mean sidereal time in radians, normalized to `[0, 2π)`.
    pub fn gmst_rad(time: DateTime<Utc>) -> f64 {
        let unix_s = time.timestamp_millis() as f64 / 1000.0;
        let jd = unix_s / 86400.0 + 2440587.5;

        // Julian centuries from J2000.0
        let t = (jd - 2451545.0) / 36525.0;

        let gmst_sec = 67310.54841
            + (876600.0 * 3600.0 + 8640184.812866) * t
            + 0.093104 * t * t
            - 6.2e-6 * t * t * t;

        (gmst_sec / 240.0).to_radians().rem_euclid(TAU)
    }

    /// WGS84 geodetic coordinates to earth-fixed cartesian (km).
    pub fn geodetic_to_ecef(pos: &GeodeticPosition) -> Result<Vector3<f64>> {
        if !(-90.0..=90.0).contains(&pos.latitude) || !pos.longitude.is_finite() {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "lat={} lon={}",
                pos.latitude, pos.longitude
            )));
        }

        let lat_rad = pos.latitude.to_radians();
        let lon_rad = pos.longitude.to_radians();
        let alt = pos.altitude_km;

        let e2 = 2.0 * EARTH_FLATTENING - EARTH_FLATTENING * EARTH_FLATTENING;
        let n = EARTH_RADIUS_KM / (1.0 - e2 * lat_rad.sin().powi(2)).sqrt();

        let x = (n + alt) * lat_rad.cos() * lon_rad.cos();
        let y = (n + alt) * lat_rad.cos() * lon_rad.sin();
        let z = (n * (1.0 - e2) + alt) * lat_rad.sin();

        Ok(Vector3::new(x, y, z))
    }

    /// Rotates an earth-fixed vector into the inertial frame.
    pub fn ecef_to_eci(ecef: &Vector3<f64>, gmst_rad: f64) -> Vector3<f64> {
        let (sin_g, cos_g) = gmst_rad.sin_cos();
        Vector3::new(
            cos_g * ecef.x - sin_g * ecef.y,
            sin_g * ecef.x + cos_g * ecef.y,
            ecef.z,
        )
    }

    /// Look angles from an observer to a target, both in ECI.
    ///
    /// `latitude_rad` and `sidereal_rad` orient the observer's SEZ frame;
    /// for a ground site the sidereal angle is GMST plus its longitude.
    pub fn look_angles(
        observer: &Vector3<f64>,
        latitude_rad: f64,
        sidereal_rad: f64,
        target: &Vector3<f64>,
    ) -> Aer {
        let d = target - observer;
        let range = d.norm();

        let (sin_lat, cos_lat) = latitude_rad.sin_cos();
        let (sin_th, cos_th) = sidereal_rad.sin_cos();

        let s = sin_lat * cos_th * d.x + sin_lat * sin_th * d.y - cos_lat * d.z;
        let e = -sin_th * d.x + cos_th * d.y;
        let z = cos_lat * cos_th * d.x + cos_lat * sin_th * d.y + sin_lat * d.z;

        let azimuth = e.atan2(-s).to_degrees().rem_euclid(360.0);
        let elevation = if range > 0.0 {
            (z / range).clamp(-1.0, 1.0).asin().to_degrees()
        } else {
            90.0
        };

        Aer::new(azimuth, elevation, range)
    }
}
