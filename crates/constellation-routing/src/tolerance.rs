//! Angular-tolerance envelope for antenna pointing.

use orbital_mechanics::Aer;
use serde::Serialize;

use crate::{Result, RoutingError};

/// Named upper bound over (azimuth, elevation, range) deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AerTolerance {
    name: String,
    bounds: Aer,
}

impl AerTolerance {
    pub fn new(
        name: impl Into<String>,
        azimuth_deg: f64,
        elevation_deg: f64,
        range_km: f64,
    ) -> Result<Self> {
        let name = name.into();
        for (label, value) in [
            ("azimuth", azimuth_deg),
            ("elevation", elevation_deg),
            ("range", range_km),
        ] {
            // NaN fails the comparison as well
            if !(value >= 0.0) {
                return Err(RoutingError::InvalidTolerance(format!(
                    "{}: {} bound must be non-negative, got {}",
                    name, label, value
                )));
            }
        }

        Ok(Self {
            name,
            bounds: Aer::new(azimuth_deg, elevation_deg, range_km),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> &Aer {
        &self.bounds
    }

    /// True iff every measured magnitude is within its bound.
    pub fn admits(&self, deviation: &Aer) -> bool {
        deviation.azimuth_deg.abs() <= self.bounds.azimuth_deg
            && deviation.elevation_deg.abs() <= self.bounds.elevation_deg
            && deviation.range_km.abs() <= self.bounds.range_km
    }
}

/// Smallest angle between two azimuths, in `[0, 180]`.
pub fn azimuth_delta(a_deg: f64, b_deg: f64) -> f64 {
    let d = (a_deg - b_deg).rem_euclid(360.0);
    d.min(360.0 - d)
}
