//! Satellites in view of a ground station.

use std::fmt;

use orbital_mechanics::{Body, ConstellationShape, LookAngleSource, SatId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{GroundStation, Result, StationError};

/// How the query time is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSampling {
    /// Nearest whole second
    #[default]
    Snap,
    /// The instant as given
    Exact,
    /// Visible at both `floor(t)` and `floor(t) + 1`
    Interval,
}

impl TimeSampling {
    fn instants(&self, t_s: f64) -> Vec<f64> {
        match self {
            TimeSampling::Snap => vec![t_s.round()],
            TimeSampling::Exact => vec![t_s],
            TimeSampling::Interval => vec![t_s.floor(), t_s.floor() + 1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageCriteria {
    pub min_elevation_deg: f64,
    pub max_range_km: f64,
    #[serde(default)]
    pub sampling: TimeSampling,
}

impl CoverageCriteria {
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.min_elevation_deg) {
            return Err(StationError::InvalidCriteria(format!(
                "minimum elevation {} outside [-90, 90]",
                self.min_elevation_deg
            )));
        }
        if !(self.max_range_km > 0.0) {
            return Err(StationError::InvalidCriteria(format!(
                "maximum range {} must be positive",
                self.max_range_km
            )));
        }
        Ok(())
    }
}

impl Default for CoverageCriteria {
    fn default() -> Self {
        Self {
            min_elevation_deg: 10.0,
            max_range_km: 2000.0,
            sampling: TimeSampling::Snap,
        }
    }
}

/// Satellites visible from `station` at `t_s`, ascending by id.
///
/// A satellite is in view iff its elevation is at least the minimum and its
/// slant range at most the maximum at every sampled instant. Any propagation
/// failure fails the whole query.
pub fn coverage<S: LookAngleSource + ?Sized>(
    station: &GroundStation,
    shape: &ConstellationShape,
    source: &S,
    t_s: f64,
    criteria: &CoverageCriteria,
) -> Result<Vec<SatId>> {
    criteria.validate()?;
    if !t_s.is_finite() {
        return Err(StationError::InvalidCriteria(format!("query time {}", t_s)));
    }

    let observer = station.body();
    let instants = criteria.sampling.instants(t_s);

    let mut visible = Vec::new();
    for id in shape.ids() {
        let target = Body::Satellite(id);
        let mut in_view = true;
        for &t in &instants {
            let aer = source.look_angles(&observer, &target, t)?;
            if aer.elevation_deg < criteria.min_elevation_deg || aer.range_km > criteria.max_range_km {
                in_view = false;
                break;
            }
        }
        if in_view {
            visible.push(id);
        }
    }
    // ids() walks index order, which is already (orbit, slot) order
    debug_assert!(visible.windows(2).all(|w| w[0] < w[1]));

    debug!(
        station = %station.id,
        t = t_s,
        visible = visible.len(),
        "Coverage computed"
    );
    Ok(visible)
}

/// One coverage line: `t = <time>: <ids>` or `t = <time>: no coverage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub station: String,
    pub time_s: f64,
    pub satellites: Vec<SatId>,
}

impl fmt::Display for CoverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t = {}: ", self.time_s)?;
        if self.satellites.is_empty() {
            return write!(f, "no coverage");
        }
        let ids: Vec<String> = self.satellites.iter().map(SatId::to_string).collect();
        write!(f, "{}", ids.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoLocation;
    use orbital_mechanics::{Aer, OrbitalError};

    /// Fixed elevation per satellite index; elevation of index 1 rises by
    /// 1 deg/s. Range is 1000 km everywhere except index 2.
    struct Sky {
        shape: ConstellationShape,
        elevations: Vec<f64>,
    }

    impl LookAngleSource for Sky {
        fn look_angles(&self, from: &Body, to: &Body, t_s: f64) -> orbital_mechanics::Result<Aer> {
            assert!(matches!(from, Body::Ground(_)));
            let i = match to {
                Body::Satellite(id) => self.shape.index_of(*id)?,
                Body::Ground(_) => return Err(OrbitalError::InvalidCoordinates("ground".into())),
            };
            let elevation = if i == 1 { self.elevations[i] + t_s } else { self.elevations[i] };
            let range = if i == 2 { 5000.0 } else { 1000.0 };
            Ok(Aer::new(180.0, elevation, range))
        }
    }

    struct Dead;

    impl LookAngleSource for Dead {
        fn look_angles(&self, _from: &Body, _to: &Body, _t_s: f64) -> orbital_mechanics::Result<Aer> {
            Err(OrbitalError::PropagationFailed("no ephemeris".into()))
        }
    }

    fn station() -> GroundStation {
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

    fn criteria(min_elevation_deg: f64, sampling: TimeSampling) -> CoverageCriteria {
        CoverageCriteria {
            min_elevation_deg,
            max_range_km: 2000.0,
            sampling,
        }
    }

    #[test]
    fn test_low_satellite_below_threshold() {
        let shape = ConstellationShape::new(1, 1, 1).unwrap();
        let sky = Sky { shape, elevations: vec![5.0] };

        let strict = coverage(&station(), &shape, &sky, 100.0, &criteria(10.0, TimeSampling::Snap)).unwrap();
        assert!(strict.is_empty());

        let loose = coverage(&station(), &shape, &sky, 100.0, &criteria(5.0, TimeSampling::Snap)).unwrap();
        assert_eq!(loose, vec![SatId::new(0, 0)]);
    }

    #[test]
    fn test_range_threshold_and_order() {
        let shape = ConstellationShape::new(2, 2, 4).unwrap();
        let sky = Sky {
            shape,
            elevations: vec![30.0, -60.0, 45.0, 12.0],
        };
        let visible = coverage(&station(), &shape, &sky, 0.0, &criteria(10.0, TimeSampling::Exact)).unwrap();
        // Index 1 is below the horizon, index 2 too far away
        assert_eq!(visible, vec![SatId::new(0, 0), SatId::new(1, 1)]);
    }

    #[test]
    fn test_sampling_policies() {
        let shape = ConstellationShape::new(1, 2, 2).unwrap();
        // Index 1 reaches 10 deg at t = 10 s
        let sky = Sky {
            shape,
            elevations: vec![-90.0, 0.0],
        };
        let rising = vec![SatId::new(0, 1)];

        let at = |t: f64, sampling| coverage(&station(), &shape, &sky, t, &criteria(10.0, sampling)).unwrap();

        assert_eq!(at(9.6, TimeSampling::Snap), rising);
        assert!(at(9.6, TimeSampling::Exact).is_empty());
        assert!(at(9.6, TimeSampling::Interval).is_empty());
        assert_eq!(at(10.2, TimeSampling::Interval), rising);
    }

    #[test]
    fn test_propagation_failure_is_error() {
        let shape = ConstellationShape::new(1, 2, 2).unwrap();
        let result = coverage(&station(), &shape, &Dead, 0.0, &CoverageCriteria::default());
        assert!(matches!(result, Err(StationError::Propagation(_))));
    }

    #[test]
    fn test_rejects_bad_criteria() {
        let shape = ConstellationShape::new(1, 1, 1).unwrap();
        let sky = Sky { shape, elevations: vec![0.0] };
        let mut bad = criteria(95.0, TimeSampling::Snap);
        assert!(coverage(&station(), &shape, &sky, 0.0, &bad).is_err());
        bad.min_elevation_deg = 10.0;
        bad.max_range_km = 0.0;
        assert!(matches!(
            coverage(&station(), &shape, &sky, 0.0, &bad),
            Err(StationError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn test_report_format() {
        let mut report = CoverageReport {
            station: "GS-1".into(),
            time_s: 3600.0,
            satellites: vec![SatId::new(0, 3), SatId::new(2, 1)],
        };
        assert_eq!(report.to_string(), "t = 3600: 0-3, 2-1");
        report.satellites.clear();
        assert_eq!(report.to_string(), "t = 3600: no coverage");
    }
}
