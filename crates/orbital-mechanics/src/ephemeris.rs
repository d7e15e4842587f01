//! Look-angle service consumed by the routing engine
//!
//! [`LookAngleSource`] is the propagation boundary: a pure function of
//! `(from, to, time)` returning the apparent azimuth/elevation/range of
//! `to` as seen from `from`. [`Sgp4Ephemeris`] is the SGP4-backed
//! implementation over a whole constellation.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;

use crate::propagation::TlePropagator;
use crate::{
    sim_instant, transforms, Aer, ConstellationShape, GeodeticPosition, OrbitalError, Result,
    SatId, Satellite,
};

/// Something that can observe or be observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Body {
    Satellite(SatId),
    Ground(GeodeticPosition),
}

/// Deterministic, side-effect-free look-angle provider.
///
/// `t_s` is seconds past the simulation epoch.
pub trait LookAngleSource: Sync {
    fn look_angles(&self, from: &Body, to: &Body, t_s: f64) -> Result<Aer>;
}

impl<S: LookAngleSource + ?Sized> LookAngleSource for &S {
    fn look_angles(&self, from: &Body, to: &Body, t_s: f64) -> Result<Aer> {
        (**self).look_angles(from, to, t_s)
    }
}

/// Observer position plus the orientation of its local SEZ frame.
struct Site {
    position: Vector3<f64>,
    latitude_rad: f64,
    sidereal_rad: f64,
}

/// SGP4 ephemeris for every satellite in a constellation.
pub struct Sgp4Ephemeris {
    epoch: DateTime<Utc>,
    shape: ConstellationShape,
    propagators: Vec<TlePropagator>,
}

impl Sgp4Ephemeris {
    /// Parses every satellite's TLE once; each slot of `shape` must be
    /// filled exactly once.
    pub fn new(
        epoch: DateTime<Utc>,
        shape: ConstellationShape,
        satellites: &[Satellite],
    ) -> Result<Self> {
        let mut slots: Vec<Option<TlePropagator>> = (0..shape.total()).map(|_| None).collect();

        for sat in satellites {
            let index = shape.index_of(sat.id)?;
            if slots[index].is_some() {
                return Err(OrbitalError::InvalidShape(format!(
                    "satellite {} listed twice",
                    sat.id
                )));
            }
            slots[index] = Some(TlePropagator::from_tle(&sat.tle_line1, &sat.tle_line2)?);
        }

        let propagators = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Some(p) => Ok(p),
                None => Err(OrbitalError::UnknownSatellite(shape.sat_id(index)?)),
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            satellites = propagators.len(),
            %epoch,
            "SGP4 ephemeris initialized"
        );

        Ok(Self {
            epoch,
            shape,
            propagators,
        })
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn shape(&self) -> &ConstellationShape {
        &self.shape
    }

    /// Inertial position of a body at `t_s`.
    pub fn position_eci(&self, body: &Body, t_s: f64) -> Result<Vector3<f64>> {
        Ok(self.site(body, t_s)?.position)
    }

    fn site(&self, body: &Body, t_s: f64) -> Result<Site> {
        let time = sim_instant(self.epoch, t_s);
        match body {
            Body::Satellite(id) => {
                let index = self.shape.index_of(*id)?;
                let state = self.propagators[index].propagate(time)?;
                let r = state.position.norm();
                if !r.is_finite() || r == 0.0 {
                    return Err(OrbitalError::PropagationFailed(format!(
                        "satellite {} produced a degenerate position",
                        id
                    )));
                }
                Ok(Site {
                    latitude_rad: (state.position.z / r).asin(),
                    sidereal_rad: state.position.y.atan2(state.position.x),
                    position: state.position,
                })
            }
            Body::Ground(geo) => {
                let gmst = transforms::gmst_rad(time);
                let ecef = transforms::geodetic_to_ecef(geo)?;
                Ok(Site {
                    position: transforms::ecef_to_eci(&ecef, gmst),
                    latitude_rad: geo.latitude.to_radians(),
                    sidereal_rad: gmst + geo.longitude.to_radians(),
                })
            }
        }
    }
}

impl LookAngleSource for Sgp4Ephemeris {
    fn look_angles(&self, from: &Body, to: &Body, t_s: f64) -> Result<Aer> {
        let observer = self.site(from, t_s)?;
        let target = self.position_eci(to, t_s)?;
        Ok(transforms::look_angles(
            &observer.position,
            observer.latitude_rad,
            observer.sidereal_rad,
            &target,
        ))
    }
}
