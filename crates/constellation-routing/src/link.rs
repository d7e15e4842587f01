//! Inter-satellite link feasibility.
//!
//! A link between A and B is usable at `t` when both terminals can hold
//! their pointing through the acquisition window `[t, t + delay]`: the
//! azimuth and elevation swing of each terminal's look angle over the window,
//! and the longest slant range seen in it, must all fall inside the
//! tolerance envelope. With no delay the swing is zero and only the range
//! bound gates the link.

use orbital_mechanics::{Aer, Body, LookAngleSource, SatId};
use serde::Serialize;

use crate::tolerance::{azimuth_delta, AerTolerance};
use crate::{CostModel, Result, RoutingError};

/// Outcome of one pairwise feasibility check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkAssessment {
    pub feasible: bool,
    /// Slant range at the query instant
    pub range_km: f64,
    /// Measured deviation that was compared against the envelope
    pub deviation: Aer,
}

impl LinkAssessment {
    /// Edge cost under `model`, or `None` if the link is not usable.
    pub fn cost(&self, model: CostModel) -> Option<f64> {
        self.feasible.then(|| model.edge_cost(self.range_km))
    }
}

pub struct LinkEvaluator<'a, S: ?Sized> {
    source: &'a S,
    tolerance: &'a AerTolerance,
    acquisition_delay_s: f64,
}

impl<'a, S: LookAngleSource + ?Sized> LinkEvaluator<'a, S> {
    pub fn new(source: &'a S, tolerance: &'a AerTolerance, acquisition_delay_s: f64) -> Result<Self> {
        if !acquisition_delay_s.is_finite() || acquisition_delay_s < 0.0 {
            return Err(RoutingError::InvalidParameter(format!(
                "acquisition delay must be a non-negative number of seconds, got {}",
                acquisition_delay_s
            )));
        }
        Ok(Self {
            source,
            tolerance,
            acquisition_delay_s,
        })
    }

    pub fn tolerance(&self) -> &AerTolerance {
        self.tolerance
    }

    pub fn acquisition_delay_s(&self) -> f64 {
        self.acquisition_delay_s
    }

    /// Decides whether `a` and `b` can hold a link at `t_s`.
    ///
    /// A propagation failure is an error, never an infeasible link.
    pub fn evaluate(&self, a: SatId, b: SatId, t_s: f64) -> Result<LinkAssessment> {
        if a == b {
            return Err(RoutingError::InvalidParameter(format!(
                "cannot evaluate a link from {} to itself",
                a
            )));
        }
        self.assess(a, b, t_s)
            .map_err(|source| RoutingError::LinkEvaluation { a, b, source })
    }

    pub(crate) fn assess(
        &self,
        a: SatId,
        b: SatId,
        t_s: f64,
    ) -> orbital_mechanics::Result<LinkAssessment> {
        let body_a = Body::Satellite(a);
        let body_b = Body::Satellite(b);

        let ab_start = self.source.look_angles(&body_a, &body_b, t_s)?;
        let ba_start = self.source.look_angles(&body_b, &body_a, t_s)?;

        let deviation = if self.acquisition_delay_s > 0.0 {
            let t_end = t_s + self.acquisition_delay_s;
            let ab_end = self.source.look_angles(&body_a, &body_b, t_end)?;
            let ba_end = self.source.look_angles(&body_b, &body_a, t_end)?;

            Aer {
                azimuth_deg: azimuth_delta(ab_start.azimuth_deg, ab_end.azimuth_deg)
                    .max(azimuth_delta(ba_start.azimuth_deg, ba_end.azimuth_deg)),
                elevation_deg: (ab_start.elevation_deg - ab_end.elevation_deg)
                    .abs()
                    .max((ba_start.elevation_deg - ba_end.elevation_deg).abs()),
                range_km: ab_start
                    .range_km
                    .max(ba_start.range_km)
                    .max(ab_end.range_km)
                    .max(ba_end.range_km),
            }
        } else {
            Aer::new(0.0, 0.0, ab_start.range_km.max(ba_start.range_km))
        };

        Ok(LinkAssessment {
            feasible: self.tolerance.admits(&deviation),
            range_km: ab_start.range_km,
            deviation,
        })
    }
}
