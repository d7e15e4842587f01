//! Walker Delta constellation shape, satellite indexing and TLE generation
//!
//! ## Walker Delta Notation: T/P/F
//! - T = Total satellites
//! - P = Number of orbital planes
//! - F = Phasing factor (0 to P-1)
//!
//! Satellite `(orbit, slot)` lives at dense matrix index
//! `orbit * sats_per_orbit + slot`. Every matrix in the routing engine is
//! addressed by that index; [`ConstellationShape`] is the only place the
//! mapping is computed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrbitalError, Result, Satellite};

const MU_EARTH: f64 = 398600.4418; // km³/s²
const EARTH_RADIUS_KM: f64 = 6378.137;

/// Logical satellite identifier: orbital plane and slot within the plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SatId {
    pub orbit: u32,
    pub slot: u32,
}

impl SatId {
    pub const fn new(orbit: u32, slot: u32) -> Self {
        Self { orbit, slot }
    }
}

impl fmt::Display for SatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.orbit, self.slot)
    }
}

impl FromStr for SatId {
    type Err = OrbitalError;

    /// Parses `"<orbit>-<slot>"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || OrbitalError::InvalidCoordinates(format!("bad satellite id '{}'", s));
        let (orbit, slot) = s.trim().split_once('-').ok_or_else(invalid)?;
        Ok(SatId {
            orbit: orbit.parse().map_err(|_| invalid())?,
            slot: slot.parse().map_err(|_| invalid())?,
        })
    }
}

/// Population shape of the constellation: `orbit_count × sats_per_orbit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ShapeFields", into = "ShapeFields")]
pub struct ConstellationShape {
    orbit_count: u32,
    sats_per_orbit: u32,
}

#[derive(Serialize, Deserialize)]
struct ShapeFields {
    orbit_count: u32,
    sats_per_orbit: u32,
    total_sat_count: usize,
}

impl TryFrom<ShapeFields> for ConstellationShape {
    type Error = OrbitalError;

    fn try_from(fields: ShapeFields) -> Result<Self> {
        ConstellationShape::new(fields.orbit_count, fields.sats_per_orbit, fields.total_sat_count)
    }
}

impl From<ConstellationShape> for ShapeFields {
    fn from(shape: ConstellationShape) -> Self {
        ShapeFields {
            orbit_count: shape.orbit_count,
            sats_per_orbit: shape.sats_per_orbit,
            total_sat_count: shape.total(),
        }
    }
}

impl ConstellationShape {
    /// Validates that the declared total matches the orbit layout.
    pub fn new(orbit_count: u32, sats_per_orbit: u32, total_sat_count: usize) -> Result<Self> {
        if orbit_count == 0 || sats_per_orbit == 0 {
            return Err(OrbitalError::InvalidShape(format!(
                "{} orbits × {} satellites per orbit is empty",
                orbit_count, sats_per_orbit
            )));
        }
        let expected = orbit_count as usize * sats_per_orbit as usize;
        if expected != total_sat_count {
            return Err(OrbitalError::InvalidShape(format!(
                "total satellite count {} does not match {} orbits × {} per orbit",
                total_sat_count, orbit_count, sats_per_orbit
            )));
        }
        Ok(Self {
            orbit_count,
            sats_per_orbit,
        })
    }

    pub fn orbit_count(&self) -> u32 {
        self.orbit_count
    }

    pub fn sats_per_orbit(&self) -> u32 {
        self.sats_per_orbit
    }

    pub fn total(&self) -> usize {
        self.orbit_count as usize * self.sats_per_orbit as usize
    }

    pub fn contains(&self, id: SatId) -> bool {
        id.orbit < self.orbit_count && id.slot < self.sats_per_orbit
    }

    pub fn index_of(&self, id: SatId) -> Result<usize> {
        if !self.contains(id) {
            return Err(OrbitalError::UnknownSatellite(id));
        }
        Ok(id.orbit as usize * self.sats_per_orbit as usize + id.slot as usize)
    }

    pub fn sat_id(&self, index: usize) -> Result<SatId> {
        if index >= self.total() {
            return Err(OrbitalError::IndexOutOfRange {
                index,
                total: self.total(),
            });
        }
        let per_orbit = self.sats_per_orbit as usize;
        Ok(SatId {
            orbit: (index / per_orbit) as u32,
            slot: (index % per_orbit) as u32,
        })
    }

    /// All satellite ids in ascending index order.
    pub fn ids(&self) -> impl Iterator<Item = SatId> + '_ {
        (0..self.orbit_count)
            .flat_map(move |orbit| (0..self.sats_per_orbit).map(move |slot| SatId { orbit, slot }))
    }
}

/// Walker Delta pattern (i:T/P/F) for a circular LEO shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkerDelta {
    pub total_satellites: u32,
    pub planes: u32,
    pub phasing: u32,
    pub altitude_km: f64,
    pub inclination_deg: f64,
    #[serde(default = "default_eccentricity")]
    pub eccentricity: f64,
}

fn default_eccentricity() -> f64 {
    0.0001
}

/// Generated TLE with the elements it encodes.
#[derive(Debug, Clone)]
pub struct GeneratedTle {
    pub id: SatId,
    pub name: String,
    pub norad_id: u32,
    pub line1: String,
    pub line2: String,
    pub elements: OrbitalElements,
}

/// Keplerian elements, angles in degrees.
#[derive(Debug, Clone, Copy)]
pub struct OrbitalElements {
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    /// Mean motion in rev/day
    pub mean_motion: f64,
}

impl OrbitalElements {
    /// n = sqrt(μ/a³), converted to rev/day
    pub fn mean_motion_from_sma(sma_km: f64) -> f64 {
        let n_rad_s = (MU_EARTH / sma_km.powi(3)).sqrt();
        n_rad_s * 86400.0 / std::f64::consts::TAU
    }
}

impl WalkerDelta {
    /// Starlink-like 72 planes × 22 satellites shell at 550 km.
    pub fn starlink_shell() -> Self {
        WalkerDelta {
            total_satellites: 1584,
            planes: 72,
            phasing: 1,
            altitude_km: 550.0,
            inclination_deg: 53.0,
            eccentricity: default_eccentricity(),
        }
    }

    pub fn satellites_per_plane(&self) -> u32 {
        if self.planes == 0 {
            return 0;
        }
        self.total_satellites / self.planes
    }

    pub fn plane_spacing_deg(&self) -> f64 {
        360.0 / self.planes as f64
    }

    pub fn in_plane_spacing_deg(&self) -> f64 {
        360.0 / self.satellites_per_plane() as f64
    }

    pub fn shape(&self) -> Result<ConstellationShape> {
        ConstellationShape::new(
            self.planes,
            self.satellites_per_plane(),
            self.total_satellites as usize,
        )
    }

    /// Element sets for every satellite, ordered by dense index.
    pub fn generate_tles(&self, epoch: DateTime<Utc>) -> Result<Vec<GeneratedTle>> {
        let shape = self.shape()?;
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(OrbitalError::InvalidShape(format!(
                "eccentricity {} outside [0, 1)",
                self.eccentricity
            )));
        }

        let sma = EARTH_RADIUS_KM + self.altitude_km;
        let mean_motion = OrbitalElements::mean_motion_from_sma(sma);
        let phase_offset = 360.0 * self.phasing as f64 / self.total_satellites as f64;

        let mut tles = Vec::with_capacity(shape.total());
        for (index, id) in shape.ids().enumerate() {
            let raan = self.plane_spacing_deg() * id.orbit as f64;
            let mean_anomaly = (self.in_plane_spacing_deg() * id.slot as f64
                + phase_offset * id.orbit as f64)
                .rem_euclid(360.0);

            let elements = OrbitalElements {
                semi_major_axis_km: sma,
                eccentricity: self.eccentricity,
                inclination_deg: self.inclination_deg,
                raan_deg: raan,
                arg_perigee_deg: 0.0,
                mean_anomaly_deg: mean_anomaly,
                mean_motion,
            };

            // Synthetic catalogue numbers stay within the 5-digit TLE field
            let norad_id = 70000 + (index as u32 % 29999);
            let (line1, line2) = tle_lines(norad_id, &elements, epoch);

            tles.push(GeneratedTle {
                id,
                name: format!("LEO-{}", id),
                norad_id,
                line1,
                line2,
                elements,
            });
        }

        Ok(tles)
    }

    pub fn satellites(&self, epoch: DateTime<Utc>) -> Result<Vec<Satellite>> {
        Ok(self
            .generate_tles(epoch)?
            .into_iter()
            .map(|tle| Satellite {
                id: tle.id,
                norad_id: tle.norad_id,
                name: tle.name,
                tle_line1: tle.line1,
                tle_line2: tle.line2,
            })
            .collect())
    }
}

/// Assigns TLEs from a catalogue to `(orbit, slot)` ids in file order.
///
/// Accepts both 2-line and 3-line (named) element sets.
pub fn satellites_from_catalog(text: &str, shape: &ConstellationShape) -> Result<Vec<Satellite>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut satellites = Vec::with_capacity(shape.total());
    let mut i = 0;
    while i < lines.len() {
        let name = if lines[i].starts_with("1 ") {
            None
        } else {
            i += 1;
            Some(lines[i - 1].trim().to_string())
        };

        let (line1, line2) = match (lines.get(i), lines.get(i + 1)) {
            (Some(l1), Some(l2)) if l1.starts_with("1 ") && l2.starts_with("2 ") => (*l1, *l2),
            _ => {
                return Err(OrbitalError::InvalidTle(format!(
                    "expected TLE line pair near line {}",
                    i + 1
                )))
            }
        };
        i += 2;

        let id = shape.sat_id(satellites.len())?;
        let norad_id = line1
            .get(2..7)
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| OrbitalError::InvalidTle(format!("bad catalogue number in '{}'", line1)))?;

        satellites.push(Satellite {
            id,
            norad_id,
            name: name.unwrap_or_else(|| format!("LEO-{}", id)),
            tle_line1: line1.to_string(),
            tle_line2: line2.to_string(),
        });
    }

    if satellites.len() != shape.total() {
        return Err(OrbitalError::InvalidShape(format!(
            "catalogue holds {} element sets, shape expects {}",
            satellites.len(),
            shape.total()
        )));
    }

    Ok(satellites)
}

fn tle_lines(norad_id: u32, elements: &OrbitalElements, epoch: DateTime<Utc>) -> (String, String) {
    // Epoch format: YYDDD.DDDDDDDD
    let year = epoch.year().rem_euclid(100);
    let day_of_year = epoch.ordinal() as f64
        + (epoch.hour() as f64 / 24.0)
        + (epoch.minute() as f64 / 1440.0)
        + (epoch.second() as f64 / 86400.0);

    let line1_base = format!(
        "1 {:05}U 24001A   {:02}{:012.8} -.00000000  00000-0  00000-0 0  999",
        norad_id, year, day_of_year
    );
    let line1 = format!("{}{}", line1_base, checksum_digit(&line1_base));

    // Eccentricity carries an implied leading decimal point
    let ecc_str = format!("{:07}", (elements.eccentricity * 10_000_000.0).round() as u32);

    let line2_base = format!(
        "2 {:05} {:8.4} {:8.4} {} {:8.4} {:8.4} {:11.8}{:05}",
        norad_id,
        elements.inclination_deg,
        elements.raan_deg,
        ecc_str,
        elements.arg_perigee_deg,
        elements.mean_anomaly_deg,
        elements.mean_motion,
        0
    );
    let line2 = format!("{}{}", line2_base, checksum_digit(&line2_base));

    (line1, line2)
}

fn checksum_digit(line: &str) -> u32 {
    let sum: u32 = line
        .chars()
        .map(|c| match c {
            '0'..='9' => c as u32 - '0' as u32,
            '-' => 1,
            _ => 0,
        })
        .sum();
    sum % 10
}
