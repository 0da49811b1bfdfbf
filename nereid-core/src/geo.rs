//! Great-Circle Geometry
//!
//! Distance, travel time and checkpoint calculations between coordinate
//! pairs. Distances use the haversine formula on a spherical earth, which
//! is accurate to well under a percent for the trip lengths a dispatch
//! covers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean earth radius in kilometers, as used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geometry errors
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or longitude outside [-180, 180]
    #[error("invalid coordinate ({lat}, {lon}): latitude must be in [-90, 90] and longitude in [-180, 180]")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

/// A position on the earth's surface in signed degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "latitude")]
    pub lat: f64,
    #[serde(rename = "longitude")]
    pub lon: f64,
}

impl Position {
    /// Create a validated position.
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        let position = Position { lat, lon };
        position.validate()?;
        Ok(position)
    }

    /// Check that both components are within range.
    ///
    /// Positions can arrive from deserialized JSON, so a `Position` value
    /// is not guaranteed valid by construction; callers at trust
    /// boundaries validate before computing with it.
    pub fn validate(&self) -> Result<(), GeoError> {
        if !(-90.0..=90.0).contains(&self.lat)
            || !(-180.0..=180.0).contains(&self.lon)
            || self.lat.is_nan()
            || self.lon.is_nan()
        {
            return Err(GeoError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            });
        }
        Ok(())
    }
}

/// Great-circle distance between two validated positions in kilometers.
pub fn distance_km(a: Position, b: Position) -> Result<f64, GeoError> {
    a.validate()?;
    b.validate()?;
    Ok(haversine_km(a, b))
}

/// Haversine distance without validation.
///
/// Interpolated points between two validated endpoints stay in range, so
/// the zone evaluator uses this directly for checkpoint segments.
pub(crate) fn haversine_km(a: Position, b: Position) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Travel time in hours for a distance at a cruising speed.
///
/// A speed of zero or below yields `f64::INFINITY`: the destination is
/// unreachable. This is a sentinel the scoring and routing layers check
/// for, not an error.
pub fn travel_time_hours(distance_km: f64, speed_kmh: f64) -> f64 {
    if speed_kmh <= 0.0 {
        return f64::INFINITY;
    }
    distance_km / speed_kmh
}

/// Linear interpolation between two positions in (lat, lon) space.
///
/// Not a great-circle slerp; for the hop lengths covered by hourly
/// checkpoints the straight-line approximation is within the polygon
/// test's tolerance. `fraction` is clamped to [0, 1].
pub fn interpolate(a: Position, b: Position, fraction: f64) -> Position {
    let f = fraction.clamp(0.0, 1.0);
    Position {
        lat: a.lat + f * (b.lat - a.lat),
        lon: a.lon + f * (b.lon - a.lon),
    }
}

/// Positions at each whole hour of a trip from `a` to `b`.
///
/// Produces one checkpoint per hour from hour 0 through
/// `ceil(travel_time)` inclusive, so the sequence always starts at the
/// source and ends exactly at the destination. A zero-length trip yields
/// a single checkpoint at the (shared) endpoint. A non-positive speed
/// yields an infinite travel time and only the source checkpoint.
///
/// The checkpoint count is `ceil(distance / speed) + 1`: callers taking
/// an externally supplied speed must bound it first (the zone evaluator
/// enforces [`crate::zone::MIN_SPEED_KMH`], scoring floors unit speeds).
pub fn hourly_checkpoints(a: Position, b: Position, speed_kmh: f64) -> Vec<Position> {
    let total_hours = travel_time_hours(haversine_km(a, b), speed_kmh);
    if !total_hours.is_finite() {
        return vec![a];
    }

    let last_hour = total_hours.ceil() as u32;
    let mut checkpoints = Vec::with_capacity(last_hour as usize + 1);
    for hour in 0..=last_hour {
        let fraction = if total_hours > 0.0 {
            hour as f64 / total_hours
        } else {
            1.0
        };
        checkpoints.push(interpolate(a, b, fraction));
    }
    checkpoints
}
