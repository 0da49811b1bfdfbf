//! Restricted Zone Routing
//!
//! A restricted zone is a fixed closed polygon that dispatched units must
//! not enter. This module provides the point-in-polygon containment test
//! and the route evaluator that tries the direct path first and then
//! threads the trip through one or two designated bypass waypoints.
//!
//! Route safety is judged at hourly checkpoints (see [`crate::geo`]),
//! mirroring how positions are reported operationally. The evaluator is
//! pure: for identical inputs against the immutable zone it always
//! produces the same report.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{self, GeoError, Position};

/// Minimum speed accepted by the route evaluator, in km/h.
///
/// Bounds the per-segment checkpoint count: checkpoints are hourly, so
/// even a trip spanning half the earth stays near 200k checkpoints at
/// this floor. Below it (or at zero) the checkpoint sequence degenerates
/// and a crossing route could go unchecked.
pub const MIN_SPEED_KMH: f64 = 0.1;

/// Zone routing errors
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ZoneError {
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// Source or destination is itself inside the restricted zone.
    /// Checked before any route construction.
    #[error("point ({lat:.4}, {lon:.4}) lies inside the restricted zone")]
    PointInsideRestrictedZone { lat: f64, lon: f64 },

    /// Speed unusable for checkpoint evaluation.
    #[error("invalid speed {speed_kmh} km/h: must be finite and at least 0.1 km/h")]
    InvalidSpeed { speed_kmh: f64 },
}

/// A closed restricted polygon with two designated bypass waypoints.
///
/// Vertices are an ordered ring; the edge between the last and first
/// vertex is implicit. The bypass waypoints sit outside the polygon and
/// are the only detour points the evaluator will consider; it never
/// invents new ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictedZone {
    pub vertices: Vec<Position>,
    /// Bypass waypoint on the western side of the zone
    pub bypass_west: Position,
    /// Bypass waypoint on the eastern side of the zone
    pub bypass_east: Position,
}

/// One hourly checkpoint of a route segment and its containment verdict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointReport {
    pub hour: u32,
    pub position: Position,
    pub inside_zone: bool,
}

/// Evaluation of one straight segment of a candidate route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentReport {
    pub from: Position,
    pub to: Position,
    pub distance_km: f64,
    pub travel_time_hours: f64,
    pub checkpoints: Vec<CheckpointReport>,
    /// True iff no checkpoint of this segment fell inside the zone
    pub safe: bool,
}

/// Evaluation of one candidate route (direct, or via bypass waypoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteReport {
    /// Full waypoint list including source and destination
    pub waypoints: Vec<Position>,
    pub segments: Vec<SegmentReport>,
    pub total_distance_km: f64,
    /// True iff every segment is safe
    pub safe: bool,
}

/// Full result of a route evaluation.
///
/// `routes` holds every candidate that was evaluated, in the order they
/// were tried; evaluation short-circuits at the first safe route, so
/// later candidates may be absent. `safe_route` indexes into `routes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEvaluation {
    pub routes: Vec<RouteReport>,
    pub safe_route: Option<usize>,
}

impl RestrictedZone {
    pub fn new(vertices: Vec<Position>, bypass_west: Position, bypass_east: Position) -> Self {
        RestrictedZone {
            vertices,
            bypass_west,
            bypass_east,
        }
    }

    /// The operational zone this service ships with: a polygon along the
    /// Indian coastline with bypass waypoints south-west (off Cape
    /// Comorin) and south-east (below Sri Lanka).
    pub fn indian_ocean() -> Self {
        let ring = [
            (23.694119633535138, 68.14149973127236),
            (20.541614160757753, 70.96869016501113),
            (20.526351042243512, 72.4975608124518),
            (17.22712347466089, 72.77693993220252),
            (7.856392117236889, 77.3557810311827),
            (9.128111199112015, 78.97345643559729),
            (8.831075485492525, 79.61637871171075),
            (5.962310128504571, 79.90673070737493),
            (6.22008914021468, 81.93919467702402),
            (7.486424219383046, 81.99104324767832),
            (10.894681116586904, 79.94820956389837),
            (15.508653879971105, 80.84765671454751),
            (19.4308684460504, 85.68628593633235),
            (21.200457540153735, 88.8313949304925),
            (21.63084181829822, 89.11274398394436),
        ];
        RestrictedZone {
            vertices: ring
                .iter()
                .map(|&(lat, lon)| Position { lat, lon })
                .collect(),
            bypass_west: Position {
                lat: 7.680220332790962,
                lon: 77.52410752640004,
            },
            bypass_east: Position {
                lat: 4.666352644711645,
                lon: 82.6181597042664,
            },
        }
    }

    /// Ray-casting point-in-polygon test.
    ///
    /// A point exactly on a polygon edge has unspecified parity; this is
    /// the classic ray-casting ambiguity and is left as-is. Hourly
    /// checkpoints landing exactly on an edge are vanishingly rare and
    /// operationally equivalent either way.
    pub fn contains(&self, point: Position) -> bool {
        let (x, y) = (point.lat, point.lon);
        let n = self.vertices.len();
        let mut inside = false;

        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let (x1, y1) = (a.lat, a.lon);
            let (x2, y2) = (b.lat, b.lon);

            if (y1 > y) != (y2 > y) && x < (x2 - x1) * (y - y1) / (y2 - y1) + x1 {
                inside = !inside;
            }
        }

        inside
    }

    /// True iff no checkpoint in the sequence lies inside the zone.
    pub fn is_route_safe(&self, checkpoints: &[Position]) -> bool {
        checkpoints.iter().all(|&p| !self.contains(p))
    }

    /// Evaluate candidate routes from `source` to `destination`.
    ///
    /// Candidates are tried in order of increasing detour: the direct
    /// path, then via one bypass waypoint, then via both. Which bypass
    /// comes first depends on heading: an eastbound trip (destination
    /// longitude greater than source) rounds the western waypoint first,
    /// a westbound trip the eastern one. Evaluation short-circuits at the
    /// first route whose every segment is fully outside the zone.
    ///
    /// The speed must be finite and at least [`MIN_SPEED_KMH`]; anything
    /// lower cannot be evaluated at hourly checkpoints.
    pub fn evaluate_routes(
        &self,
        source: Position,
        destination: Position,
        speed_kmh: f64,
    ) -> Result<RouteEvaluation, ZoneError> {
        source.validate()?;
        destination.validate()?;
        if !speed_kmh.is_finite() || speed_kmh < MIN_SPEED_KMH {
            return Err(ZoneError::InvalidSpeed { speed_kmh });
        }

        for endpoint in [source, destination] {
            if self.contains(endpoint) {
                return Err(ZoneError::PointInsideRestrictedZone {
                    lat: endpoint.lat,
                    lon: endpoint.lon,
                });
            }
        }

        let (first, second) = if source.lon < destination.lon {
            (self.bypass_west, self.bypass_east)
        } else {
            (self.bypass_east, self.bypass_west)
        };

        let candidates: [Vec<Position>; 3] = [
            vec![source, destination],
            vec![source, first, destination],
            vec![source, first, second, destination],
        ];

        let mut routes = Vec::new();
        let mut safe_route = None;

        for waypoints in candidates {
            let report = self.evaluate_route(waypoints, speed_kmh);
            let safe = report.safe;
            routes.push(report);
            if safe {
                safe_route = Some(routes.len() - 1);
                break;
            }
        }

        Ok(RouteEvaluation { routes, safe_route })
    }

    fn evaluate_route(&self, waypoints: Vec<Position>, speed_kmh: f64) -> RouteReport {
        let mut segments = Vec::with_capacity(waypoints.len() - 1);
        let mut total_distance_km = 0.0;
        let mut safe = true;

        for pair in waypoints.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let distance_km = geo::haversine_km(from, to);
            let travel_time_hours = geo::travel_time_hours(distance_km, speed_kmh);

            let checkpoints: Vec<CheckpointReport> = geo::hourly_checkpoints(from, to, speed_kmh)
                .into_iter()
                .enumerate()
                .map(|(hour, position)| CheckpointReport {
                    hour: hour as u32,
                    position,
                    inside_zone: self.contains(position),
                })
                .collect();

            let segment_safe = checkpoints.iter().all(|c| !c.inside_zone);
            safe &= segment_safe;
            total_distance_km += distance_km;

            segments.push(SegmentReport {
                from,
                to,
                distance_km,
                travel_time_hours,
                checkpoints,
                safe: segment_safe,
            });
        }

        RouteReport {
            waypoints,
            segments,
            total_distance_km,
            safe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(lat: f64, lon: f64) -> Position {
        Position { lat, lon }
    }

    /// A rectangular zone between longitudes 4 and 6, latitudes 1 to 10,
    /// with bypass waypoints well south of it.
    fn strip_zone() -> RestrictedZone {
        RestrictedZone::new(
            vec![pos(1.0, 4.0), pos(10.0, 4.0), pos(10.0, 6.0), pos(1.0, 6.0)],
            pos(-5.0, 3.0),
            pos(-5.0, 7.0),
        )
    }

    #[test]
    fn test_contains_inside_and_outside() {
        let zone = strip_zone();
        assert!(zone.contains(pos(5.0, 5.0)));
        assert!(!zone.contains(pos(5.0, 0.0)));
        assert!(!zone.contains(pos(0.0, 5.0)));
        assert!(!zone.contains(pos(5.0, 10.0)));
    }

    #[test]
    fn test_is_route_safe() {
        let zone = strip_zone();
        assert!(zone.is_route_safe(&[pos(0.0, 0.0), pos(0.0, 10.0)]));
        assert!(!zone.is_route_safe(&[pos(0.0, 0.0), pos(5.0, 5.0)]));
    }

    #[test]
    fn test_direct_route_crossing_selects_bypass() {
        let zone = strip_zone();
        let source = pos(5.0, 0.0);
        let destination = pos(5.0, 10.0);

        let eval = zone.evaluate_routes(source, destination, 100.0).unwrap();

        // Direct route crosses the strip; the single-bypass detour is the
        // first safe candidate.
        assert!(!eval.routes[0].safe);
        assert_eq!(eval.safe_route, Some(1));
        assert_eq!(eval.routes.len(), 2, "short-circuits after safe route");
        assert_eq!(eval.routes[1].waypoints[1], zone.bypass_west);
    }

    #[test]
    fn test_westbound_trip_tries_east_bypass_first() {
        let zone = strip_zone();
        let eval = zone
            .evaluate_routes(pos(5.0, 10.0), pos(5.0, 0.0), 100.0)
            .unwrap();
        assert_eq!(eval.safe_route, Some(1));
        assert_eq!(eval.routes[1].waypoints[1], zone.bypass_east);
    }

    #[test]
    fn test_no_safe_route_reported() {
        // Zone engulfs both bypass waypoints; nothing gets through.
        let zone = RestrictedZone::new(
            vec![
                pos(-20.0, 2.0),
                pos(20.0, 2.0),
                pos(20.0, 8.0),
                pos(-20.0, 8.0),
            ],
            pos(0.0, 5.0),
            pos(0.0, 5.5),
        );
        let eval = zone
            .evaluate_routes(pos(5.0, 0.0), pos(5.0, 10.0), 100.0)
            .unwrap();

        assert_eq!(eval.safe_route, None);
        assert_eq!(eval.routes.len(), 3, "all candidates evaluated");
        assert!(eval.routes.iter().all(|r| !r.safe));
    }

    #[test]
    fn test_endpoint_inside_zone_rejected() {
        let zone = strip_zone();
        let inside = pos(5.0, 5.0);
        let outside = pos(5.0, 0.0);

        let err = zone.evaluate_routes(inside, outside, 50.0).unwrap_err();
        assert!(matches!(err, ZoneError::PointInsideRestrictedZone { .. }));

        let err = zone.evaluate_routes(outside, inside, 50.0).unwrap_err();
        assert!(matches!(err, ZoneError::PointInsideRestrictedZone { .. }));
    }

    #[test]
    fn test_degenerate_speed_rejected() {
        let zone = strip_zone();
        // Direct path crosses the zone; at these speeds the hourly
        // checkpoint sequence could not witness the crossing (or would
        // explode in length), so evaluation must refuse outright.
        let source = pos(5.0, 0.0);
        let destination = pos(5.0, 10.0);

        for speed_kmh in [0.0, -10.0, 1e-9, f64::NAN, f64::INFINITY] {
            let err = zone
                .evaluate_routes(source, destination, speed_kmh)
                .unwrap_err();
            assert!(
                matches!(err, ZoneError::InvalidSpeed { .. }),
                "speed {} must be rejected, got {:?}",
                speed_kmh,
                err
            );
        }
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let zone = strip_zone();
        let err = zone
            .evaluate_routes(pos(95.0, 0.0), pos(0.0, 0.0), 50.0)
            .unwrap_err();
        assert!(matches!(err, ZoneError::Geo(_)));
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let zone = RestrictedZone::indian_ocean();
        let source = pos(2.0, 75.0);
        let destination = pos(2.0, 88.0);

        let a = zone.evaluate_routes(source, destination, 50.0).unwrap();
        let b = zone.evaluate_routes(source, destination, 50.0).unwrap();

        assert_eq!(a.safe_route, b.safe_route);
        assert_eq!(a.routes.len(), b.routes.len());
        assert_eq!(
            a.routes[0].total_distance_km,
            b.routes[0].total_distance_km
        );
    }

    #[test]
    fn test_evaluation_serializes_camel_case() {
        let zone = strip_zone();
        let eval = zone
            .evaluate_routes(pos(5.0, 0.0), pos(5.0, 10.0), 100.0)
            .unwrap();
        let json = serde_json::to_value(&eval).unwrap();

        assert_eq!(json["safeRoute"], 1);
        let checkpoint = &json["routes"][0]["segments"][0]["checkpoints"][0];
        assert_eq!(checkpoint["position"]["latitude"], 5.0);
        assert_eq!(checkpoint["insideZone"], false);
        assert!(json["routes"][0]["totalDistanceKm"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_operational_zone_waypoints_outside() {
        let zone = RestrictedZone::indian_ocean();
        assert!(!zone.contains(zone.bypass_west));
        assert!(!zone.contains(zone.bypass_east));
    }
}
