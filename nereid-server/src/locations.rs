//! Open-Water Location Sampling
//!
//! Random positions inside the operational area, used to seed exercises
//! and demo targets. Samples are drawn uniformly within one of a fixed
//! set of ocean bounding boxes, so generated points avoid the mainland.

use rand::Rng;

use nereid_core::geo::Position;

/// Decimal places kept on generated coordinates.
const COORDINATE_PRECISION: i32 = 6;

/// Maximum number of locations one request may generate.
pub const MAX_LOCATIONS: usize = 100;

/// Coordinate bounds of one ocean zone.
#[derive(Debug, Clone, Copy)]
struct OceanZone {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

/// Approximate ocean zones around the operational area.
const OCEAN_ZONES: [OceanZone; 5] = [
    // Arabian Sea (west coast)
    OceanZone { min_lat: 7.0, max_lat: 23.5, min_lon: 66.5, max_lon: 76.5 },
    // Bay of Bengal (east coast)
    OceanZone { min_lat: 6.0, max_lat: 22.5, min_lon: 80.0, max_lon: 92.5 },
    // Lakshadweep area (southwest)
    OceanZone { min_lat: 8.0, max_lat: 13.5, min_lon: 70.0, max_lon: 74.5 },
    // Andaman & Nicobar Islands region (southeast)
    OceanZone { min_lat: 5.0, max_lat: 14.5, min_lon: 91.0, max_lon: 94.5 },
    // Southern Indian Ocean zone
    OceanZone { min_lat: 1.0, max_lat: 7.0, min_lon: 75.0, max_lon: 90.0 },
];

fn round(value: f64) -> f64 {
    let factor = 10f64.powi(COORDINATE_PRECISION);
    (value * factor).round() / factor
}

/// Generate one random open-water position.
pub fn random_location<R: Rng>(rng: &mut R) -> Position {
    let zone = OCEAN_ZONES[rng.gen_range(0..OCEAN_ZONES.len())];
    Position {
        lat: round(rng.gen_range(zone.min_lat..=zone.max_lat)),
        lon: round(rng.gen_range(zone.min_lon..=zone.max_lon)),
    }
}

/// Generate `count` random open-water positions, capped at
/// [`MAX_LOCATIONS`] and floored at one.
pub fn random_locations<R: Rng>(rng: &mut R, count: usize) -> Vec<Position> {
    let count = count.clamp(1, MAX_LOCATIONS);
    (0..count).map(|_| random_location(rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locations_fall_in_a_zone() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let p = random_location(&mut rng);
            assert!(p.validate().is_ok());
            assert!(
                OCEAN_ZONES.iter().any(|z| {
                    p.lat >= z.min_lat
                        && p.lat <= z.max_lat
                        && p.lon >= z.min_lon
                        && p.lon <= z.max_lon
                }),
                "{:?} outside every zone",
                p
            );
        }
    }

    #[test]
    fn test_count_is_clamped() {
        let mut rng = rand::thread_rng();
        assert_eq!(random_locations(&mut rng, 0).len(), 1);
        assert_eq!(random_locations(&mut rng, 5).len(), 5);
        assert_eq!(random_locations(&mut rng, 1000).len(), MAX_LOCATIONS);
    }
}
