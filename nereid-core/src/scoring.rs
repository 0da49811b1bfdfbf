//! Candidate Scoring and Ranking
//!
//! Given an alert profile and a batch of available units, this module
//! computes a composite desirability score per unit and ranks the batch.
//! The score combines three components:
//!
//! - **hazard alignment**: how well the unit's aptitudes match the
//!   alert's hazard weights (linear-weighted mean)
//! - **time desirability**: how quickly the unit can reach the target,
//!   normalized against the batch
//! - **climate suitability**: the unit's fit for the reported conditions
//!
//! Scoring is a strict two-pass process: the time component is min-max
//! normalized against the whole batch, so it can only be computed after
//! every candidate's raw travel time is known. The linear-weighted forms
//! are used throughout (rather than power forms) so scores stay finite
//! and real for any non-negative inputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{self, GeoError, Position};

/// Floor applied to unit speed when estimating travel time, in km/h.
/// Keeps a stopped or misreported unit scoreable without dividing by zero.
pub const SPEED_FLOOR_KMH: f64 = 0.1;

/// Floor for the batch time spread during min-max normalization.
const TIME_SPREAD_FLOOR: f64 = 1e-6;

/// Fixed coefficients of the composite score.
const HAZARD_COEFFICIENT: f64 = 0.4;
const TIME_COEFFICIENT: f64 = 0.3;
const CLIMATE_COEFFICIENT: f64 = 0.3;

/// Scoring errors
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ScoringError {
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// The candidate batch was empty: no units are available at all.
    #[error("no candidate units available")]
    NoCandidates,
}

/// Named per-hazard weights.
///
/// Used both as an alert's severity profile and as a unit's aptitude
/// vector; the field names pair up one-to-one between the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardWeights {
    pub human_error: f64,
    pub attack: f64,
    pub weather: f64,
    pub robbery: f64,
    pub resource_shortage: f64,
    pub structural_damage: f64,
}

impl HazardWeights {
    /// Number of hazard dimensions.
    pub const COUNT: usize = 6;

    /// Linear-weighted alignment: mean over hazards of weight * aptitude.
    pub fn alignment(&self, aptitude: &HazardWeights) -> f64 {
        (self.human_error * aptitude.human_error
            + self.attack * aptitude.attack
            + self.weather * aptitude.weather
            + self.robbery * aptitude.robbery
            + self.resource_shortage * aptitude.resource_shortage
            + self.structural_damage * aptitude.structural_damage)
            / Self::COUNT as f64
    }
}

/// An incident category and its severity weights. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertProfile {
    pub name: String,
    pub weights: HazardWeights,
}

/// Availability state of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Claimed,
}

impl Default for Availability {
    fn default() -> Self {
        Availability::Available
    }
}

/// A dispatchable unit as snapshotted from the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProfile {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub speed_kmh: f64,
    pub aptitude: HazardWeights,
    pub climate_aptitude: f64,
    pub availability: Availability,
}

/// Per-candidate scoring breakdown for one allocation request.
///
/// Ephemeral: created per request, discarded after the claim phase. The
/// final score is a pure function of the other fields and is never
/// adjusted independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    pub unit_id: u32,
    pub distance_km: f64,
    pub travel_time_hours: f64,
    /// Batch-normalized time desirability in [0, 1]; 1 is the fastest
    /// responder in the batch
    pub time_desirability: f64,
    pub hazard_score: f64,
    pub climate_score: f64,
    pub final_score: f64,
}

/// Score a batch of units against one alert and target.
///
/// Pass one computes distance, raw travel time, hazard alignment and
/// climate score per unit. Pass two normalizes time desirability against
/// the batch extremes and combines the composite score. The two-pass
/// order is load-bearing: a candidate's time desirability depends on the
/// whole batch.
pub fn score_batch(
    alert: &AlertProfile,
    units: &[UnitProfile],
    target: Position,
    climate_choice: f64,
) -> Result<Vec<CandidateScore>, ScoringError> {
    if units.is_empty() {
        return Err(ScoringError::NoCandidates);
    }
    target.validate()?;

    let mut candidates = Vec::with_capacity(units.len());
    for unit in units {
        let distance_km = geo::distance_km(unit.position, target)?;
        let travel_time_hours = distance_km / unit.speed_kmh.max(SPEED_FLOOR_KMH);
        candidates.push(CandidateScore {
            unit_id: unit.id,
            distance_km,
            travel_time_hours,
            time_desirability: 0.0,
            hazard_score: alert.weights.alignment(&unit.aptitude),
            climate_score: climate_choice * unit.climate_aptitude,
            final_score: 0.0,
        });
    }

    let max_time = candidates
        .iter()
        .map(|c| c.travel_time_hours)
        .fold(f64::NEG_INFINITY, f64::max);
    let min_time = candidates
        .iter()
        .map(|c| c.travel_time_hours)
        .fold(f64::INFINITY, f64::min);
    let spread = (max_time - min_time).max(TIME_SPREAD_FLOOR);

    for candidate in &mut candidates {
        candidate.time_desirability = (max_time - candidate.travel_time_hours) / spread;
        candidate.final_score = HAZARD_COEFFICIENT * candidate.hazard_score
            + TIME_COEFFICIENT * candidate.time_desirability
            + CLIMATE_COEFFICIENT * candidate.climate_score;
    }

    Ok(candidates)
}

/// Order candidates best-first.
///
/// Descending by final score; ties broken by ascending unit id so the
/// ranking (and therefore the allocation outcome) is reproducible.
pub fn rank(mut candidates: Vec<CandidateScore>) -> Vec<CandidateScore> {
    candidates.sort_by(|a, b| {
        b.final_score
            .total_cmp(&a.final_score)
            .then(a.unit_id.cmp(&b.unit_id))
    });
    candidates
}
