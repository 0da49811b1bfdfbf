//! Allocation Coordinator
//!
//! Drives one allocation request through its lifecycle:
//!
//! ```text
//! RECEIVED -> SCORED -> CLAIMING -> { COMMITTED | EXHAUSTED }
//! ```
//!
//! Scoring and ranking run on a snapshot with no lock held, so two
//! concurrent requests may rank the same top unit. Only the claim step
//! is atomic (one conditional write per attempt, strictly in rank
//! order); exactly one of the contenders wins the unit and the other
//! falls through to its next-ranked candidate. A committed claim is
//! final: the coordinator never un-claims, not even when the caller has
//! gone away.

use std::sync::Arc;
use thiserror::Error;

use nereid_core::geo::{self, GeoError, Position};
use nereid_core::scoring::{self, CandidateScore, ScoringError, UnitProfile};

use crate::repository::{AllocationOutcome, OutcomeDraft, RepositoryError, UnitRepository};

/// One allocation request as received from the caller.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub alert_type: String,
    pub target_latitude: f64,
    pub target_longitude: f64,
    pub climate_condition: f64,
}

/// Allocation failures.
///
/// `NoCandidates` and `AllAllocated` are legitimate business outcomes
/// (nothing to dispatch, or every candidate lost its claim race); the
/// rest are input or system faults.
#[derive(Debug, Error)]
pub enum AllocateError {
    #[error(transparent)]
    InvalidCoordinate(#[from] GeoError),

    #[error("alert type '{0}' not found")]
    AlertTypeNotFound(String),

    #[error("no units available")]
    NoCandidates,

    #[error("every ranked candidate was claimed by a concurrent request")]
    AllAllocated,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ScoringError> for AllocateError {
    fn from(err: ScoringError) -> Self {
        match err {
            ScoringError::Geo(geo) => AllocateError::InvalidCoordinate(geo),
            ScoringError::NoCandidates => AllocateError::NoCandidates,
        }
    }
}

/// Coordinates scoring, claiming and outcome recording for allocations.
///
/// Cheap to clone per request; all shared state lives in the repository.
#[derive(Clone)]
pub struct AllocationCoordinator {
    repository: Arc<dyn UnitRepository>,
}

impl AllocationCoordinator {
    pub fn new(repository: Arc<dyn UnitRepository>) -> Self {
        AllocationCoordinator { repository }
    }

    /// Resolve one allocation request to a committed outcome.
    ///
    /// Claim attempts run strictly sequentially in rank order; a lost
    /// race moves on to the next candidate, while a repository failure
    /// aborts the whole attempt so a systemic outage is never reported
    /// as "nothing available".
    pub async fn allocate(
        &self,
        request: &AllocationRequest,
    ) -> Result<AllocationOutcome, AllocateError> {
        // RECEIVED: resolve the alert profile and validate the target.
        let target = Position::new(request.target_latitude, request.target_longitude)?;
        let alert = self
            .repository
            .get_alert_profile(&request.alert_type)
            .await?
            .ok_or_else(|| AllocateError::AlertTypeNotFound(request.alert_type.clone()))?;

        // SCORED: snapshot available units and rank them. No lock is
        // held here; the snapshot may go stale and the claim loop below
        // absorbs that.
        let units = self.repository.list_available_units().await?;
        let ranked = scoring::rank(scoring::score_batch(
            &alert,
            &units,
            target,
            request.climate_condition,
        )?);

        // CLAIMING: first successful conditional claim wins.
        for candidate in &ranked {
            if !self.repository.try_claim(candidate.unit_id).await? {
                log::debug!(
                    "unit {} already claimed, falling through to next candidate",
                    candidate.unit_id
                );
                continue;
            }

            let unit = units
                .iter()
                .find(|u| u.id == candidate.unit_id)
                .ok_or(RepositoryError::UnitNotFound(candidate.unit_id))?;

            return Ok(self.commit(&alert.name, unit, candidate, target).await?);
        }

        // EXHAUSTED: every ranked candidate lost its race.
        log::info!(
            "allocation for '{}' exhausted all {} candidates",
            request.alert_type,
            ranked.len()
        );
        Err(AllocateError::AllAllocated)
    }

    /// COMMITTED: record the outcome and advance the unit to the final
    /// checkpoint of its route as the dispatch side effect.
    async fn commit(
        &self,
        alert_type: &str,
        unit: &UnitProfile,
        candidate: &CandidateScore,
        target: Position,
    ) -> Result<AllocationOutcome, RepositoryError> {
        let outcome = self
            .repository
            .record_outcome(OutcomeDraft {
                alert_type: alert_type.to_string(),
                unit_id: unit.id,
                unit_name: unit.name.clone(),
                final_score: candidate.final_score,
                distance_km: candidate.distance_km,
                estimated_time_hours: candidate.travel_time_hours,
            })
            .await?;

        // Same speed floor as scoring: keeps the checkpoint count
        // bounded for a stopped or misreported unit.
        let checkpoints = geo::hourly_checkpoints(
            unit.position,
            target,
            unit.speed_kmh.max(scoring::SPEED_FLOOR_KMH),
        );
        if let Some(&last) = checkpoints.last() {
            self.repository.update_position(unit.id, last).await?;
        }

        log::info!(
            "committed unit {} ({}) to '{}': score {:.3}, {:.1} km, {:.2} h",
            unit.id,
            unit.name,
            alert_type,
            candidate.final_score,
            candidate.distance_km,
            candidate.travel_time_hours
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use nereid_core::scoring::Availability;

    fn request(alert_type: &str) -> AllocationRequest {
        AllocationRequest {
            alert_type: alert_type.to_string(),
            target_latitude: 13.5,
            target_longitude: 80.5,
            climate_condition: 3.0,
        }
    }

    fn coordinator() -> (AllocationCoordinator, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::with_default_fleet());
        (AllocationCoordinator::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_allocation_commits_and_claims_unit() {
        let (coordinator, repo) = coordinator();
        let outcome = coordinator.allocate(&request("Ship Attack")).await.unwrap();

        assert!(outcome.distance_km > 0.0);
        assert!(outcome.estimated_time_hours > 0.0);
        assert_eq!(outcome.alert_type, "Ship Attack");

        let unit = repo.get_unit(outcome.unit_id).await.unwrap().unwrap();
        assert_eq!(unit.availability, Availability::Claimed);
    }

    #[tokio::test]
    async fn test_unknown_alert_type() {
        let (coordinator, _repo) = coordinator();
        let err = coordinator.allocate(&request("Kraken")).await.unwrap_err();
        assert!(matches!(err, AllocateError::AlertTypeNotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_target_coordinates() {
        let (coordinator, _repo) = coordinator();
        let mut req = request("Ship Attack");
        req.target_latitude = 91.0;
        let err = coordinator.allocate(&req).await.unwrap_err();
        assert!(matches!(err, AllocateError::InvalidCoordinate(_)));
    }

    #[tokio::test]
    async fn test_no_candidates_when_fleet_fully_claimed() {
        let (coordinator, repo) = coordinator();
        for id in 1..=5 {
            assert!(repo.try_claim(id).await.unwrap());
        }
        let err = coordinator.allocate(&request("Ship Attack")).await.unwrap_err();
        assert!(matches!(err, AllocateError::NoCandidates));
    }

    #[tokio::test]
    async fn test_dispatch_advances_unit_position() {
        let (coordinator, repo) = coordinator();
        let outcome = coordinator.allocate(&request("Ship Attack")).await.unwrap();

        let unit = repo.get_unit(outcome.unit_id).await.unwrap().unwrap();
        // Final checkpoint of the route is the target itself.
        assert!((unit.position.lat - 13.5).abs() < 1e-9);
        assert!((unit.position.lon - 80.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_zero_speed_unit_commits_with_finite_route() {
        use crate::repository::{default_alert_catalog, NewUnit};
        use nereid_core::geo::Position;
        use nereid_core::scoring::HazardWeights;

        let repo = Arc::new(MemoryRepository::new(default_alert_catalog()));
        let unit = repo
            .add_unit(NewUnit {
                name: "INS Adrift".to_string(),
                position: Position { lat: 13.0, lon: 80.0 },
                speed_kmh: 0.0,
                aptitude: HazardWeights {
                    attack: 0.9,
                    ..HazardWeights::default()
                },
                climate_aptitude: 0.2,
            })
            .await
            .unwrap();
        let coordinator = AllocationCoordinator::new(repo.clone());

        let outcome = coordinator.allocate(&request("Ship Attack")).await.unwrap();
        assert_eq!(outcome.unit_id, unit.id);
        assert!(outcome.estimated_time_hours.is_finite());

        // Dispatch still advances the unit to the target.
        let moved = repo.get_unit(unit.id).await.unwrap().unwrap();
        assert!((moved.position.lat - 13.5).abs() < 1e-9);
        assert!((moved.position.lon - 80.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_successive_allocations_pick_distinct_units() {
        let (coordinator, _repo) = coordinator();
        let first = coordinator.allocate(&request("Ship Attack")).await.unwrap();
        let second = coordinator.allocate(&request("Ship Attack")).await.unwrap();
        assert_ne!(first.unit_id, second.unit_id);
        assert!(second.sequence > first.sequence);
    }
}
