//! Unit Repository
//!
//! The repository is the only holder of mutable unit state. The core
//! never owns persistent records; it reads snapshots and asks the
//! repository for a conditional claim. The trait is async so a database
//! backend can slot in behind it; the bundled [`MemoryRepository`] keeps
//! everything in-process.
//!
//! The one hard requirement on any implementation is that
//! [`UnitRepository::try_claim`] is atomic per unit: exactly one caller
//! ever observes the Available to Claimed transition for a given
//! availability window, no matter how requests interleave.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

use nereid_core::geo::Position;
use nereid_core::scoring::{AlertProfile, Availability, HazardWeights, UnitProfile};

/// Repository errors. These are system faults, distinct from business
/// outcomes like losing a claim race.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("unit {0} not found")]
    UnitNotFound(u32),

    #[error("repository backend failure: {0}")]
    Backend(String),
}

/// Fields of an allocation outcome before the repository assigns its
/// position in the result log.
#[derive(Debug, Clone)]
pub struct OutcomeDraft {
    pub alert_type: String,
    pub unit_id: u32,
    pub unit_name: String,
    pub final_score: f64,
    pub distance_km: f64,
    pub estimated_time_hours: f64,
}

/// The committed result of one allocation. Created exactly once per
/// successful allocation and appended to the result log; never updated
/// or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationOutcome {
    /// Monotonically increasing over the life of the repository
    pub sequence: u64,
    pub alert_type: String,
    pub unit_id: u32,
    pub unit_name: String,
    pub final_score: f64,
    pub distance_km: f64,
    pub estimated_time_hours: f64,
    pub timestamp: DateTime<Utc>,
}

/// A unit as submitted for registration; the repository assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUnit {
    pub name: String,
    pub position: Position,
    pub speed_kmh: f64,
    pub aptitude: HazardWeights,
    pub climate_aptitude: f64,
}

/// Storage collaborator for units, alert profiles and the result log.
#[async_trait]
pub trait UnitRepository: Send + Sync {
    async fn list_units(&self) -> Result<Vec<UnitProfile>, RepositoryError>;

    async fn get_unit(&self, unit_id: u32) -> Result<Option<UnitProfile>, RepositoryError>;

    async fn add_unit(&self, unit: NewUnit) -> Result<UnitProfile, RepositoryError>;

    /// Snapshot of all units currently in the Available state.
    async fn list_available_units(&self) -> Result<Vec<UnitProfile>, RepositoryError>;

    /// Atomic conditional claim: transitions the unit from Available to
    /// Claimed and returns true iff this call performed the transition.
    /// Returns false when the unit is already claimed. Never a
    /// read-then-write pair; one call, one atomic step.
    async fn try_claim(&self, unit_id: u32) -> Result<bool, RepositoryError>;

    /// Return a claimed unit to service. The allocation flow itself
    /// never calls this; it exists for the external release path
    /// (mission completion, operator action).
    async fn release(&self, unit_id: u32) -> Result<UnitProfile, RepositoryError>;

    async fn update_position(
        &self,
        unit_id: u32,
        position: Position,
    ) -> Result<(), RepositoryError>;

    async fn get_alert_profile(
        &self,
        name: &str,
    ) -> Result<Option<AlertProfile>, RepositoryError>;

    async fn list_alert_profiles(&self) -> Result<Vec<AlertProfile>, RepositoryError>;

    /// Append to the result log, assigning the next sequence number.
    async fn record_outcome(
        &self,
        draft: OutcomeDraft,
    ) -> Result<AllocationOutcome, RepositoryError>;

    /// The result log, oldest first.
    async fn list_outcomes(&self) -> Result<Vec<AllocationOutcome>, RepositoryError>;
}

struct Inner {
    units: BTreeMap<u32, UnitProfile>,
    next_unit_id: u32,
    alerts: Vec<AlertProfile>,
    outcomes: Vec<AllocationOutcome>,
    next_sequence: u64,
}

/// In-process repository.
///
/// A single mutex guards all state, so `try_claim` is one atomic
/// check-and-set and a concurrent claimer can never observe the window
/// between the availability check and the write.
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    /// Create an empty repository with the given alert catalog.
    pub fn new(alerts: Vec<AlertProfile>) -> Self {
        MemoryRepository {
            inner: Mutex::new(Inner {
                units: BTreeMap::new(),
                next_unit_id: 1,
                alerts,
                outcomes: Vec::new(),
                next_sequence: 1,
            }),
        }
    }

    /// Repository seeded with the standard alert catalog and fleet.
    pub fn with_default_fleet() -> Self {
        let repo = MemoryRepository::new(default_alert_catalog());
        {
            let mut inner = repo.inner.lock().expect("fresh mutex");
            for unit in default_fleet() {
                inner.units.insert(unit.id, unit);
            }
            inner.next_unit_id = inner.units.keys().max().map_or(1, |id| id + 1);
        }
        repo
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, RepositoryError> {
        self.inner
            .lock()
            .map_err(|_| RepositoryError::Backend("repository lock poisoned".to_string()))
    }
}

#[async_trait]
impl UnitRepository for MemoryRepository {
    async fn list_units(&self) -> Result<Vec<UnitProfile>, RepositoryError> {
        Ok(self.lock()?.units.values().cloned().collect())
    }

    async fn get_unit(&self, unit_id: u32) -> Result<Option<UnitProfile>, RepositoryError> {
        Ok(self.lock()?.units.get(&unit_id).cloned())
    }

    async fn add_unit(&self, unit: NewUnit) -> Result<UnitProfile, RepositoryError> {
        let mut inner = self.lock()?;
        let id = inner.next_unit_id;
        inner.next_unit_id += 1;
        let profile = UnitProfile {
            id,
            name: unit.name,
            position: unit.position,
            speed_kmh: unit.speed_kmh,
            aptitude: unit.aptitude,
            climate_aptitude: unit.climate_aptitude,
            availability: Availability::Available,
        };
        inner.units.insert(id, profile.clone());
        Ok(profile)
    }

    async fn list_available_units(&self) -> Result<Vec<UnitProfile>, RepositoryError> {
        Ok(self
            .lock()?
            .units
            .values()
            .filter(|u| u.availability == Availability::Available)
            .cloned()
            .collect())
    }

    async fn try_claim(&self, unit_id: u32) -> Result<bool, RepositoryError> {
        let mut inner = self.lock()?;
        let unit = inner
            .units
            .get_mut(&unit_id)
            .ok_or(RepositoryError::UnitNotFound(unit_id))?;
        if unit.availability == Availability::Available {
            unit.availability = Availability::Claimed;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn release(&self, unit_id: u32) -> Result<UnitProfile, RepositoryError> {
        let mut inner = self.lock()?;
        let unit = inner
            .units
            .get_mut(&unit_id)
            .ok_or(RepositoryError::UnitNotFound(unit_id))?;
        unit.availability = Availability::Available;
        Ok(unit.clone())
    }

    async fn update_position(
        &self,
        unit_id: u32,
        position: Position,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.lock()?;
        let unit = inner
            .units
            .get_mut(&unit_id)
            .ok_or(RepositoryError::UnitNotFound(unit_id))?;
        unit.position = position;
        Ok(())
    }

    async fn get_alert_profile(
        &self,
        name: &str,
    ) -> Result<Option<AlertProfile>, RepositoryError> {
        Ok(self
            .lock()?
            .alerts
            .iter()
            .find(|a| a.name == name)
            .cloned())
    }

    async fn list_alert_profiles(&self) -> Result<Vec<AlertProfile>, RepositoryError> {
        Ok(self.lock()?.alerts.clone())
    }

    async fn record_outcome(
        &self,
        draft: OutcomeDraft,
    ) -> Result<AllocationOutcome, RepositoryError> {
        let mut inner = self.lock()?;
        let outcome = AllocationOutcome {
            sequence: inner.next_sequence,
            alert_type: draft.alert_type,
            unit_id: draft.unit_id,
            unit_name: draft.unit_name,
            final_score: draft.final_score,
            distance_km: draft.distance_km,
            estimated_time_hours: draft.estimated_time_hours,
            timestamp: Utc::now(),
        };
        inner.next_sequence += 1;
        inner.outcomes.push(outcome.clone());
        Ok(outcome)
    }

    async fn list_outcomes(&self) -> Result<Vec<AllocationOutcome>, RepositoryError> {
        Ok(self.lock()?.outcomes.clone())
    }
}

fn weights(
    human_error: f64,
    attack: f64,
    weather: f64,
    robbery: f64,
    resource_shortage: f64,
    structural_damage: f64,
) -> HazardWeights {
    HazardWeights {
        human_error,
        attack,
        weather,
        robbery,
        resource_shortage,
        structural_damage,
    }
}

/// Standard alert catalog.
pub fn default_alert_catalog() -> Vec<AlertProfile> {
    let catalog = [
        ("Ship Drawn", weights(7.0, 2.0, 1.0, 1.0, 1.0, 5.0)),
        ("Ship Accident", weights(8.0, 1.0, 3.0, 1.0, 2.0, 6.0)),
        ("Ship Attack", weights(3.0, 9.0, 1.0, 4.0, 1.0, 2.0)),
        ("Ship Hijack", weights(4.0, 10.0, 2.0, 8.0, 1.0, 1.0)),
        ("Navy Attack", weights(2.0, 10.0, 1.0, 2.0, 3.0, 3.0)),
        ("Ship Struck", weights(6.0, 1.0, 5.0, 1.0, 1.0, 8.0)),
        ("Shortage of Resources", weights(9.0, 1.0, 2.0, 1.0, 9.0, 1.0)),
    ];
    catalog
        .into_iter()
        .map(|(name, weights)| AlertProfile {
            name: name.to_string(),
            weights,
        })
        .collect()
}

/// Standard fleet.
pub fn default_fleet() -> Vec<UnitProfile> {
    let fleet = [
        (1, "INS Vikrant", 60.0, 12.9716, 77.5946, weights(0.7, 0.4, 0.3, 0.3, 0.5, 0.4), 0.2),
        (2, "INS Talwar", 50.0, 13.0827, 80.2707, weights(0.6, 0.5, 0.4, 0.4, 0.3, 0.3), 0.1),
        (3, "INS Kolkata", 55.0, 9.9252, 78.1198, weights(0.5, 0.6, 0.3, 0.5, 0.4, 0.3), 0.3),
        (4, "INS Chakra", 45.0, 15.3173, 75.7139, weights(0.4, 0.8, 0.2, 0.6, 0.2, 0.2), 0.2),
        (5, "INS Vikramaditya", 40.0, 19.076, 72.8777, weights(0.8, 0.3, 0.4, 0.2, 0.6, 0.5), 0.1),
    ];
    fleet
        .into_iter()
        .map(
            |(id, name, speed_kmh, lat, lon, aptitude, climate_aptitude)| UnitProfile {
                id,
                name: name.to_string(),
                position: Position { lat, lon },
                speed_kmh,
                aptitude,
                climate_aptitude,
                availability: Availability::Available,
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_is_exclusive_until_release() {
        let repo = MemoryRepository::with_default_fleet();

        assert!(repo.try_claim(2).await.unwrap());
        assert!(!repo.try_claim(2).await.unwrap(), "second claim must lose");

        let unit = repo.get_unit(2).await.unwrap().unwrap();
        assert_eq!(unit.availability, Availability::Claimed);

        repo.release(2).await.unwrap();
        assert!(repo.try_claim(2).await.unwrap(), "claimable again after release");
    }

    #[tokio::test]
    async fn test_claim_unknown_unit_is_an_error() {
        let repo = MemoryRepository::with_default_fleet();
        assert_eq!(
            repo.try_claim(999).await.unwrap_err(),
            RepositoryError::UnitNotFound(999)
        );
    }

    #[tokio::test]
    async fn test_available_list_excludes_claimed() {
        let repo = MemoryRepository::with_default_fleet();
        let before = repo.list_available_units().await.unwrap().len();
        repo.try_claim(1).await.unwrap();
        let after = repo.list_available_units().await.unwrap();
        assert_eq!(after.len(), before - 1);
        assert!(after.iter().all(|u| u.id != 1));
    }

    #[tokio::test]
    async fn test_outcome_log_sequences_monotonically() {
        let repo = MemoryRepository::with_default_fleet();
        let draft = |n: &str| OutcomeDraft {
            alert_type: "Ship Attack".to_string(),
            unit_id: 1,
            unit_name: n.to_string(),
            final_score: 1.0,
            distance_km: 10.0,
            estimated_time_hours: 0.2,
        };

        let a = repo.record_outcome(draft("a")).await.unwrap();
        let b = repo.record_outcome(draft("b")).await.unwrap();
        assert!(b.sequence > a.sequence);

        let log = repo.list_outcomes().await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].sequence, a.sequence);
    }

    #[tokio::test]
    async fn test_add_unit_assigns_fresh_id() {
        let repo = MemoryRepository::with_default_fleet();
        let added = repo
            .add_unit(NewUnit {
                name: "INS Kavaratti".to_string(),
                position: Position { lat: 11.0, lon: 75.0 },
                speed_kmh: 48.0,
                aptitude: weights(0.5, 0.5, 0.5, 0.5, 0.5, 0.5),
                climate_aptitude: 0.2,
            })
            .await
            .unwrap();
        assert_eq!(added.id, 6);
        assert_eq!(added.availability, Availability::Available);
    }

    #[tokio::test]
    async fn test_alert_catalog_lookup() {
        let repo = MemoryRepository::with_default_fleet();
        assert!(repo
            .get_alert_profile("Ship Hijack")
            .await
            .unwrap()
            .is_some());
        assert!(repo.get_alert_profile("Volcano").await.unwrap().is_none());
    }
}
