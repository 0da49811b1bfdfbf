//! Nereid Core - Platform-Independent Dispatch Logic
//!
//! This crate contains the pure computational core of the Nereid incident
//! dispatch service. It is deliberately free of I/O, async runtimes and
//! platform-specific code so the same logic can run in the native server,
//! in tools, and in tests without a runtime.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - **geo**: great-circle distance, travel time and hourly checkpoint
//!   generation between two coordinates
//! - **zone**: restricted-zone containment and alternate-route evaluation
//! - **scoring**: alert/unit profiles and the batch scoring + ranking
//!   algorithm that selects dispatch candidates
//!
//! Claiming a unit (the concurrency-sensitive part of an allocation) is
//! not handled here; it lives behind the repository seam in the server
//! crate. This core only produces the ranked candidate list and the route
//! safety verdicts the server acts on.

pub mod geo;
pub mod scoring;
pub mod zone;

pub use geo::{GeoError, Position, EARTH_RADIUS_KM};
pub use scoring::{
    rank, score_batch, AlertProfile, Availability, CandidateScore, HazardWeights, ScoringError,
    UnitProfile,
};
pub use zone::{
    CheckpointReport, RestrictedZone, RouteEvaluation, RouteReport, SegmentReport, ZoneError,
    MIN_SPEED_KMH,
};
