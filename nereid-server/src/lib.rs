//! Nereid Server
//!
//! REST server for the Nereid incident dispatch service. The pure
//! dispatch logic (geometry, zone routing, scoring) lives in
//! `nereid-core`; this crate adds the pieces that need a runtime:
//!
//! - **repository**: the unit/alert/outcome store behind the atomic
//!   claim primitive
//! - **coordinator**: the per-request allocation state machine
//! - **web**: axum routes and HTTP status mapping
//! - **locations**: random open-water positions for exercises

pub mod coordinator;
pub mod locations;
pub mod repository;
pub mod web;

pub use coordinator::{AllocateError, AllocationCoordinator, AllocationRequest};
pub use repository::{
    AllocationOutcome, MemoryRepository, NewUnit, OutcomeDraft, RepositoryError, UnitRepository,
};
pub use web::{router, AppState};
