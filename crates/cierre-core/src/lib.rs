//! Application closure and cost reconciliation engine.
//!
//! At the end of a field application the engine aggregates actual product
//! usage ([`usage`]) and actual labor time ([`labor`]), normalizes raw field
//! units into canonical ones ([`units`]), reconciles both cost streams into
//! per-parcel and per-tree figures, and drives the irreversible multi-entity
//! commit that closes the application ([`workflow`]).

pub mod error;
pub mod labor;
pub mod units;
pub mod usage;
pub mod workflow;

pub use error::CoreError;
