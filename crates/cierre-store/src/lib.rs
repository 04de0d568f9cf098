//! Domain records and the persistence collaborator for the closure engine.
//!
//! The engine never talks to the hosted data store directly; everything goes
//! through the [`store::Store`] trait. [`memory::MemoryStore`] is the
//! in-process backend used by the CLI snapshot format and the test suites.

pub mod memory;
pub mod models;
pub mod snapshot;
pub mod store;
