//! The `Store` trait -- the adapter interface for the hosted data store.
//!
//! Every remote read/write the closure engine performs goes through this
//! trait. The trait is intentionally object-safe so it can be shared as
//! `Arc<dyn Store>` across the workflow, and every method maps onto one of
//! the generic operations the hosted store exposes (query, batched query-in,
//! insert, update, delete).

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Application, ApplicationClosure, ClosureRecord, Contractor, DailyMovement, Employee,
    FieldTask, InventoryMovement, InventoryProduct, MovementProduct, Parcel, PlannedProduct,
    WorkRecord,
};

/// Error surface of the persistence collaborator.
///
/// Remote failures are terminal for the current commit attempt; the engine
/// never retries a store call on its own.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection} record {id} not found")]
    NotFound { collection: &'static str, id: Uuid },

    #[error("remote operation failed: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Adapter interface for the hosted data store.
///
/// Batched `..._by_ids` methods exist so callers can resolve lookups in one
/// round trip instead of one call per id; implementations should preserve
/// that property.
#[async_trait]
pub trait Store: Send + Sync {
    // -- applications -----------------------------------------------------

    async fn get_application(&self, id: Uuid) -> StoreResult<Option<Application>>;

    /// Apply the open -> closed patch: state, actual dates, and the final
    /// financial figures. Fails if the application does not exist.
    async fn apply_application_closure(
        &self,
        id: Uuid,
        closure: &ApplicationClosure,
    ) -> StoreResult<()>;

    // -- execution records ------------------------------------------------

    async fn movements_for_application(&self, application_id: Uuid)
    -> StoreResult<Vec<DailyMovement>>;

    /// Batched fetch of all products belonging to the given movements.
    async fn products_for_movements(
        &self,
        movement_ids: &[Uuid],
    ) -> StoreResult<Vec<MovementProduct>>;

    /// Planned products for an application, each paired with the parcel its
    /// mixture is scoped to.
    async fn planned_products_for_application(
        &self,
        application_id: Uuid,
    ) -> StoreResult<Vec<(Uuid, PlannedProduct)>>;

    // -- work records -----------------------------------------------------

    async fn work_records_for_task(&self, task_id: Uuid) -> StoreResult<Vec<WorkRecord>>;

    async fn insert_work_record(&self, record: &WorkRecord) -> StoreResult<()>;

    /// Update the fraction and derived cost of a persisted work record.
    async fn update_work_record(&self, id: Uuid, fraction: f64, cost: f64) -> StoreResult<()>;

    async fn delete_work_record(&self, id: Uuid) -> StoreResult<()>;

    // -- catalogs (batched lookups) ---------------------------------------

    async fn employees_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Employee>>;

    async fn contractors_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Contractor>>;

    async fn parcels_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Parcel>>;

    // -- inventory --------------------------------------------------------

    async fn inventory_product(&self, id: Uuid) -> StoreResult<Option<InventoryProduct>>;

    /// Batched fetch used by the usage aggregator to price all consumed
    /// products in one call.
    async fn inventory_products_by_ids(&self, ids: &[Uuid])
    -> StoreResult<Vec<InventoryProduct>>;

    /// Overwrite a product's on-hand balance. No precondition on the stored
    /// value: concurrent closures of the same product are subject to a
    /// lost-update race the hosted store does not let us guard against.
    async fn update_inventory_balance(&self, id: Uuid, new_balance: f64) -> StoreResult<()>;

    async fn insert_inventory_movement(&self, movement: &InventoryMovement) -> StoreResult<()>;

    // -- closure records and tasks ----------------------------------------

    async fn insert_closure_record(&self, record: &ClosureRecord) -> StoreResult<()>;

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<FieldTask>>;

    /// Mark a field task completed and stamp its actual end date.
    async fn complete_task(&self, id: Uuid, actual_end: NaiveDate) -> StoreResult<()>;
}

// Compile-time assertion: Store must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Store) {}
};
