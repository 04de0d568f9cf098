//! Shared test utilities for cierre integration tests.
//!
//! [`FarmFixture`] seeds a [`MemoryStore`] with a small but complete farm
//! dataset (an open spray application with movements, planned products,
//! work records, workers, and inventory) and hands back the generated ids.
//! [`FlakyStore`] wraps any store and fails the Nth write, for exercising
//! the partial-commit semantics of the closure sequence.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use cierre_store::memory::MemoryStore;
use cierre_store::models::{
    Application, ApplicationClosure, ApplicationKind, ApplicationState, ClosureRecord,
    Contractor, DailyMovement, Employee, FieldTask, InventoryMovement, InventoryProduct,
    MovementProduct, Parcel, PlannedMixture, PlannedProduct, TaskState, WorkRecord, WorkerRef,
};
use cierre_store::store::{Store, StoreError, StoreResult};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

/// Ids of everything [`FarmFixture::seed`] creates.
#[derive(Debug, Clone)]
pub struct FarmFixture {
    pub application_id: Uuid,
    pub task_id: Uuid,
    pub parcel_1: Uuid,
    pub parcel_2: Uuid,
    /// Liquid product (cobre), priced 10_000 per liter, 20 L on hand.
    pub product_1: Uuid,
    /// Solid product (urea), priced 5_000 per kg, 100 kg on hand.
    pub product_2: Uuid,
    /// Salaried: 1_300_000 monthly, 48 weekly hours.
    pub employee_id: Uuid,
    /// Flat rate: 80_000 per jornal.
    pub contractor_id: Uuid,
    /// Employee, 1.0 jornal on parcel 1, day 1.
    pub work_record_1: Uuid,
    /// Contractor, 0.5 jornal on parcel 2, day 2.
    pub work_record_2: Uuid,
}

impl FarmFixture {
    /// Seed the standard dataset:
    ///
    /// - parcel 1 "lote 1" (100 trees), parcel 2 "lote 2" (150 trees)
    /// - open spray application over both parcels, linked to an in-progress
    ///   task, planned 2026-03-01..2026-03-05
    /// - movements: lote 1 gets 5 + 3 canecas, lote 2 gets 2 bultos
    /// - products: 1000 cc + 500 cc of product 1 on lote 1; 2 kg of
    ///   product 2 on lote 2
    /// - planned: 2 L of product 1 on lote 1
    pub async fn seed() -> (Arc<MemoryStore>, Self) {
        let store = Arc::new(MemoryStore::new());

        let fixture = Self {
            application_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            parcel_1: Uuid::new_v4(),
            parcel_2: Uuid::new_v4(),
            product_1: Uuid::new_v4(),
            product_2: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            contractor_id: Uuid::new_v4(),
            work_record_1: Uuid::new_v4(),
            work_record_2: Uuid::new_v4(),
        };

        store
            .seed_parcel(Parcel {
                id: fixture.parcel_1,
                name: "lote 1".to_string(),
                tree_count: 100,
            })
            .await;
        store
            .seed_parcel(Parcel {
                id: fixture.parcel_2,
                name: "lote 2".to_string(),
                tree_count: 150,
            })
            .await;

        store
            .seed_task(FieldTask {
                id: fixture.task_id,
                name: "fumigacion bloque norte".to_string(),
                state: TaskState::InProgress,
                actual_end: None,
            })
            .await;

        store
            .seed_application(Application {
                id: fixture.application_id,
                name: "fumigacion marzo".to_string(),
                kind: ApplicationKind::Spray,
                state: ApplicationState::Open,
                planned_start: date(2026, 3, 1),
                planned_end: date(2026, 3, 5),
                actual_start: None,
                actual_end: None,
                task_id: Some(fixture.task_id),
                parcel_ids: vec![fixture.parcel_1, fixture.parcel_2],
                input_cost: None,
                labor_cost: None,
                total_cost: None,
                cost_per_tree: None,
                jornales_used: None,
                average_daily_labor_value: None,
            })
            .await;

        // Movements: two caneca days on lote 1, one bulto day on lote 2.
        let movement_1 = Uuid::new_v4();
        let movement_2 = Uuid::new_v4();
        let movement_3 = Uuid::new_v4();
        store
            .seed_movement(DailyMovement {
                id: movement_1,
                application_id: fixture.application_id,
                parcel_id: fixture.parcel_1,
                date: date(2026, 3, 1),
                caneca_count: 5.0,
                bulto_count: 0.0,
            })
            .await;
        store
            .seed_movement(DailyMovement {
                id: movement_2,
                application_id: fixture.application_id,
                parcel_id: fixture.parcel_1,
                date: date(2026, 3, 2),
                caneca_count: 3.0,
                bulto_count: 0.0,
            })
            .await;
        store
            .seed_movement(DailyMovement {
                id: movement_3,
                application_id: fixture.application_id,
                parcel_id: fixture.parcel_2,
                date: date(2026, 3, 2),
                caneca_count: 0.0,
                bulto_count: 2.0,
            })
            .await;

        // 1000 cc + 500 cc of the liquid on lote 1, 2 kg of the solid on
        // lote 2.
        store
            .seed_movement_product(MovementProduct {
                id: Uuid::new_v4(),
                movement_id: movement_1,
                product_id: fixture.product_1,
                quantity: 1000.0,
                unit: "cc".to_string(),
            })
            .await;
        store
            .seed_movement_product(MovementProduct {
                id: Uuid::new_v4(),
                movement_id: movement_2,
                product_id: fixture.product_1,
                quantity: 500.0,
                unit: "cc".to_string(),
            })
            .await;
        store
            .seed_movement_product(MovementProduct {
                id: Uuid::new_v4(),
                movement_id: movement_3,
                product_id: fixture.product_2,
                quantity: 2.0,
                unit: "kg".to_string(),
            })
            .await;

        let mixture = Uuid::new_v4();
        store
            .seed_planned_mixture(PlannedMixture {
                id: mixture,
                application_id: fixture.application_id,
                parcel_id: fixture.parcel_1,
            })
            .await;
        store
            .seed_planned_product(PlannedProduct {
                id: Uuid::new_v4(),
                mixture_id: mixture,
                product_id: fixture.product_1,
                name: "cobre".to_string(),
                unit: "l".to_string(),
                quantity: 2.0,
            })
            .await;

        store
            .seed_inventory_product(InventoryProduct {
                id: fixture.product_1,
                name: "cobre".to_string(),
                unit: "l".to_string(),
                on_hand: 20.0,
                unit_price: 10_000.0,
                kg_per_bulto: None,
            })
            .await;
        store
            .seed_inventory_product(InventoryProduct {
                id: fixture.product_2,
                name: "urea".to_string(),
                unit: "kg".to_string(),
                on_hand: 100.0,
                unit_price: 5_000.0,
                kg_per_bulto: Some(50.0),
            })
            .await;

        store
            .seed_employee(Employee {
                id: fixture.employee_id,
                name: "Marta".to_string(),
                monthly_salary: 1_300_000.0,
                monthly_benefits: 0.0,
                monthly_allowances: 0.0,
                weekly_hours: 48.0,
            })
            .await;
        store
            .seed_contractor(Contractor {
                id: fixture.contractor_id,
                name: "Raul".to_string(),
                daily_rate: 80_000.0,
            })
            .await;

        // Costs seeded as the engine would have computed them at capture:
        // employee hourly = round2(1_300_000 / (48 * 4.33)) = 6254.81,
        // daily = 50038.48; contractor half jornal = 40_000.
        store
            .seed_work_record(WorkRecord {
                id: fixture.work_record_1,
                task_id: fixture.task_id,
                parcel_id: fixture.parcel_1,
                date: date(2026, 3, 1),
                worker: WorkerRef::Employee(fixture.employee_id),
                fraction: 1.0,
                cost: 50_038.48,
            })
            .await;
        store
            .seed_work_record(WorkRecord {
                id: fixture.work_record_2,
                task_id: fixture.task_id,
                parcel_id: fixture.parcel_2,
                date: date(2026, 3, 2),
                worker: WorkerRef::Contractor(fixture.contractor_id),
                fraction: 0.5,
                cost: 40_000.0,
            })
            .await;

        (store, fixture)
    }
}

// ---------------------------------------------------------------------------
// FlakyStore
// ---------------------------------------------------------------------------

/// Store wrapper that injects a backend failure on exactly the Nth write.
///
/// Reads always pass through. Writes are counted in call order; the
/// configured one fails with a backend error, later writes succeed again.
/// This models a transient remote failure mid-commit, the case the closure
/// workflow's failed-state retry exists for.
pub struct FlakyStore {
    inner: Arc<dyn Store>,
    fail_on_write: usize,
    writes: AtomicUsize,
}

impl FlakyStore {
    /// Fail the `fail_on_write`-th write (1-based).
    pub fn new(inner: Arc<dyn Store>, fail_on_write: usize) -> Self {
        Self {
            inner,
            fail_on_write,
            writes: AtomicUsize::new(0),
        }
    }

    /// Total writes attempted so far, including the failed one.
    pub fn writes_attempted(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn tick(&self) -> StoreResult<()> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on_write {
            return Err(StoreError::Backend(format!(
                "injected failure on write #{n}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        self.inner.get_application(id).await
    }

    async fn apply_application_closure(
        &self,
        id: Uuid,
        closure: &ApplicationClosure,
    ) -> StoreResult<()> {
        self.tick()?;
        self.inner.apply_application_closure(id, closure).await
    }

    async fn movements_for_application(
        &self,
        application_id: Uuid,
    ) -> StoreResult<Vec<DailyMovement>> {
        self.inner.movements_for_application(application_id).await
    }

    async fn products_for_movements(
        &self,
        movement_ids: &[Uuid],
    ) -> StoreResult<Vec<MovementProduct>> {
        self.inner.products_for_movements(movement_ids).await
    }

    async fn planned_products_for_application(
        &self,
        application_id: Uuid,
    ) -> StoreResult<Vec<(Uuid, PlannedProduct)>> {
        self.inner
            .planned_products_for_application(application_id)
            .await
    }

    async fn work_records_for_task(&self, task_id: Uuid) -> StoreResult<Vec<WorkRecord>> {
        self.inner.work_records_for_task(task_id).await
    }

    async fn insert_work_record(&self, record: &WorkRecord) -> StoreResult<()> {
        self.tick()?;
        self.inner.insert_work_record(record).await
    }

    async fn update_work_record(&self, id: Uuid, fraction: f64, cost: f64) -> StoreResult<()> {
        self.tick()?;
        self.inner.update_work_record(id, fraction, cost).await
    }

    async fn delete_work_record(&self, id: Uuid) -> StoreResult<()> {
        self.tick()?;
        self.inner.delete_work_record(id).await
    }

    async fn employees_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Employee>> {
        self.inner.employees_by_ids(ids).await
    }

    async fn contractors_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Contractor>> {
        self.inner.contractors_by_ids(ids).await
    }

    async fn parcels_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Parcel>> {
        self.inner.parcels_by_ids(ids).await
    }

    async fn inventory_product(&self, id: Uuid) -> StoreResult<Option<InventoryProduct>> {
        self.inner.inventory_product(id).await
    }

    async fn inventory_products_by_ids(
        &self,
        ids: &[Uuid],
    ) -> StoreResult<Vec<InventoryProduct>> {
        self.inner.inventory_products_by_ids(ids).await
    }

    async fn update_inventory_balance(&self, id: Uuid, new_balance: f64) -> StoreResult<()> {
        self.tick()?;
        self.inner.update_inventory_balance(id, new_balance).await
    }

    async fn insert_inventory_movement(&self, movement: &InventoryMovement) -> StoreResult<()> {
        self.tick()?;
        self.inner.insert_inventory_movement(movement).await
    }

    async fn insert_closure_record(&self, record: &ClosureRecord) -> StoreResult<()> {
        self.tick()?;
        self.inner.insert_closure_record(record).await
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<FieldTask>> {
        self.inner.get_task(id).await
    }

    async fn complete_task(&self, id: Uuid, actual_end: NaiveDate) -> StoreResult<()> {
        self.tick()?;
        self.inner.complete_task(id, actual_end).await
    }
}
