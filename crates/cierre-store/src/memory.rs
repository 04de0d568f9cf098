//! In-memory `Store` backend.
//!
//! Backs the CLI's JSON snapshot format and every test suite. Tables are
//! plain maps behind one `RwLock`; reads take a shared guard, writes an
//! exclusive one, so a single closure sequence observes its own writes in
//! order just like the hosted store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Application, ApplicationClosure, ApplicationState, ClosureRecord, Contractor, DailyMovement,
    Employee, FieldTask, InventoryMovement, InventoryProduct, MovementProduct, Parcel,
    PlannedMixture, PlannedProduct, TaskState, WorkRecord,
};
use crate::snapshot::Snapshot;
use crate::store::{Store, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    applications: HashMap<Uuid, Application>,
    parcels: HashMap<Uuid, Parcel>,
    movements: HashMap<Uuid, DailyMovement>,
    movement_products: HashMap<Uuid, MovementProduct>,
    planned_mixtures: HashMap<Uuid, PlannedMixture>,
    planned_products: HashMap<Uuid, PlannedProduct>,
    work_records: HashMap<Uuid, WorkRecord>,
    employees: HashMap<Uuid, Employee>,
    contractors: HashMap<Uuid, Contractor>,
    inventory_products: HashMap<Uuid, InventoryProduct>,
    inventory_movements: Vec<InventoryMovement>,
    closure_records: Vec<ClosureRecord>,
    tasks: HashMap<Uuid, FieldTask>,
}

/// In-memory data store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a deserialized snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut tables = Tables::default();
        for a in snapshot.applications {
            tables.applications.insert(a.id, a);
        }
        for p in snapshot.parcels {
            tables.parcels.insert(p.id, p);
        }
        for m in snapshot.movements {
            tables.movements.insert(m.id, m);
        }
        for p in snapshot.movement_products {
            tables.movement_products.insert(p.id, p);
        }
        for m in snapshot.planned_mixtures {
            tables.planned_mixtures.insert(m.id, m);
        }
        for p in snapshot.planned_products {
            tables.planned_products.insert(p.id, p);
        }
        for r in snapshot.work_records {
            tables.work_records.insert(r.id, r);
        }
        for e in snapshot.employees {
            tables.employees.insert(e.id, e);
        }
        for c in snapshot.contractors {
            tables.contractors.insert(c.id, c);
        }
        for p in snapshot.inventory_products {
            tables.inventory_products.insert(p.id, p);
        }
        tables.inventory_movements = snapshot.inventory_movements;
        tables.closure_records = snapshot.closure_records;
        for t in snapshot.tasks {
            tables.tasks.insert(t.id, t);
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Export the current contents as a snapshot, with stable ordering so
    /// writing a snapshot back to disk produces a deterministic file.
    pub async fn to_snapshot(&self) -> Snapshot {
        let t = self.tables.read().await;

        fn sorted<T: Clone>(map: &HashMap<Uuid, T>) -> Vec<T> {
            let mut ids: Vec<&Uuid> = map.keys().collect();
            ids.sort();
            ids.into_iter().map(|id| map[id].clone()).collect()
        }

        Snapshot {
            applications: sorted(&t.applications),
            parcels: sorted(&t.parcels),
            movements: sorted(&t.movements),
            movement_products: sorted(&t.movement_products),
            planned_mixtures: sorted(&t.planned_mixtures),
            planned_products: sorted(&t.planned_products),
            work_records: sorted(&t.work_records),
            employees: sorted(&t.employees),
            contractors: sorted(&t.contractors),
            inventory_products: sorted(&t.inventory_products),
            inventory_movements: t.inventory_movements.clone(),
            closure_records: t.closure_records.clone(),
            tasks: sorted(&t.tasks),
        }
    }

    // -- seeding helpers (tests and fixtures) -----------------------------

    pub async fn seed_application(&self, application: Application) {
        self.tables
            .write()
            .await
            .applications
            .insert(application.id, application);
    }

    pub async fn seed_parcel(&self, parcel: Parcel) {
        self.tables.write().await.parcels.insert(parcel.id, parcel);
    }

    pub async fn seed_movement(&self, movement: DailyMovement) {
        self.tables
            .write()
            .await
            .movements
            .insert(movement.id, movement);
    }

    pub async fn seed_movement_product(&self, product: MovementProduct) {
        self.tables
            .write()
            .await
            .movement_products
            .insert(product.id, product);
    }

    pub async fn seed_planned_mixture(&self, mixture: PlannedMixture) {
        self.tables
            .write()
            .await
            .planned_mixtures
            .insert(mixture.id, mixture);
    }

    pub async fn seed_planned_product(&self, product: PlannedProduct) {
        self.tables
            .write()
            .await
            .planned_products
            .insert(product.id, product);
    }

    pub async fn seed_work_record(&self, record: WorkRecord) {
        self.tables
            .write()
            .await
            .work_records
            .insert(record.id, record);
    }

    pub async fn seed_employee(&self, employee: Employee) {
        self.tables
            .write()
            .await
            .employees
            .insert(employee.id, employee);
    }

    pub async fn seed_contractor(&self, contractor: Contractor) {
        self.tables
            .write()
            .await
            .contractors
            .insert(contractor.id, contractor);
    }

    pub async fn seed_inventory_product(&self, product: InventoryProduct) {
        self.tables
            .write()
            .await
            .inventory_products
            .insert(product.id, product);
    }

    pub async fn seed_task(&self, task: FieldTask) {
        self.tables.write().await.tasks.insert(task.id, task);
    }

    // -- inspection helpers (tests) ---------------------------------------

    pub async fn closure_records(&self) -> Vec<ClosureRecord> {
        self.tables.read().await.closure_records.clone()
    }

    pub async fn inventory_movements(&self) -> Vec<InventoryMovement> {
        self.tables.read().await.inventory_movements.clone()
    }

    pub async fn work_record(&self, id: Uuid) -> Option<WorkRecord> {
        self.tables.read().await.work_records.get(&id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_application(&self, id: Uuid) -> StoreResult<Option<Application>> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn apply_application_closure(
        &self,
        id: Uuid,
        closure: &ApplicationClosure,
    ) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let app = t.applications.get_mut(&id).ok_or(StoreError::NotFound {
            collection: "applications",
            id,
        })?;
        app.state = ApplicationState::Closed;
        app.actual_start = Some(closure.actual_start);
        app.actual_end = Some(closure.actual_end);
        app.input_cost = Some(closure.input_cost);
        app.labor_cost = Some(closure.labor_cost);
        app.total_cost = Some(closure.total_cost);
        app.cost_per_tree = Some(closure.cost_per_tree);
        app.jornales_used = Some(closure.jornales_used);
        app.average_daily_labor_value = Some(closure.average_daily_labor_value);
        Ok(())
    }

    async fn movements_for_application(
        &self,
        application_id: Uuid,
    ) -> StoreResult<Vec<DailyMovement>> {
        let t = self.tables.read().await;
        let mut movements: Vec<DailyMovement> = t
            .movements
            .values()
            .filter(|m| m.application_id == application_id)
            .cloned()
            .collect();
        movements.sort_by_key(|m| (m.date, m.id));
        Ok(movements)
    }

    async fn products_for_movements(
        &self,
        movement_ids: &[Uuid],
    ) -> StoreResult<Vec<MovementProduct>> {
        let t = self.tables.read().await;
        let mut products: Vec<MovementProduct> = t
            .movement_products
            .values()
            .filter(|p| movement_ids.contains(&p.movement_id))
            .cloned()
            .collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn planned_products_for_application(
        &self,
        application_id: Uuid,
    ) -> StoreResult<Vec<(Uuid, PlannedProduct)>> {
        let t = self.tables.read().await;
        let mut planned: Vec<(Uuid, PlannedProduct)> = t
            .planned_products
            .values()
            .filter_map(|p| {
                let mixture = t.planned_mixtures.get(&p.mixture_id)?;
                (mixture.application_id == application_id)
                    .then(|| (mixture.parcel_id, p.clone()))
            })
            .collect();
        planned.sort_by_key(|(parcel_id, p)| (*parcel_id, p.id));
        Ok(planned)
    }

    async fn work_records_for_task(&self, task_id: Uuid) -> StoreResult<Vec<WorkRecord>> {
        let t = self.tables.read().await;
        let mut records: Vec<WorkRecord> = t
            .work_records
            .values()
            .filter(|r| r.task_id == task_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.date, r.id));
        Ok(records)
    }

    async fn insert_work_record(&self, record: &WorkRecord) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .work_records
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn update_work_record(&self, id: Uuid, fraction: f64, cost: f64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let record = t.work_records.get_mut(&id).ok_or(StoreError::NotFound {
            collection: "work_records",
            id,
        })?;
        record.fraction = fraction;
        record.cost = cost;
        Ok(())
    }

    async fn delete_work_record(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.work_records.remove(&id).ok_or(StoreError::NotFound {
            collection: "work_records",
            id,
        })?;
        Ok(())
    }

    async fn employees_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Employee>> {
        let t = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| t.employees.get(id).cloned())
            .collect())
    }

    async fn contractors_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Contractor>> {
        let t = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| t.contractors.get(id).cloned())
            .collect())
    }

    async fn parcels_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Parcel>> {
        let t = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| t.parcels.get(id).cloned())
            .collect())
    }

    async fn inventory_product(&self, id: Uuid) -> StoreResult<Option<InventoryProduct>> {
        Ok(self.tables.read().await.inventory_products.get(&id).cloned())
    }

    async fn inventory_products_by_ids(
        &self,
        ids: &[Uuid],
    ) -> StoreResult<Vec<InventoryProduct>> {
        let t = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| t.inventory_products.get(id).cloned())
            .collect())
    }

    async fn update_inventory_balance(&self, id: Uuid, new_balance: f64) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let product = t
            .inventory_products
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                collection: "inventory_products",
                id,
            })?;
        product.on_hand = new_balance;
        Ok(())
    }

    async fn insert_inventory_movement(&self, movement: &InventoryMovement) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .inventory_movements
            .push(movement.clone());
        Ok(())
    }

    async fn insert_closure_record(&self, record: &ClosureRecord) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .closure_records
            .push(record.clone());
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<FieldTask>> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn complete_task(&self, id: Uuid, actual_end: NaiveDate) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let task = t.tasks.get_mut(&id).ok_or(StoreError::NotFound {
            collection: "tasks",
            id,
        })?;
        task.state = TaskState::Completed;
        task.actual_end = Some(actual_end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationKind;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_application(id: Uuid) -> Application {
        Application {
            id,
            name: "bloque norte".to_string(),
            kind: ApplicationKind::Spray,
            state: ApplicationState::Open,
            planned_start: date(2026, 3, 1),
            planned_end: date(2026, 3, 5),
            actual_start: None,
            actual_end: None,
            task_id: None,
            parcel_ids: vec![],
            input_cost: None,
            labor_cost: None,
            total_cost: None,
            cost_per_tree: None,
            jornales_used: None,
            average_daily_labor_value: None,
        }
    }

    #[tokio::test]
    async fn closure_patch_flips_state_and_writes_financials() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.seed_application(open_application(id)).await;

        let closure = ApplicationClosure {
            actual_start: date(2026, 3, 1),
            actual_end: date(2026, 3, 4),
            input_cost: 15_000.0,
            labor_cost: 40_000.0,
            total_cost: 55_000.0,
            cost_per_tree: 55.0,
            jornales_used: 2.5,
            average_daily_labor_value: 16_000.0,
        };
        store.apply_application_closure(id, &closure).await.unwrap();

        let app = store.get_application(id).await.unwrap().unwrap();
        assert_eq!(app.state, ApplicationState::Closed);
        assert_eq!(app.total_cost, Some(55_000.0));
        assert_eq!(app.actual_end, Some(date(2026, 3, 4)));
    }

    #[tokio::test]
    async fn closure_patch_on_missing_application_is_not_found() {
        let store = MemoryStore::new();
        let closure = ApplicationClosure {
            actual_start: date(2026, 3, 1),
            actual_end: date(2026, 3, 1),
            input_cost: 0.0,
            labor_cost: 0.0,
            total_cost: 0.0,
            cost_per_tree: 0.0,
            jornales_used: 0.0,
            average_daily_labor_value: 0.0,
        };
        let err = store
            .apply_application_closure(Uuid::new_v4(), &closure)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { collection: "applications", .. }));
    }

    #[tokio::test]
    async fn movements_are_filtered_and_date_ordered() {
        let store = MemoryStore::new();
        let app_id = Uuid::new_v4();
        let parcel = Uuid::new_v4();
        for (day, canecas) in [(3, 2.0), (1, 5.0), (2, 3.0)] {
            store
                .seed_movement(DailyMovement {
                    id: Uuid::new_v4(),
                    application_id: app_id,
                    parcel_id: parcel,
                    date: date(2026, 3, day),
                    caneca_count: canecas,
                    bulto_count: 0.0,
                })
                .await;
        }
        // Another application's movement must not appear.
        store
            .seed_movement(DailyMovement {
                id: Uuid::new_v4(),
                application_id: Uuid::new_v4(),
                parcel_id: parcel,
                date: date(2026, 3, 1),
                caneca_count: 99.0,
                bulto_count: 0.0,
            })
            .await;

        let movements = store.movements_for_application(app_id).await.unwrap();
        let counts: Vec<f64> = movements.iter().map(|m| m.caneca_count).collect();
        assert_eq!(counts, vec![5.0, 3.0, 2.0]);
    }

    #[tokio::test]
    async fn snapshot_round_trip_preserves_tables() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        store.seed_application(open_application(id)).await;
        store
            .seed_inventory_product(InventoryProduct {
                id: Uuid::new_v4(),
                name: "cobre".to_string(),
                unit: "l".to_string(),
                on_hand: 20.0,
                unit_price: 10_000.0,
                kg_per_bulto: None,
            })
            .await;

        let snapshot = store.to_snapshot().await;
        let restored = MemoryStore::from_snapshot(snapshot);
        assert!(restored.get_application(id).await.unwrap().is_some());
    }
}
