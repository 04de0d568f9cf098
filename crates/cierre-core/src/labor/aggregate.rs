//! Labor aggregator: loads the work records of an application's linked task
//! into an editable [`LaborLedger`], enriching each record with worker and
//! parcel display data via batched catalog lookups.

use std::collections::HashMap;

use uuid::Uuid;

use cierre_store::models::{Parcel, Worker, WorkerRef};
use cierre_store::store::Store;

use crate::error::CoreResult;
use crate::labor::ledger::LaborLedger;

/// Load the labor ledger for a task.
///
/// `task_id == None` (application without a linked task) is not an error:
/// the ledger comes back empty, with the application's parcels available so
/// the caller can still present labor as absent-but-addable.
pub async fn load_labor_ledger(
    store: &dyn Store,
    task_id: Option<Uuid>,
    parcel_ids: &[Uuid],
) -> CoreResult<LaborLedger> {
    let records = match task_id {
        Some(id) => store.work_records_for_task(id).await?,
        None => Vec::new(),
    };

    // Batched lookups: one call per catalog, never one per record.
    let mut employee_ids = Vec::new();
    let mut contractor_ids = Vec::new();
    for record in &records {
        match record.worker {
            WorkerRef::Employee(id) if !employee_ids.contains(&id) => employee_ids.push(id),
            WorkerRef::Contractor(id) if !contractor_ids.contains(&id) => {
                contractor_ids.push(id);
            }
            _ => {}
        }
    }

    let mut workers: HashMap<Uuid, Worker> = HashMap::new();
    for employee in store.employees_by_ids(&employee_ids).await? {
        workers.insert(employee.id, Worker::Employee(employee));
    }
    for contractor in store.contractors_by_ids(&contractor_ids).await? {
        workers.insert(contractor.id, Worker::Contractor(contractor));
    }

    let mut parcel_lookup_ids: Vec<Uuid> = parcel_ids.to_vec();
    for record in &records {
        if !parcel_lookup_ids.contains(&record.parcel_id) {
            parcel_lookup_ids.push(record.parcel_id);
        }
    }
    let parcels: HashMap<Uuid, Parcel> = store
        .parcels_by_ids(&parcel_lookup_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    tracing::debug!(
        task_id = ?task_id,
        records = records.len(),
        workers = workers.len(),
        "loaded labor ledger"
    );

    Ok(LaborLedger::new(task_id, records, workers, parcels))
}
