//! JSON snapshot of the full dataset.
//!
//! The CLI loads one of these into a [`crate::memory::MemoryStore`], runs the
//! closure workflow against it, and writes the mutated snapshot back. Every
//! collection defaults to empty so partial files deserialize cleanly.

use serde::{Deserialize, Serialize};

use crate::models::{
    Application, ClosureRecord, Contractor, DailyMovement, Employee, FieldTask,
    InventoryMovement, InventoryProduct, MovementProduct, Parcel, PlannedMixture, PlannedProduct,
    WorkRecord,
};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub parcels: Vec<Parcel>,
    #[serde(default)]
    pub movements: Vec<DailyMovement>,
    #[serde(default)]
    pub movement_products: Vec<MovementProduct>,
    #[serde(default)]
    pub planned_mixtures: Vec<PlannedMixture>,
    #[serde(default)]
    pub planned_products: Vec<PlannedProduct>,
    #[serde(default)]
    pub work_records: Vec<WorkRecord>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub contractors: Vec<Contractor>,
    #[serde(default)]
    pub inventory_products: Vec<InventoryProduct>,
    #[serde(default)]
    pub inventory_movements: Vec<InventoryMovement>,
    #[serde(default)]
    pub closure_records: Vec<ClosureRecord>,
    #[serde(default)]
    pub tasks: Vec<FieldTask>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_snapshot_deserializes_with_defaults() {
        let snapshot: Snapshot = serde_json::from_str(r#"{"applications": []}"#).unwrap();
        assert!(snapshot.parcels.is_empty());
        assert!(snapshot.work_records.is_empty());
    }
}
