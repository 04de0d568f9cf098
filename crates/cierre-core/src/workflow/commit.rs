//! The commit protocol: the strictly ordered remote-write sequence that
//! makes a closure durable.
//!
//! The hosted store offers no multi-entity transaction, so the five steps
//! run one after another and a failure aborts the remainder while leaving
//! earlier steps committed. The workflow surfaces that by entering its
//! failed state; a retry re-runs the sequence from the confirmed figures.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use cierre_store::models::{
    Application, ApplicationClosure, ClosureRecord, InventoryMovement, InventoryMovementKind,
};
use cierre_store::store::Store;

use crate::error::{CoreError, CoreResult};
use crate::labor::ledger::LedgerOp;
use crate::labor::round2;
use crate::usage::consumed_by_product;
use crate::workflow::figures::ClosureFigures;

/// One product's inventory deduction, reported back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDeduction {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    pub value: f64,
}

/// Step 1: persist one ledger edit (delete, insert, or fraction update).
pub(super) async fn apply_ledger_op(store: &dyn Store, op: &LedgerOp) -> CoreResult<()> {
    match op {
        LedgerOp::Delete(id) => {
            tracing::debug!(record_id = %id, "deleting work record");
            store.delete_work_record(*id).await?;
        }
        LedgerOp::Insert(record) => {
            tracing::debug!(record_id = %record.id, "inserting work record");
            store.insert_work_record(record).await?;
        }
        LedgerOp::Update { id, fraction, cost } => {
            tracing::debug!(record_id = %id, fraction, "updating work record");
            store.update_work_record(*id, *fraction, *cost).await?;
        }
    }
    Ok(())
}

/// Step 2: insert the closure record. Insert-once, never updated.
pub(super) async fn write_closure_record(
    store: &dyn Store,
    application_id: Uuid,
    figures: &ClosureFigures,
    observations: &str,
    closed_by: &str,
) -> CoreResult<ClosureRecord> {
    let record = ClosureRecord {
        id: Uuid::new_v4(),
        application_id,
        closed_on: Utc::now().date_naive(),
        elapsed_days: figures.elapsed_days,
        average_daily_labor_value: round2(figures.average_daily_labor_value),
        observations: observations.to_string(),
        closed_by: closed_by.to_string(),
    };
    store.insert_closure_record(&record).await?;
    Ok(record)
}

/// Step 3: flip the application to closed with its final figures.
pub(super) async fn close_application(
    store: &dyn Store,
    application: &Application,
    figures: &ClosureFigures,
    actual_start: NaiveDate,
    actual_end: NaiveDate,
) -> CoreResult<()> {
    let closure = ApplicationClosure {
        actual_start,
        actual_end,
        input_cost: figures.total_input_cost,
        labor_cost: figures.total_labor_cost,
        total_cost: figures.total_cost,
        cost_per_tree: figures.cost_per_tree,
        jornales_used: figures.total_labor_fraction,
        average_daily_labor_value: round2(figures.average_daily_labor_value),
    };
    store.apply_application_closure(application.id, &closure).await?;
    Ok(())
}

/// Step 5: consolidate inventory.
///
/// Re-derives the normalized consumption per product from the stored
/// movements, then per product: read the current balance, deduct (no floor
/// at zero -- a negative balance records an over-consumption to reconcile
/// upstream), write the new balance, and append one audit entry. The first
/// failure aborts the remaining products; completed deductions stand.
pub(super) async fn consolidate_inventory(
    store: &dyn Store,
    application_id: Uuid,
) -> CoreResult<Vec<ProductDeduction>> {
    let consumed = consumed_by_product(store, application_id).await?;
    let mut deductions = Vec::with_capacity(consumed.len());

    for (product_id, quantity) in consumed {
        let product = store
            .inventory_product(product_id)
            .await?
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "inventory product {product_id} not found during consolidation"
                ))
            })?;

        let balance_before = product.on_hand;
        let balance_after = balance_before - quantity;
        if balance_after < 0.0 {
            tracing::warn!(
                product_id = %product_id,
                product = %product.name,
                balance_after,
                "inventory balance went negative"
            );
        }

        store
            .update_inventory_balance(product_id, balance_after)
            .await?;

        let value = round2(quantity * product.unit_price);
        store
            .insert_inventory_movement(&InventoryMovement {
                id: Uuid::new_v4(),
                product_id,
                kind: InventoryMovementKind::Consumption,
                quantity,
                balance_before,
                balance_after,
                value,
                application_id: Some(application_id),
                recorded_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            product_id = %product_id,
            product = %product.name,
            quantity,
            balance_before,
            balance_after,
            "deducted inventory"
        );

        deductions.push(ProductDeduction {
            product_id,
            name: product.name,
            quantity,
            balance_before,
            balance_after,
            value,
        });
    }

    Ok(deductions)
}
