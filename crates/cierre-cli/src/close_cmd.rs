//! `cierre close` command: drive an application through the closure
//! workflow and persist the snapshot on success.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use uuid::Uuid;

use cierre_core::workflow::ClosureWorkflow;
use cierre_core::workflow::figures::ClosureFigures;
use cierre_store::memory::MemoryStore;
use cierre_store::store::Store;

use crate::data;

/// Run the close command.
///
/// Without `--yes` this is a dry run: the workflow advances through
/// confirmation, prints the figures that would be written, and stops
/// before any write happens. With `--yes` the commit runs and the
/// updated snapshot is written back to `data_path`.
#[allow(clippy::too_many_arguments)]
pub async fn run_close(
    store: Arc<MemoryStore>,
    application_id: Uuid,
    actual_start: NaiveDate,
    actual_end: NaiveDate,
    observations: Option<String>,
    closed_by: &str,
    yes: bool,
    data_path: &Path,
) -> Result<()> {
    let mut workflow = ClosureWorkflow::begin(store.clone() as Arc<dyn Store>, application_id)
        .await
        .context("failed to open closure")?;

    workflow
        .confirm_data(actual_start, actual_end, observations.unwrap_or_default())
        .context("failed to confirm dates")?;
    let figures = workflow.confirm().context("failed to compute figures")?;

    print_figures(&figures);

    if !yes {
        println!();
        println!("Dry run: nothing was written. Re-run with --yes to commit.");
        return Ok(());
    }

    let receipt = workflow
        .commit(closed_by)
        .await
        .context("commit failed; the application remains open, re-run to retry")?;

    tracing::info!(
        application = %application_id,
        closure_record = %receipt.closure_record_id,
        "application closed"
    );

    println!();
    println!("Closed. Closure record {}", receipt.closure_record_id);
    if !receipt.deductions.is_empty() {
        println!("Inventory deductions:");
        for deduction in &receipt.deductions {
            println!(
                "  {:<20} -{:>10.2}  {:>10.2} -> {:>10.2}  value {:.2}",
                deduction.name,
                deduction.quantity,
                deduction.balance_before,
                deduction.balance_after,
                deduction.value,
            );
        }
    }

    let snapshot = store.to_snapshot().await;
    data::save_snapshot(data_path, &snapshot)?;
    println!("Snapshot written to {}", data_path.display());

    Ok(())
}

fn print_figures(figures: &ClosureFigures) {
    println!("Closure figures:");
    println!("  Elapsed days:       {}", figures.elapsed_days);
    println!("  Jornales:           {:.2}", figures.total_labor_fraction);
    println!("  Labor cost:         {:.2}", figures.total_labor_cost);
    println!(
        "  Avg daily labor:    {:.2}",
        figures.average_daily_labor_value
    );
    println!("  Input cost:         {:.2}", figures.total_input_cost);
    println!("  Total cost:         {:.2}", figures.total_cost);
    println!("  Trees:              {}", figures.total_tree_count);
    println!("  Cost per tree:      {:.2}", figures.cost_per_tree);
}
