//! `cierre summary` command: show actual usage, planned comparison, and
//! labor subtotals for an open application.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use cierre_core::labor::aggregate::load_labor_ledger;
use cierre_core::usage::aggregate_usage;
use cierre_store::memory::MemoryStore;
use cierre_store::models::Application;
use cierre_store::store::Store;

/// Run the summary command for one application.
pub async fn run_summary(store: &Arc<MemoryStore>, application: &Application) -> Result<()> {
    let usage = aggregate_usage(store.as_ref(), application).await?;
    let ledger = load_labor_ledger(
        store.as_ref(),
        application.task_id,
        &application.parcel_ids,
    )
    .await?;

    let parcels = store.parcels_by_ids(&application.parcel_ids).await?;
    let parcel_names: BTreeMap<Uuid, String> =
        parcels.iter().map(|p| (p.id, p.name.clone())).collect();

    println!("Application: {} ({})", application.name, application.id);
    println!("Kind: {}", application.kind);
    println!("State: {}", application.state);
    println!(
        "Planned: {} to {}",
        application.planned_start, application.planned_end
    );
    println!();

    // Actual usage per parcel.
    for (parcel_id, loads) in &usage.loads {
        let name = parcel_names
            .get(parcel_id)
            .map(String::as_str)
            .unwrap_or("unknown parcel");
        println!("Parcel: {name}");
        println!("  Loads: {} canecas, {} bultos", loads.canecas, loads.bultos);
        if let Some(products) = usage.products.get(parcel_id) {
            for product in products {
                println!(
                    "  {:<20} {:>10.2} {:<4} {:>14.2}",
                    product.name, product.quantity_base, product.base_unit, product.cost
                );
            }
        }
        if let Some(totals) = usage.parcel_totals.get(parcel_id) {
            println!("  Parcel input cost: {:.2}", totals.cost);
        }
        println!();
    }

    // Planned vs actual, grouped by product across parcels.
    let planned = store
        .planned_products_for_application(application.id)
        .await?;
    if !planned.is_empty() {
        let mut actual_by_product: BTreeMap<Uuid, f64> = BTreeMap::new();
        for products in usage.products.values() {
            for product in products {
                *actual_by_product.entry(product.product_id).or_default() +=
                    product.quantity_base;
            }
        }

        println!("Planned vs actual:");
        for (_, plan) in &planned {
            let actual = actual_by_product.get(&plan.product_id).copied().unwrap_or(0.0);
            println!(
                "  {:<20} planned {:>10.2} {:<8} actual {:>10.2}",
                plan.name, plan.quantity, plan.unit, actual
            );
        }
        println!();
    }

    // Labor subtotals.
    let totals = ledger.totals();
    if ledger.is_empty() {
        println!("Labor: no linked field task");
    } else {
        println!("Labor:");
        for (parcel_id, labor) in ledger.per_parcel() {
            let name = parcel_names
                .get(&parcel_id)
                .map(String::as_str)
                .unwrap_or("unknown parcel");
            println!(
                "  {:<20} {:>6.2} jornales {:>14.2}",
                name, labor.fraction, labor.cost
            );
        }
        println!(
            "  {} workers over {} dates, {:.2} jornales, cost {:.2}",
            totals.workers, totals.dates, totals.fraction, totals.cost
        );
    }
    println!();

    println!("Total input cost: {:.2}", usage.total_input_cost);
    println!("Total labor cost: {:.2}", totals.cost);
    println!(
        "Running total:    {:.2}",
        usage.total_input_cost + totals.cost
    );

    if !usage.missing_prices.is_empty() {
        println!();
        println!(
            "Warning: {} product(s) have no inventory price and contribute zero cost:",
            usage.missing_prices.len()
        );
        for product_id in &usage.missing_prices {
            println!("  {product_id}");
        }
    }

    Ok(())
}
