//! Real-usage aggregator: reduces an application's daily execution records
//! into per-parcel load counts, per-product normalized quantities, and
//! input costs.
//!
//! Costs are always recomputed from the running quantity total
//! (`cost = quantity_base * unit_price`), never summed incrementally, so
//! repeated small additions cannot accumulate floating-point drift.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use cierre_store::models::Application;
use cierre_store::store::Store;

use crate::error::CoreResult;
use crate::units::{BaseUnit, normalize};

/// Caneca and bulto totals recorded for one parcel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParcelLoads {
    pub canecas: f64,
    pub bultos: f64,
}

/// Normalized usage of one product on one parcel.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUsage {
    pub product_id: Uuid,
    pub name: String,
    pub quantity_base: f64,
    pub base_unit: BaseUnit,
    pub unit_price: f64,
    pub cost: f64,
}

/// Quantity and cost totals for one parcel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParcelTotals {
    pub quantity_base: f64,
    pub cost: f64,
}

/// Aggregated actual usage of an application.
#[derive(Debug, Clone)]
pub struct UsageSummary {
    /// Physical load counts per parcel.
    pub loads: BTreeMap<Uuid, ParcelLoads>,
    /// Per-product usage per parcel.
    pub products: BTreeMap<Uuid, Vec<ProductUsage>>,
    /// Reduced quantity/cost totals per parcel.
    pub parcel_totals: BTreeMap<Uuid, ParcelTotals>,
    pub total_input_cost: f64,
    /// Products consumed without price data. Their cost contribution is
    /// zero (legacy behavior); callers decide how loudly to complain.
    pub missing_prices: Vec<Uuid>,
}

/// Aggregate all recorded usage for an application.
///
/// Planned quantities are deliberately not consulted: planned-vs-actual is
/// a presentation concern layered on top of this summary.
pub async fn aggregate_usage(
    store: &dyn Store,
    application: &Application,
) -> CoreResult<UsageSummary> {
    let movements = store.movements_for_application(application.id).await?;

    let mut loads: BTreeMap<Uuid, ParcelLoads> = BTreeMap::new();
    for movement in &movements {
        let entry = loads.entry(movement.parcel_id).or_default();
        entry.canecas += movement.caneca_count;
        entry.bultos += movement.bulto_count;
    }

    let movement_ids: Vec<Uuid> = movements.iter().map(|m| m.id).collect();
    let movement_parcels: HashMap<Uuid, Uuid> =
        movements.iter().map(|m| (m.id, m.parcel_id)).collect();
    let products = store.products_for_movements(&movement_ids).await?;

    // One batched price lookup for every distinct product consumed.
    let mut product_ids: Vec<Uuid> = Vec::new();
    for product in &products {
        if !product_ids.contains(&product.product_id) {
            product_ids.push(product.product_id);
        }
    }
    let catalog: HashMap<Uuid, (String, f64)> = store
        .inventory_products_by_ids(&product_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, (p.name, p.unit_price)))
        .collect();

    let mut missing_prices: Vec<Uuid> = Vec::new();
    for id in &product_ids {
        if !catalog.contains_key(id) {
            tracing::warn!(product_id = %id, "no price data for consumed product; costing at zero");
            missing_prices.push(*id);
        }
    }

    // Accumulate per-(parcel, product) buckets. The cost is recomputed from
    // the running quantity on every update.
    let mut buckets: BTreeMap<(Uuid, Uuid), ProductUsage> = BTreeMap::new();
    for product in &products {
        let Some(parcel_id) = movement_parcels.get(&product.movement_id).copied() else {
            continue;
        };
        let (quantity_base, base_unit) = normalize(product.quantity, &product.unit);
        let (name, unit_price) = match catalog.get(&product.product_id) {
            Some((name, price)) => (name.clone(), *price),
            None => (String::new(), 0.0),
        };

        let bucket = buckets
            .entry((parcel_id, product.product_id))
            .or_insert_with(|| ProductUsage {
                product_id: product.product_id,
                name,
                quantity_base: 0.0,
                base_unit,
                unit_price,
                cost: 0.0,
            });
        bucket.quantity_base += quantity_base;
        bucket.cost = bucket.quantity_base * bucket.unit_price;
    }

    // Reduce buckets into per-parcel product lists and totals.
    let mut per_parcel_products: BTreeMap<Uuid, Vec<ProductUsage>> = BTreeMap::new();
    let mut parcel_totals: BTreeMap<Uuid, ParcelTotals> = BTreeMap::new();
    let mut total_input_cost = 0.0;
    for ((parcel_id, _), usage) in buckets {
        let totals = parcel_totals.entry(parcel_id).or_default();
        totals.quantity_base += usage.quantity_base;
        totals.cost += usage.cost;
        total_input_cost += usage.cost;
        per_parcel_products.entry(parcel_id).or_default().push(usage);
    }

    tracing::debug!(
        application_id = %application.id,
        parcels = loads.len(),
        products = product_ids.len(),
        total_input_cost,
        "aggregated real usage"
    );

    Ok(UsageSummary {
        loads,
        products: per_parcel_products,
        parcel_totals,
        total_input_cost,
        missing_prices,
    })
}

/// Total normalized consumption per product across the whole application.
///
/// Used by the inventory consolidation step of the commit; quantities are
/// re-derived from the movement records rather than taken from a cached
/// summary, so the deduction always reflects what is stored.
pub async fn consumed_by_product(
    store: &dyn Store,
    application_id: Uuid,
) -> CoreResult<BTreeMap<Uuid, f64>> {
    let movements = store.movements_for_application(application_id).await?;
    let movement_ids: Vec<Uuid> = movements.iter().map(|m| m.id).collect();
    let products = store.products_for_movements(&movement_ids).await?;

    let mut consumed: BTreeMap<Uuid, f64> = BTreeMap::new();
    for product in &products {
        let (quantity_base, _) = normalize(product.quantity, &product.unit);
        *consumed.entry(product.product_id).or_default() += quantity_base;
    }
    Ok(consumed)
}
