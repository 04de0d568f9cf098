//! Integration tests for the real-usage aggregator over a seeded store.

use uuid::Uuid;

use cierre_store::models::{DailyMovement, MovementProduct};
use cierre_store::store::Store;
use cierre_test_utils::{FarmFixture, date};

use cierre_core::units::BaseUnit;
use cierre_core::usage::{aggregate_usage, consumed_by_product};

#[tokio::test]
async fn loads_are_grouped_per_parcel() {
    let (store, fx) = FarmFixture::seed().await;
    let app = store
        .get_application(fx.application_id)
        .await
        .unwrap()
        .unwrap();

    let summary = aggregate_usage(store.as_ref(), &app).await.unwrap();

    let lote_1 = &summary.loads[&fx.parcel_1];
    assert_eq!(lote_1.canecas, 8.0);
    assert_eq!(lote_1.bultos, 0.0);

    let lote_2 = &summary.loads[&fx.parcel_2];
    assert_eq!(lote_2.canecas, 0.0);
    assert_eq!(lote_2.bultos, 2.0);
}

#[tokio::test]
async fn cc_quantities_accumulate_and_cost_from_running_total() {
    let (store, fx) = FarmFixture::seed().await;
    let app = store
        .get_application(fx.application_id)
        .await
        .unwrap()
        .unwrap();

    let summary = aggregate_usage(store.as_ref(), &app).await.unwrap();

    // 1000 cc + 500 cc = 1.5 L at 10_000 per liter.
    let products = &summary.products[&fx.parcel_1];
    assert_eq!(products.len(), 1);
    let cobre = &products[0];
    assert_eq!(cobre.product_id, fx.product_1);
    assert_eq!(cobre.quantity_base, 1.5);
    assert_eq!(cobre.base_unit, BaseUnit::Liters);
    assert_eq!(cobre.cost, 15_000.0);
    assert_eq!(cobre.name, "cobre");

    assert_eq!(summary.parcel_totals[&fx.parcel_1].cost, 15_000.0);
    // 2 kg of urea at 5_000 per kg on lote 2.
    assert_eq!(summary.parcel_totals[&fx.parcel_2].cost, 10_000.0);
    assert_eq!(summary.total_input_cost, 25_000.0);
    assert!(summary.missing_prices.is_empty());
}

#[tokio::test]
async fn product_without_price_costs_zero_and_is_reported() {
    let (store, fx) = FarmFixture::seed().await;

    // A consumed product that has no inventory entry at all.
    let orphan_product = Uuid::new_v4();
    let movement = Uuid::new_v4();
    store
        .seed_movement(DailyMovement {
            id: movement,
            application_id: fx.application_id,
            parcel_id: fx.parcel_1,
            date: date(2026, 3, 3),
            caneca_count: 1.0,
            bulto_count: 0.0,
        })
        .await;
    store
        .seed_movement_product(MovementProduct {
            id: Uuid::new_v4(),
            movement_id: movement,
            product_id: orphan_product,
            quantity: 3.0,
            unit: "l".to_string(),
        })
        .await;

    let app = store
        .get_application(fx.application_id)
        .await
        .unwrap()
        .unwrap();
    let summary = aggregate_usage(store.as_ref(), &app).await.unwrap();

    assert_eq!(summary.missing_prices, vec![orphan_product]);
    // The orphan contributes quantity but no cost.
    let orphan = summary.products[&fx.parcel_1]
        .iter()
        .find(|p| p.product_id == orphan_product)
        .unwrap();
    assert_eq!(orphan.quantity_base, 3.0);
    assert_eq!(orphan.cost, 0.0);
    assert_eq!(summary.total_input_cost, 25_000.0);
}

#[tokio::test]
async fn unknown_units_pass_through_unconverted() {
    let (store, fx) = FarmFixture::seed().await;
    let movement = Uuid::new_v4();
    store
        .seed_movement(DailyMovement {
            id: movement,
            application_id: fx.application_id,
            parcel_id: fx.parcel_2,
            date: date(2026, 3, 3),
            caneca_count: 0.0,
            bulto_count: 1.0,
        })
        .await;
    store
        .seed_movement_product(MovementProduct {
            id: Uuid::new_v4(),
            movement_id: movement,
            product_id: fx.product_2,
            quantity: 5.0,
            unit: "sobres".to_string(),
        })
        .await;

    let app = store
        .get_application(fx.application_id)
        .await
        .unwrap()
        .unwrap();
    let summary = aggregate_usage(store.as_ref(), &app).await.unwrap();

    // 2 kg + 5 pass-through units accumulate in the same bucket; cost keeps
    // tracking the running quantity.
    let urea = summary.products[&fx.parcel_2]
        .iter()
        .find(|p| p.product_id == fx.product_2)
        .unwrap();
    assert_eq!(urea.quantity_base, 7.0);
    assert_eq!(urea.cost, 35_000.0);
}

#[tokio::test]
async fn consumption_is_grouped_by_product_across_parcels() {
    let (store, fx) = FarmFixture::seed().await;

    let consumed = consumed_by_product(store.as_ref(), fx.application_id)
        .await
        .unwrap();

    assert_eq!(consumed.len(), 2);
    assert_eq!(consumed[&fx.product_1], 1.5);
    assert_eq!(consumed[&fx.product_2], 2.0);
}

#[tokio::test]
async fn application_without_movements_aggregates_empty() {
    let (store, fx) = FarmFixture::seed().await;
    let mut app = store
        .get_application(fx.application_id)
        .await
        .unwrap()
        .unwrap();
    // Point at an id with no movements.
    app.id = Uuid::new_v4();

    let summary = aggregate_usage(store.as_ref(), &app).await.unwrap();
    assert!(summary.loads.is_empty());
    assert!(summary.products.is_empty());
    assert_eq!(summary.total_input_cost, 0.0);
}
