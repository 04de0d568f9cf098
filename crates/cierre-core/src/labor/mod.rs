//! Labor cost formulas.
//!
//! Two formulas, selected by the worker's discriminant: salaried employees
//! get an hourly rate derived from their monthly figures and contracted
//! hours; contractors are paid a flat daily rate. Every intermediate value
//! is rounded to 2 decimals independently -- the legacy system did, and
//! reproducing its totals exactly requires keeping that quirk.

pub mod aggregate;
pub mod ledger;

use cierre_store::models::Worker;

use crate::error::{CoreError, CoreResult};

/// Average weeks per month used to derive monthly hours from weekly hours.
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Hours in one jornal (standard workday).
pub const WORKDAY_HOURS: f64 = 8.0;

/// Upper bound on a jornal fraction. Deliberately above 1.0: a record may
/// cover multi-day-equivalent work.
pub const MAX_FRACTION: f64 = 3.0;

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Cost breakdown for a fraction of a jornal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaborCost {
    pub hourly_rate: f64,
    pub daily_cost: f64,
    pub total_cost: f64,
}

fn check_fraction(fraction: f64) -> CoreResult<()> {
    if !(0.0..=MAX_FRACTION).contains(&fraction) {
        return Err(CoreError::InvalidInput(format!(
            "jornal fraction {fraction} outside [0, {MAX_FRACTION}]"
        )));
    }
    Ok(())
}

/// Cost of `fraction` of a jornal for a salaried employee.
///
/// `monthly_hours = weekly_hours * 4.33`; the hourly rate spreads salary,
/// benefits, and allowances over those hours; a day is 8 hours. Each of the
/// three outputs is rounded independently.
pub fn employee_cost(
    salary: f64,
    benefits: f64,
    allowances: f64,
    weekly_hours: f64,
    fraction: f64,
) -> CoreResult<LaborCost> {
    if weekly_hours <= 0.0 {
        return Err(CoreError::InvalidInput(format!(
            "weekly hours must be positive, got {weekly_hours}"
        )));
    }
    check_fraction(fraction)?;

    let monthly_hours = weekly_hours * WEEKS_PER_MONTH;
    let hourly_rate = round2((salary + benefits + allowances) / monthly_hours);
    let daily_cost = round2(hourly_rate * WORKDAY_HOURS);
    let total_cost = round2(daily_cost * fraction);

    Ok(LaborCost {
        hourly_rate,
        daily_cost,
        total_cost,
    })
}

/// Cost of `fraction` of a jornal for a flat-rate contractor.
pub fn contractor_cost(daily_rate: f64, fraction: f64) -> CoreResult<LaborCost> {
    check_fraction(fraction)?;

    Ok(LaborCost {
        hourly_rate: round2(daily_rate / WORKDAY_HOURS),
        daily_cost: daily_rate,
        total_cost: round2(daily_rate * fraction),
    })
}

/// Dispatch on the worker discriminant. The match is exhaustive on purpose:
/// a new worker kind must pick a formula here before it compiles.
pub fn worker_cost(worker: &Worker, fraction: f64) -> CoreResult<LaborCost> {
    match worker {
        Worker::Employee(e) => employee_cost(
            e.monthly_salary,
            e.monthly_benefits,
            e.monthly_allowances,
            e.weekly_hours,
            fraction,
        ),
        Worker::Contractor(c) => contractor_cost(c.daily_rate, fraction),
    }
}

/// Re-derive a work record's cost after its fraction changed.
///
/// With the worker's economic attributes at hand the full formula runs
/// again. Without them (worker since removed from the catalog) the cost
/// scales proportionally from the previous values -- degraded but
/// deterministic, never a failure. A zero previous fraction scales to zero.
pub fn recompute_cost(
    worker: Option<&Worker>,
    old_fraction: f64,
    old_cost: f64,
    new_fraction: f64,
) -> CoreResult<f64> {
    check_fraction(new_fraction)?;

    match worker {
        Some(w) => Ok(worker_cost(w, new_fraction)?.total_cost),
        None if old_fraction == 0.0 => Ok(0.0),
        None => Ok(round2(old_cost / old_fraction * new_fraction)),
    }
}
