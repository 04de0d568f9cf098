//! Pre-commit financial figures.
//!
//! Computed once when the workflow enters its confirmed state, from the
//! usage summary and the (possibly edited) labor ledger.

use chrono::NaiveDate;

use crate::labor::ledger::LaborLedger;
use crate::usage::UsageSummary;

/// The reconciled figures written into the application at closure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosureFigures {
    /// Sum of jornal fractions over non-deleted work records.
    pub total_labor_fraction: f64,
    pub total_labor_cost: f64,
    /// `total_labor_cost / total_labor_fraction`, 0 when no labor.
    pub average_daily_labor_value: f64,
    pub total_input_cost: f64,
    pub total_cost: f64,
    /// `total_cost / total_tree_count`, 0 when the parcels carry no trees.
    pub cost_per_tree: f64,
    pub total_tree_count: u32,
    /// Calendar days between the actual dates, both endpoints inclusive.
    pub elapsed_days: i64,
}

/// Days elapsed between two dates, inclusive of both endpoints: a one-day
/// application counts as 1.
pub fn elapsed_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Reconcile the two cost streams into the closure figures.
pub fn compute_figures(
    usage: &UsageSummary,
    ledger: &LaborLedger,
    total_tree_count: u32,
    actual_start: NaiveDate,
    actual_end: NaiveDate,
) -> ClosureFigures {
    let labor = ledger.totals();

    let average_daily_labor_value = if labor.fraction > 0.0 {
        labor.cost / labor.fraction
    } else {
        0.0
    };

    let total_cost = usage.total_input_cost + labor.cost;
    let cost_per_tree = if total_tree_count > 0 {
        total_cost / f64::from(total_tree_count)
    } else {
        0.0
    };

    ClosureFigures {
        total_labor_fraction: labor.fraction,
        total_labor_cost: labor.cost,
        average_daily_labor_value,
        total_input_cost: usage.total_input_cost,
        total_cost,
        cost_per_tree,
        total_tree_count,
        elapsed_days: elapsed_days(actual_start, actual_end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn elapsed_days_is_endpoint_inclusive() {
        assert_eq!(elapsed_days(date(1), date(1)), 1);
        assert_eq!(elapsed_days(date(1), date(4)), 4);
        assert_eq!(
            elapsed_days(
                NaiveDate::from_ymd_opt(2026, 2, 27).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
            ),
            4
        );
    }
}
