//! Domain records for field applications, execution logging, labor, and
//! inventory.
//!
//! String forms of every enum are snake_case and round-trip through
//! `Display`/`FromStr`, matching what the hosted store persists.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Kind of field application. Determines the secondary load unit recorded
/// during execution (canecas for spray/drench tank loads, bultos for
/// fertilizer bags) and the canonical base unit family used for costing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationKind {
    Spray,
    Fertilization,
    Drench,
}

impl fmt::Display for ApplicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Spray => "spray",
            Self::Fertilization => "fertilization",
            Self::Drench => "drench",
        };
        f.write_str(s)
    }
}

impl FromStr for ApplicationKind {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spray" => Ok(Self::Spray),
            "fertilization" => Ok(Self::Fertilization),
            "drench" => Ok(Self::Drench),
            other => Err(EnumParseError::new("application kind", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Lifecycle state of an application. `Closed` is terminal; only the commit
/// step of the closure workflow performs the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationState {
    Open,
    Closed,
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

impl FromStr for ApplicationState {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(EnumParseError::new("application state", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// State of the field task linked to an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskState {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(EnumParseError::new("task state", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Kind of an inventory audit entry. The closure engine only ever writes
/// `Consumption`; purchases and adjustments come from other flows but appear
/// in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryMovementKind {
    Consumption,
    Purchase,
    Adjustment,
}

impl fmt::Display for InventoryMovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Consumption => "consumption",
            Self::Purchase => "purchase",
            Self::Adjustment => "adjustment",
        };
        f.write_str(s)
    }
}

impl FromStr for InventoryMovementKind {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consumption" => Ok(Self::Consumption),
            "purchase" => Ok(Self::Purchase),
            "adjustment" => Ok(Self::Adjustment),
            other => Err(EnumParseError::new("inventory movement kind", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Error returned when parsing an invalid enum string form.
#[derive(Debug, Clone)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

// ---------------------------------------------------------------------------
// Applications and parcels
// ---------------------------------------------------------------------------

/// One planned field treatment: a spray, fertilization, or drench applied to
/// a set of parcels over a date range.
///
/// Financial fields are `None` while the application is open and are written
/// exactly once when the closure workflow commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub name: String,
    pub kind: ApplicationKind,
    pub state: ApplicationState,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    /// Field task tracking the labor for this application, when one exists.
    pub task_id: Option<Uuid>,
    pub parcel_ids: Vec<Uuid>,
    pub input_cost: Option<f64>,
    pub labor_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub cost_per_tree: Option<f64>,
    /// Total jornal fractions consumed, written at closure.
    pub jornales_used: Option<f64>,
    pub average_daily_labor_value: Option<f64>,
}

/// The patch applied to an [`Application`] when it transitions open -> closed.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationClosure {
    pub actual_start: NaiveDate,
    pub actual_end: NaiveDate,
    pub input_cost: f64,
    pub labor_cost: f64,
    pub total_cost: f64,
    pub cost_per_tree: f64,
    pub jornales_used: f64,
    pub average_daily_labor_value: f64,
}

/// A lote: a mapped land subdivision, the unit of cost attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub name: String,
    pub tree_count: u32,
}

// ---------------------------------------------------------------------------
// Execution records
// ---------------------------------------------------------------------------

/// One execution-day record for one parcel. Caneca and bulto counts are the
/// physical load units recorded in the field; normally only the one matching
/// the application kind is non-zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMovement {
    pub id: Uuid,
    pub application_id: Uuid,
    pub parcel_id: Uuid,
    pub date: NaiveDate,
    pub caneca_count: f64,
    pub bulto_count: f64,
}

/// One product consumed within a [`DailyMovement`], in the raw unit the
/// field crew recorded (cc, g, L, kg, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementProduct {
    pub id: Uuid,
    pub movement_id: Uuid,
    pub product_id: Uuid,
    pub quantity: f64,
    pub unit: String,
}

/// Planned mixture grouping: scopes planned products to a parcel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedMixture {
    pub id: Uuid,
    pub application_id: Uuid,
    pub parcel_id: Uuid,
}

/// One product of a planned mixture, already in its canonical unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedProduct {
    pub id: Uuid,
    pub mixture_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
}

// ---------------------------------------------------------------------------
// Labor
// ---------------------------------------------------------------------------

/// Reference to the worker on a [`WorkRecord`]: exactly one of employee or
/// contractor, enforced by the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRef {
    Employee(Uuid),
    Contractor(Uuid),
}

impl WorkerRef {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Employee(id) | Self::Contractor(id) => *id,
        }
    }
}

/// One worker's time on one parcel on one date. `fraction` is a portion of
/// an 8-hour jornal; `cost` is derived from the worker's economic attributes
/// at record time and re-derived on edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: Uuid,
    pub task_id: Uuid,
    pub parcel_id: Uuid,
    pub date: NaiveDate,
    pub worker: WorkerRef,
    pub fraction: f64,
    pub cost: f64,
}

/// A salaried employee. Monthly figures plus contracted weekly hours drive
/// the derived hourly rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub monthly_salary: f64,
    pub monthly_benefits: f64,
    pub monthly_allowances: f64,
    pub weekly_hours: f64,
}

/// A flat-rate contractor paid per jornal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contractor {
    pub id: Uuid,
    pub name: String,
    pub daily_rate: f64,
}

/// Polymorphic worker: a tagged union, never a unified record shape. The
/// discriminant selects the cost formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Worker {
    Employee(Employee),
    Contractor(Contractor),
}

impl Worker {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Employee(e) => e.id,
            Self::Contractor(c) => c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Employee(e) => &e.name,
            Self::Contractor(c) => &c.name,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Employee(_) => "employee",
            Self::Contractor(_) => "contractor",
        }
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// A product in the farm inventory. `on_hand` and `unit_price` are in the
/// canonical unit (`unit`); `kg_per_bulto` is the configured bag factor
/// required to capture fertilizer bag counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryProduct {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub on_hand: f64,
    pub unit_price: f64,
    pub kg_per_bulto: Option<f64>,
}

/// Append-only inventory audit entry. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub kind: InventoryMovementKind,
    pub quantity: f64,
    pub balance_before: f64,
    pub balance_after: f64,
    /// Monetary value of the moved quantity at the product's unit price.
    pub value: f64,
    /// The closing application, for consumption entries.
    pub application_id: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Closure and tasks
// ---------------------------------------------------------------------------

/// One row per closed application. Insert-once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosureRecord {
    pub id: Uuid,
    pub application_id: Uuid,
    pub closed_on: NaiveDate,
    pub elapsed_days: i64,
    pub average_daily_labor_value: f64,
    pub observations: String,
    pub closed_by: String,
}

/// The field task linked to an application; completed at closure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldTask {
    pub id: Uuid,
    pub name: String,
    pub state: TaskState,
    pub actual_end: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_kind_round_trips() {
        for kind in [
            ApplicationKind::Spray,
            ApplicationKind::Fertilization,
            ApplicationKind::Drench,
        ] {
            let parsed: ApplicationKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn unknown_enum_string_is_rejected() {
        let err = "pruning".parse::<ApplicationKind>().unwrap_err();
        assert!(err.to_string().contains("pruning"));

        let err = "escalated".parse::<TaskState>().unwrap_err();
        assert!(err.to_string().contains("task state"));
    }

    #[test]
    fn worker_ref_serde_is_tagged() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(WorkerRef::Employee(id)).unwrap();
        assert_eq!(json, serde_json::json!({ "employee": id }));

        let back: WorkerRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, WorkerRef::Employee(id));
    }

    #[test]
    fn worker_exposes_discriminant() {
        let worker = Worker::Contractor(Contractor {
            id: Uuid::new_v4(),
            name: "Raul".to_string(),
            daily_rate: 80_000.0,
        });
        assert_eq!(worker.kind_label(), "contractor");
        assert_eq!(worker.name(), "Raul");
    }
}
