//! Closure workflow: the state machine that takes an open application
//! through review, confirmation, and the irreversible commit.
//!
//! ```text
//! Reviewing     -> DataConfirmed   (confirm_data: actual dates validated)
//! DataConfirmed -> Confirmed       (confirm: figures computed once)
//! Confirmed     -> Committing      (commit begins)
//! Committing    -> Closed          (all five commit steps succeeded)
//! Committing    -> Failed          (a commit step failed; earlier steps stand)
//! Failed        -> Confirmed       (reconfirm: figures recomputed for retry)
//! ```
//!
//! No state is ever reached automatically; every transition is an explicit
//! caller action. Ledger edits are allowed only before the figures are
//! confirmed.

pub mod commit;
pub mod figures;

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use cierre_store::models::{Application, ApplicationState, Worker};
use cierre_store::store::Store;

use crate::error::{CoreError, CoreResult};
use crate::labor::aggregate::load_labor_ledger;
use crate::labor::ledger::{LaborLedger, NewWorkRecord};
use crate::usage::{UsageSummary, aggregate_usage};
use crate::workflow::commit::ProductDeduction;
use crate::workflow::figures::{ClosureFigures, compute_figures};

/// State of a closure workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureState {
    Reviewing,
    DataConfirmed,
    Confirmed,
    Committing,
    Closed,
    Failed,
}

impl ClosureState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reviewing => "reviewing",
            Self::DataConfirmed => "data_confirmed",
            Self::Confirmed => "confirmed",
            Self::Committing => "committing",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ClosureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dates and observations confirmed by the operator.
#[derive(Debug, Clone)]
struct ConfirmedData {
    actual_start: NaiveDate,
    actual_end: NaiveDate,
    observations: String,
}

/// Outcome of a successful commit.
#[derive(Debug, Clone)]
pub struct ClosureReceipt {
    pub closure_record_id: Uuid,
    pub figures: ClosureFigures,
    pub deductions: Vec<ProductDeduction>,
}

/// One closure in progress. Owns the aggregates and the editable ledger;
/// drops without trace unless [`Self::commit`] runs to completion.
pub struct ClosureWorkflow {
    store: Arc<dyn Store>,
    application: Application,
    usage: UsageSummary,
    ledger: LaborLedger,
    total_tree_count: u32,
    state: ClosureState,
    confirmed: Option<ConfirmedData>,
    figures: Option<ClosureFigures>,
}

impl std::fmt::Debug for ClosureWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureWorkflow")
            .field("application", &self.application)
            .field("usage", &self.usage)
            .field("ledger", &self.ledger)
            .field("total_tree_count", &self.total_tree_count)
            .field("state", &self.state)
            .field("confirmed", &self.confirmed)
            .field("figures", &self.figures)
            .finish_non_exhaustive()
    }
}

impl ClosureWorkflow {
    /// Open a closure for review: validates the application is still open,
    /// aggregates actual usage, and loads the labor ledger.
    pub async fn begin(store: Arc<dyn Store>, application_id: Uuid) -> CoreResult<Self> {
        let application = store
            .get_application(application_id)
            .await?
            .ok_or_else(|| {
                CoreError::Validation(format!("application {application_id} not found"))
            })?;

        if application.state == ApplicationState::Closed {
            return Err(CoreError::AlreadyClosed { id: application_id });
        }

        let usage = aggregate_usage(store.as_ref(), &application).await?;
        let ledger =
            load_labor_ledger(store.as_ref(), application.task_id, &application.parcel_ids)
                .await?;

        let total_tree_count = store
            .parcels_by_ids(&application.parcel_ids)
            .await?
            .iter()
            .map(|p| p.tree_count)
            .sum();

        tracing::info!(
            application_id = %application_id,
            application = %application.name,
            kind = %application.kind,
            parcels = application.parcel_ids.len(),
            work_records = ledger.entries().len(),
            "closure review started"
        );

        Ok(Self {
            store,
            application,
            usage,
            ledger,
            total_tree_count,
            state: ClosureState::Reviewing,
            confirmed: None,
            figures: None,
        })
    }

    pub fn state(&self) -> ClosureState {
        self.state
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn usage(&self) -> &UsageSummary {
        &self.usage
    }

    pub fn ledger(&self) -> &LaborLedger {
        &self.ledger
    }

    /// The figures computed at confirmation, if the workflow got that far.
    pub fn figures(&self) -> Option<&ClosureFigures> {
        self.figures.as_ref()
    }

    fn ensure_editable(&self, operation: &'static str) -> CoreResult<()> {
        match self.state {
            ClosureState::Reviewing | ClosureState::DataConfirmed => Ok(()),
            state => Err(CoreError::InvalidState {
                operation,
                state: state.as_str(),
            }),
        }
    }

    // -- ledger edits (pre-confirmation only) ------------------------------

    pub fn set_fraction(&mut self, record_id: Uuid, new_fraction: f64) -> CoreResult<()> {
        self.ensure_editable("edit work record")?;
        self.ledger.set_fraction(record_id, new_fraction)
    }

    pub fn mark_deleted(&mut self, record_id: Uuid) -> CoreResult<()> {
        self.ensure_editable("delete work record")?;
        self.ledger.mark_deleted(record_id)
    }

    pub fn append_work_record(&mut self, new: NewWorkRecord) -> CoreResult<Uuid> {
        self.ensure_editable("append work record")?;
        self.ledger.append(new)
    }

    pub fn register_worker(&mut self, worker: Worker) -> CoreResult<()> {
        self.ensure_editable("register worker")?;
        self.ledger.register_worker(worker);
        Ok(())
    }

    // -- transitions -------------------------------------------------------

    /// Confirm the actual dates and observations: Reviewing -> DataConfirmed.
    pub fn confirm_data(
        &mut self,
        actual_start: NaiveDate,
        actual_end: NaiveDate,
        observations: impl Into<String>,
    ) -> CoreResult<()> {
        if self.state != ClosureState::Reviewing {
            return Err(CoreError::InvalidState {
                operation: "confirm data",
                state: self.state.as_str(),
            });
        }
        if actual_end < actual_start {
            return Err(CoreError::Validation(format!(
                "actual end {actual_end} precedes actual start {actual_start}"
            )));
        }
        self.confirmed = Some(ConfirmedData {
            actual_start,
            actual_end,
            observations: observations.into(),
        });
        self.state = ClosureState::DataConfirmed;
        Ok(())
    }

    /// Compute the closure figures: DataConfirmed -> Confirmed.
    pub fn confirm(&mut self) -> CoreResult<ClosureFigures> {
        if self.state != ClosureState::DataConfirmed {
            return Err(CoreError::InvalidState {
                operation: "confirm",
                state: self.state.as_str(),
            });
        }
        let data = self.confirmed.as_ref().ok_or_else(|| {
            CoreError::Validation("dates were never confirmed".to_string())
        })?;
        let figures = compute_figures(
            &self.usage,
            &self.ledger,
            self.total_tree_count,
            data.actual_start,
            data.actual_end,
        );
        tracing::info!(
            application_id = %self.application.id,
            total_input_cost = figures.total_input_cost,
            total_labor_cost = figures.total_labor_cost,
            total_cost = figures.total_cost,
            cost_per_tree = figures.cost_per_tree,
            elapsed_days = figures.elapsed_days,
            "closure figures confirmed"
        );
        self.figures = Some(figures);
        self.state = ClosureState::Confirmed;
        Ok(figures)
    }

    /// Recompute figures after a failed commit: Failed -> Confirmed.
    ///
    /// The ledger baseline already reflects any edits that became durable in
    /// the failed attempt, so the recomputed figures match what a fresh
    /// review would produce.
    pub fn reconfirm(&mut self) -> CoreResult<ClosureFigures> {
        if self.state != ClosureState::Failed {
            return Err(CoreError::InvalidState {
                operation: "reconfirm",
                state: self.state.as_str(),
            });
        }
        self.state = ClosureState::DataConfirmed;
        self.confirm()
    }

    /// Run the commit sequence: Confirmed -> Committing -> Closed, or
    /// Failed on the first step error (earlier steps stay committed; retry
    /// via [`Self::reconfirm`] and another commit).
    ///
    /// A workflow already Closed (or in any other state) rejects the call;
    /// closure is never silently re-applied.
    pub async fn commit(&mut self, closed_by: &str) -> CoreResult<ClosureReceipt> {
        if self.state != ClosureState::Confirmed {
            return Err(CoreError::InvalidState {
                operation: "commit",
                state: self.state.as_str(),
            });
        }
        self.state = ClosureState::Committing;
        match self.run_commit(closed_by).await {
            Ok(receipt) => {
                self.state = ClosureState::Closed;
                tracing::info!(
                    application_id = %self.application.id,
                    closure_record_id = %receipt.closure_record_id,
                    products_deducted = receipt.deductions.len(),
                    "closure committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                self.state = ClosureState::Failed;
                tracing::error!(
                    application_id = %self.application.id,
                    error = %e,
                    "closure commit failed; committed steps are not rolled back"
                );
                Err(e)
            }
        }
    }

    async fn run_commit(&mut self, closed_by: &str) -> CoreResult<ClosureReceipt> {
        let (figures, data) = match (self.figures, self.confirmed.clone()) {
            (Some(figures), Some(data)) => (figures, data),
            _ => {
                return Err(CoreError::Validation(
                    "commit without confirmed figures".to_string(),
                ));
            }
        };
        let store = self.store.as_ref();
        let application_id = self.application.id;

        // 1. Persist ledger edits. Each operation folds into the baseline
        //    as soon as it lands, so a retry after a failure anywhere in
        //    this step or a later one never replays a durable write.
        let ops = self.ledger.pending_ops();
        tracing::info!(application_id = %application_id, ops = ops.len(), "commit step 1: ledger");
        for op in &ops {
            commit::apply_ledger_op(store, op).await?;
            self.ledger.mark_applied(op);
        }

        // 2. Closure record.
        tracing::info!(application_id = %application_id, "commit step 2: closure record");
        let record = commit::write_closure_record(
            store,
            application_id,
            &figures,
            &data.observations,
            closed_by,
        )
        .await?;

        // 3. Application open -> closed.
        tracing::info!(application_id = %application_id, "commit step 3: close application");
        commit::close_application(
            store,
            &self.application,
            &figures,
            data.actual_start,
            data.actual_end,
        )
        .await?;

        // 4. Linked task, when present.
        if let Some(task_id) = self.application.task_id {
            tracing::info!(application_id = %application_id, task_id = %task_id, "commit step 4: complete task");
            store.complete_task(task_id, data.actual_end).await?;
        }

        // 5. Inventory consolidation.
        tracing::info!(application_id = %application_id, "commit step 5: consolidate inventory");
        let deductions = commit::consolidate_inventory(store, application_id).await?;

        Ok(ClosureReceipt {
            closure_record_id: record.id,
            figures,
            deductions,
        })
    }
}
