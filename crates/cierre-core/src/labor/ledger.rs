//! Editable in-memory labor ledger.
//!
//! During the closure review step the operator can correct a work record's
//! fraction, strike a record, or append one that was never captured. None
//! of that touches the store: the ledger tracks live entries against a
//! baseline snapshot of what is persisted, and [`LaborLedger::pending_ops`]
//! derives the commit operations mechanically from the diff.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use uuid::Uuid;

use cierre_store::models::{Parcel, WorkRecord, Worker, WorkerRef};

use crate::error::{CoreError, CoreResult};
use crate::labor::{recompute_cost, worker_cost};

/// One ledger line: the record plus display enrichment and the soft-delete
/// flag. Deleted entries stay in the list (shown struck-through) but are
/// excluded from every total.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub record: WorkRecord,
    pub worker_name: String,
    pub worker_kind: &'static str,
    pub parcel_name: String,
    pub deleted: bool,
}

/// A record appended during review.
#[derive(Debug, Clone)]
pub struct NewWorkRecord {
    pub worker: WorkerRef,
    pub parcel_id: Uuid,
    pub date: NaiveDate,
    pub fraction: f64,
}

/// A store operation derived from the ledger diff at commit time.
#[derive(Debug, Clone)]
pub enum LedgerOp {
    Insert(WorkRecord),
    Update { id: Uuid, fraction: f64, cost: f64 },
    Delete(Uuid),
}

/// Ledger-wide totals over non-deleted entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerTotals {
    /// Distinct workers.
    pub workers: usize,
    /// Distinct work dates.
    pub dates: usize,
    pub fraction: f64,
    pub cost: f64,
}

/// Per-parcel jornal and cost subtotals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParcelLabor {
    pub fraction: f64,
    pub cost: f64,
}

/// The editable labor ledger for one application's linked task.
#[derive(Debug)]
pub struct LaborLedger {
    task_id: Option<Uuid>,
    /// Persisted records as loaded; the diff target for [`Self::pending_ops`].
    baseline: HashMap<Uuid, WorkRecord>,
    entries: Vec<LedgerEntry>,
    workers: HashMap<Uuid, Worker>,
    parcels: HashMap<Uuid, Parcel>,
}

impl LaborLedger {
    /// Build a ledger from persisted records and the catalog lookups that
    /// were batch-fetched alongside them.
    pub fn new(
        task_id: Option<Uuid>,
        records: Vec<WorkRecord>,
        workers: HashMap<Uuid, Worker>,
        parcels: HashMap<Uuid, Parcel>,
    ) -> Self {
        let baseline: HashMap<Uuid, WorkRecord> =
            records.iter().map(|r| (r.id, r.clone())).collect();
        let entries = records
            .into_iter()
            .map(|record| Self::enrich(record, &workers, &parcels))
            .collect();
        Self {
            task_id,
            baseline,
            entries,
            workers,
            parcels,
        }
    }

    fn enrich(
        record: WorkRecord,
        workers: &HashMap<Uuid, Worker>,
        parcels: &HashMap<Uuid, Parcel>,
    ) -> LedgerEntry {
        let (worker_name, worker_kind) = match workers.get(&record.worker.id()) {
            Some(w) => (w.name().to_string(), w.kind_label()),
            None => ("(unknown)".to_string(), "unknown"),
        };
        let parcel_name = parcels
            .get(&record.parcel_id)
            .map_or_else(|| "(unknown)".to_string(), |p| p.name.clone());
        LedgerEntry {
            record,
            worker_name,
            worker_kind,
            parcel_name,
            deleted: false,
        }
    }

    pub fn task_id(&self) -> Option<Uuid> {
        self.task_id
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Make a catalog worker available for [`Self::append`] lookups beyond
    /// those already referenced by persisted records.
    pub fn register_worker(&mut self, worker: Worker) {
        self.workers.insert(worker.id(), worker);
    }

    fn entry_mut(&mut self, record_id: Uuid) -> CoreResult<&mut LedgerEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.record.id == record_id)
            .ok_or_else(|| {
                CoreError::Validation(format!("work record {record_id} not in ledger"))
            })
    }

    /// Change an entry's fraction and re-derive its cost: full formula when
    /// the worker is still in the catalog, proportional scaling otherwise.
    pub fn set_fraction(&mut self, record_id: Uuid, new_fraction: f64) -> CoreResult<()> {
        let worker = self
            .entries
            .iter()
            .find(|e| e.record.id == record_id)
            .and_then(|e| self.workers.get(&e.record.worker.id()))
            .cloned();

        let entry = self.entry_mut(record_id)?;
        if entry.deleted {
            return Err(CoreError::Validation(format!(
                "work record {record_id} is marked deleted"
            )));
        }
        let cost = recompute_cost(
            worker.as_ref(),
            entry.record.fraction,
            entry.record.cost,
            new_fraction,
        )?;
        entry.record.fraction = new_fraction;
        entry.record.cost = cost;
        Ok(())
    }

    /// Soft-delete: excluded from totals, kept in the entry list, removed
    /// from the store at commit only if it was persisted.
    pub fn mark_deleted(&mut self, record_id: Uuid) -> CoreResult<()> {
        self.entry_mut(record_id)?.deleted = true;
        Ok(())
    }

    /// Append a record captured during review. Validates the worker and
    /// parcel against the catalogs and computes the initial cost.
    pub fn append(&mut self, new: NewWorkRecord) -> CoreResult<Uuid> {
        let task_id = self.task_id.ok_or_else(|| {
            CoreError::Validation(
                "application has no linked task to attach work records to".to_string(),
            )
        })?;
        let worker = self.workers.get(&new.worker.id()).ok_or_else(|| {
            CoreError::Validation(format!("worker {} not found", new.worker.id()))
        })?;
        if !self.parcels.contains_key(&new.parcel_id) {
            return Err(CoreError::Validation(format!(
                "parcel {} not found",
                new.parcel_id
            )));
        }

        let cost = worker_cost(worker, new.fraction)?.total_cost;
        let record = WorkRecord {
            id: Uuid::new_v4(),
            task_id,
            parcel_id: new.parcel_id,
            date: new.date,
            worker: new.worker,
            fraction: new.fraction,
            cost,
        };
        let id = record.id;
        let entry = Self::enrich(record, &self.workers, &self.parcels);
        self.entries.push(entry);
        Ok(id)
    }

    /// Per-parcel subtotals over non-deleted entries.
    pub fn per_parcel(&self) -> BTreeMap<Uuid, ParcelLabor> {
        let mut map: BTreeMap<Uuid, ParcelLabor> = BTreeMap::new();
        for entry in self.entries.iter().filter(|e| !e.deleted) {
            let parcel = map.entry(entry.record.parcel_id).or_default();
            parcel.fraction += entry.record.fraction;
            parcel.cost += entry.record.cost;
        }
        map
    }

    /// Ledger-wide totals over non-deleted entries.
    pub fn totals(&self) -> LedgerTotals {
        let mut workers: HashSet<Uuid> = HashSet::new();
        let mut dates: HashSet<NaiveDate> = HashSet::new();
        let mut fraction = 0.0;
        let mut cost = 0.0;
        for entry in self.entries.iter().filter(|e| !e.deleted) {
            workers.insert(entry.record.worker.id());
            dates.insert(entry.record.date);
            fraction += entry.record.fraction;
            cost += entry.record.cost;
        }
        LedgerTotals {
            workers: workers.len(),
            dates: dates.len(),
            fraction,
            cost,
        }
    }

    /// Derive the commit operations from the diff against the baseline.
    ///
    /// - not in baseline, not deleted -> insert
    /// - in baseline, deleted -> delete
    /// - in baseline, fraction changed -> update
    /// - appended then deleted -> nothing (never persisted)
    pub fn pending_ops(&self) -> Vec<LedgerOp> {
        let mut ops = Vec::new();
        for entry in &self.entries {
            match self.baseline.get(&entry.record.id) {
                None if !entry.deleted => ops.push(LedgerOp::Insert(entry.record.clone())),
                None => {}
                Some(_) if entry.deleted => ops.push(LedgerOp::Delete(entry.record.id)),
                Some(base) if base.fraction != entry.record.fraction => {
                    ops.push(LedgerOp::Update {
                        id: entry.record.id,
                        fraction: entry.record.fraction,
                        cost: entry.record.cost,
                    });
                }
                Some(_) => {}
            }
        }
        ops
    }

    /// Fold one durably applied operation into the baseline. Called per
    /// operation as commit step 1 progresses, so a retry after a failure
    /// anywhere in the step resumes from the first unapplied operation
    /// instead of replaying writes that already landed.
    pub fn mark_applied(&mut self, op: &LedgerOp) {
        match op {
            LedgerOp::Insert(record) => {
                self.baseline.insert(record.id, record.clone());
            }
            LedgerOp::Update { id, fraction, cost } => {
                if let Some(base) = self.baseline.get_mut(id) {
                    base.fraction = *fraction;
                    base.cost = *cost;
                }
            }
            LedgerOp::Delete(id) => {
                self.baseline.remove(id);
                self.entries.retain(|e| e.record.id != *id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cierre_store::models::{Contractor, Employee};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn parcel(name: &str) -> Parcel {
        Parcel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tree_count: 100,
        }
    }

    fn contractor(name: &str, rate: f64) -> Worker {
        Worker::Contractor(Contractor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            daily_rate: rate,
        })
    }

    fn record(task: Uuid, parcel: Uuid, worker: &Worker, day: u32, fraction: f64) -> WorkRecord {
        let cost = worker_cost(worker, fraction).unwrap().total_cost;
        let worker_ref = match worker {
            Worker::Employee(e) => WorkerRef::Employee(e.id),
            Worker::Contractor(c) => WorkerRef::Contractor(c.id),
        };
        WorkRecord {
            id: Uuid::new_v4(),
            task_id: task,
            parcel_id: parcel,
            date: date(day),
            worker: worker_ref,
            fraction,
            cost,
        }
    }

    fn ledger_with(records: Vec<WorkRecord>, workers: Vec<Worker>, parcels: Vec<Parcel>) -> LaborLedger {
        let task_id = records.first().map(|r| r.task_id).or(Some(Uuid::new_v4()));
        LaborLedger::new(
            task_id,
            records,
            workers.into_iter().map(|w| (w.id(), w)).collect(),
            parcels.into_iter().map(|p| (p.id, p)).collect(),
        )
    }

    #[test]
    fn totals_count_distinct_workers_and_dates() {
        let task = Uuid::new_v4();
        let lote = parcel("lote 1");
        let raul = contractor("Raul", 80_000.0);
        let ana = contractor("Ana", 60_000.0);
        let ledger = ledger_with(
            vec![
                record(task, lote.id, &raul, 1, 1.0),
                record(task, lote.id, &raul, 2, 0.5),
                record(task, lote.id, &ana, 1, 1.0),
            ],
            vec![raul, ana],
            vec![lote],
        );

        let totals = ledger.totals();
        assert_eq!(totals.workers, 2);
        assert_eq!(totals.dates, 2);
        assert_eq!(totals.fraction, 2.5);
        assert_eq!(totals.cost, 80_000.0 + 40_000.0 + 60_000.0);
    }

    #[test]
    fn deleted_entries_stay_listed_but_leave_totals() {
        let task = Uuid::new_v4();
        let lote = parcel("lote 1");
        let raul = contractor("Raul", 80_000.0);
        let records = vec![
            record(task, lote.id, &raul, 1, 1.0),
            record(task, lote.id, &raul, 2, 1.0),
        ];
        let doomed = records[1].id;
        let mut ledger = ledger_with(records, vec![raul], vec![lote]);

        ledger.mark_deleted(doomed).unwrap();

        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.totals().fraction, 1.0);
        assert_eq!(ledger.totals().cost, 80_000.0);

        let ops = ledger.pending_ops();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], LedgerOp::Delete(id) if id == doomed));
    }

    #[test]
    fn set_fraction_recomputes_cost_and_yields_update_op() {
        let task = Uuid::new_v4();
        let lote = parcel("lote 1");
        let raul = contractor("Raul", 80_000.0);
        let records = vec![record(task, lote.id, &raul, 1, 1.0)];
        let id = records[0].id;
        let mut ledger = ledger_with(records, vec![raul], vec![lote]);

        ledger.set_fraction(id, 0.25).unwrap();

        assert_eq!(ledger.totals().cost, 20_000.0);
        let ops = ledger.pending_ops();
        assert_eq!(ops.len(), 1);
        assert!(
            matches!(ops[0], LedgerOp::Update { id: got, fraction, cost } if got == id && fraction == 0.25 && cost == 20_000.0)
        );
    }

    #[test]
    fn set_fraction_falls_back_to_scaling_when_worker_missing() {
        let task = Uuid::new_v4();
        let lote = parcel("lote 1");
        let ghost = contractor("Ghost", 80_000.0);
        let records = vec![record(task, lote.id, &ghost, 1, 1.0)];
        let id = records[0].id;
        // Worker catalog does not contain the ghost.
        let mut ledger = ledger_with(records, vec![], vec![lote]);

        ledger.set_fraction(id, 0.5).unwrap();
        assert_eq!(ledger.entries()[0].record.cost, 40_000.0);
        assert_eq!(ledger.entries()[0].worker_name, "(unknown)");
    }

    #[test]
    fn append_validates_and_computes_cost() {
        let lote = parcel("lote 2");
        let ana = contractor("Ana", 60_000.0);
        let ana_ref = WorkerRef::Contractor(ana.id());
        let mut ledger = ledger_with(vec![], vec![ana], vec![lote.clone()]);

        let id = ledger
            .append(NewWorkRecord {
                worker: ana_ref,
                parcel_id: lote.id,
                date: date(3),
                fraction: 0.75,
            })
            .unwrap();

        assert_eq!(ledger.totals().cost, 45_000.0);
        let ops = ledger.pending_ops();
        assert!(matches!(&ops[0], LedgerOp::Insert(r) if r.id == id && r.cost == 45_000.0));

        // Unknown worker or parcel is a validation failure.
        let err = ledger
            .append(NewWorkRecord {
                worker: WorkerRef::Employee(Uuid::new_v4()),
                parcel_id: lote.id,
                date: date(3),
                fraction: 1.0,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn appended_then_deleted_record_produces_no_op() {
        let lote = parcel("lote 2");
        let ana = contractor("Ana", 60_000.0);
        let ana_ref = WorkerRef::Contractor(ana.id());
        let mut ledger = ledger_with(vec![], vec![ana], vec![lote.clone()]);

        let id = ledger
            .append(NewWorkRecord {
                worker: ana_ref,
                parcel_id: lote.id,
                date: date(3),
                fraction: 1.0,
            })
            .unwrap();
        ledger.mark_deleted(id).unwrap();

        assert!(ledger.pending_ops().is_empty());
        assert_eq!(ledger.totals().fraction, 0.0);
    }

    #[test]
    fn append_without_task_is_rejected() {
        let lote = parcel("lote 2");
        let ana = contractor("Ana", 60_000.0);
        let ana_ref = WorkerRef::Contractor(ana.id());
        let mut ledger = LaborLedger::new(
            None,
            vec![],
            std::iter::once((ana.id(), ana)).collect(),
            std::iter::once((lote.id, lote.clone())).collect(),
        );

        let err = ledger
            .append(NewWorkRecord {
                worker: ana_ref,
                parcel_id: lote.id,
                date: date(1),
                fraction: 1.0,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn applied_ops_fold_into_the_baseline() {
        let task = Uuid::new_v4();
        let lote = parcel("lote 1");
        let raul = contractor("Raul", 80_000.0);
        let records = vec![
            record(task, lote.id, &raul, 1, 1.0),
            record(task, lote.id, &raul, 2, 1.0),
        ];
        let (edited, doomed) = (records[0].id, records[1].id);
        let mut ledger = ledger_with(records, vec![raul], vec![lote]);

        ledger.set_fraction(edited, 0.5).unwrap();
        ledger.mark_deleted(doomed).unwrap();
        let ops = ledger.pending_ops();
        assert_eq!(ops.len(), 2);

        for op in &ops {
            ledger.mark_applied(op);
        }
        assert!(ledger.pending_ops().is_empty());
        // The struck-through entry is gone once the delete is durable.
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn partially_applied_ops_leave_only_the_unapplied_suffix_pending() {
        let task = Uuid::new_v4();
        let lote = parcel("lote 1");
        let raul = contractor("Raul", 80_000.0);
        let records = vec![record(task, lote.id, &raul, 1, 1.0)];
        let doomed = records[0].id;
        let mut ledger = ledger_with(records, vec![raul.clone()], vec![lote.clone()]);

        ledger.mark_deleted(doomed).unwrap();
        let appended = ledger
            .append(NewWorkRecord {
                worker: WorkerRef::Contractor(raul.id()),
                parcel_id: lote.id,
                date: date(2),
                fraction: 0.5,
            })
            .unwrap();

        let ops = ledger.pending_ops();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], LedgerOp::Delete(id) if id == doomed));

        // Only the delete made it to the store before the failure.
        ledger.mark_applied(&ops[0]);
        let remaining = ledger.pending_ops();
        assert_eq!(remaining.len(), 1);
        assert!(matches!(&remaining[0], LedgerOp::Insert(r) if r.id == appended));
    }
}
