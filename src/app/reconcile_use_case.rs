use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::app::ports::ReconcileOutputPort;
use crate::config::Config;
use crate::domain::{RawTenderRecord, SupplierAlias, Table};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::awards::{AwardReconciler, AwardSummary, SupplierDirectory};
use crate::pipeline::processing::cleaner::{CleanedBatch, CleaningSummary, RecordCleaner};
use crate::pipeline::processing::conflation::{DedupSummary, TenderDeduplicator};
use crate::pipeline::processing::currency::ConversionTable;
use crate::pipeline::processing::unit_prices::{clean_unit_prices, UnitPriceSummary};

/// Which analytical views a batch should produce
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub tenders: bool,
    /// Curated supplier names; awards are reconciled only when present
    pub suppliers: Option<Vec<SupplierAlias>>,
}

/// Summary of one batch, persisted next to the output tables
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub cleaning: CleaningSummary,
    pub tenders: Option<DedupSummary>,
    pub awards: Option<AwardSummary>,
}

/// Runs the cleaner once and feeds its output to the deduplicator and the award reconciler
pub struct ReconcileUseCase {
    config: Config,
    rates: ConversionTable,
    output: Box<dyn ReconcileOutputPort>,
}

impl ReconcileUseCase {
    pub fn new(config: Config, output: Box<dyn ReconcileOutputPort>) -> Self {
        Self {
            config,
            rates: ConversionTable::new(),
            output,
        }
    }

    pub fn clean(&self, raw: Vec<RawTenderRecord>) -> CleanedBatch {
        let cleaner = RecordCleaner::new(self.config.scope.clone(), self.rates);
        let batch = cleaner.clean(raw);
        metrics::cleaning::record_summary(&batch.summary);
        batch
    }

    #[instrument(skip_all, fields(records = batch.records.len()))]
    pub fn tenders(&self, batch: &CleanedBatch) -> Result<DedupSummary> {
        let deduplicator = TenderDeduplicator::new(self.config.jurisdictions.clone());
        let result = deduplicator.deduplicate(&batch.records);

        self.output.write_tenders(&result.tenders)?;
        metrics::dedup::record_summary(&result.summary);
        Ok(result.summary)
    }

    #[instrument(skip_all, fields(records = batch.records.len(), aliases = aliases.len()))]
    pub fn companies(&self, batch: &CleanedBatch, aliases: Vec<SupplierAlias>) -> Result<AwardSummary> {
        let reconciler = AwardReconciler::new(SupplierDirectory::from_aliases(aliases));
        let outcome = reconciler.reconcile(&batch.records);

        self.output.write_winning_bids(&outcome.bids)?;
        self.output.write_missing_awards(&outcome.missing)?;
        self.output.write_unmatched_suppliers(&outcome.unmatched)?;
        metrics::awards::record_summary(&outcome.summary);
        Ok(outcome.summary)
    }

    #[instrument(skip_all, fields(records = raw.len()))]
    pub fn run(&self, raw: Vec<RawTenderRecord>, request: RunRequest) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        info!(%run_id, "Starting reconciliation batch");

        let batch = self.clean(raw);

        let tenders = if request.tenders {
            Some(self.tenders(&batch)?)
        } else {
            None
        };

        let awards = match request.suppliers {
            Some(aliases) => Some(self.companies(&batch, aliases)?),
            None => None,
        };

        let report = RunReport {
            run_id,
            generated_at: Utc::now(),
            cleaning: batch.summary,
            tenders,
            awards,
        };
        self.output.write_report(&report)?;

        info!(%run_id, "Reconciliation batch finished");
        Ok(report)
    }

    #[instrument(skip_all, fields(rows = table.rows.len()))]
    pub fn unit_prices(&self, table: Table) -> Result<UnitPriceSummary> {
        let (cleaned, summary) = clean_unit_prices(table, &self.rates)?;
        self.output.write_unit_prices(&cleaned)?;
        metrics::unit_prices::record_summary(&summary);
        Ok(summary)
    }
}
