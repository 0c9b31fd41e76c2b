use crate::app::reconcile_use_case::RunReport;
use crate::domain::{DedupedTender, Table, TenderRecord, WinningBid};
use crate::error::Result;
use crate::pipeline::processing::awards::UnmatchedSupplier;

/// Destination for the artifacts of a reconciliation batch.
///
/// Implementations may skip any artifact they were not asked to persist.
pub trait ReconcileOutputPort {
    fn write_tenders(&self, tenders: &[DedupedTender]) -> Result<()>;

    fn write_winning_bids(&self, bids: &[WinningBid]) -> Result<()>;

    /// Records the award cascade could not resolve
    fn write_missing_awards(&self, records: &[TenderRecord]) -> Result<()>;

    /// Resolved awards dropped at the supplier join
    fn write_unmatched_suppliers(&self, rows: &[UnmatchedSupplier]) -> Result<()>;

    fn write_unit_prices(&self, table: &Table) -> Result<()>;

    fn write_report(&self, report: &RunReport) -> Result<()>;
}
