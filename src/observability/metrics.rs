//! Simple metrics module for the tender reconciliation batch
//!
//! Metrics are recorded through the `metrics` facade. When no recorder is
//! installed (library use, tests) every call is a no-op.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use tracing::info;

use crate::error::{ReconcileError, Result};

/// Enum representing all metric names used in the system
/// This eliminates magic strings and provides compile-time safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Cleaning metrics
    CleanRecordsIn,
    CleanRecordsExcluded,
    CleanExactDuplicates,
    CleanMissingPrice,
    CleanRecordsOut,

    // Deduplication metrics
    DedupClassSize,
    DedupCrossClassDuplicates,
    DedupTendersOut,

    // Award metrics
    AwardsResolved,
    AwardsUnpriced,
    AwardsMissing,
    AwardsSuppliersUnmatched,
    AwardsAliasConflicts,
    AwardsWinningBidsOut,
    AwardsAmountEur,

    // Unit price metrics
    UnitPriceRows,
    UnitPriceMissingEur,
    UnitPriceOverlongRows,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            // Cleaning metrics
            MetricName::CleanRecordsIn => "tenders_clean_records_in_total",
            MetricName::CleanRecordsExcluded => "tenders_clean_records_excluded_total",
            MetricName::CleanExactDuplicates => "tenders_clean_exact_duplicates_total",
            MetricName::CleanMissingPrice => "tenders_clean_missing_price_total",
            MetricName::CleanRecordsOut => "tenders_clean_records_out_total",

            // Deduplication metrics
            MetricName::DedupClassSize => "tenders_dedup_class_size",
            MetricName::DedupCrossClassDuplicates => "tenders_dedup_cross_class_duplicates_total",
            MetricName::DedupTendersOut => "tenders_dedup_tenders_out_total",

            // Award metrics
            MetricName::AwardsResolved => "tenders_awards_resolved_total",
            MetricName::AwardsUnpriced => "tenders_awards_unpriced_total",
            MetricName::AwardsMissing => "tenders_awards_missing_total",
            MetricName::AwardsSuppliersUnmatched => "tenders_awards_suppliers_unmatched_total",
            MetricName::AwardsAliasConflicts => "tenders_awards_alias_conflicts_total",
            MetricName::AwardsWinningBidsOut => "tenders_awards_winning_bids_out_total",
            MetricName::AwardsAmountEur => "tenders_awards_amount_eur",

            // Unit price metrics
            MetricName::UnitPriceRows => "tenders_unit_price_rows_total",
            MetricName::UnitPriceMissingEur => "tenders_unit_price_missing_eur_total",
            MetricName::UnitPriceOverlongRows => "tenders_unit_price_overlong_rows_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn emit_counter(name: MetricName, value: usize) {
    ::metrics::counter!(name.as_str()).increment(value as u64);
}

pub fn emit_gauge(name: MetricName, value: f64) {
    ::metrics::gauge!(name.as_str()).set(value);
}

/// Install the Prometheus recorder; the handle renders a text snapshot at the end of the batch
pub fn init() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ReconcileError::Metrics(format!("Failed to install Prometheus recorder: {}", e)))?;
    info!("Metrics system initialized");
    Ok(handle)
}

// ============================================================================
// Cleaning Metrics
// ============================================================================

pub mod cleaning {
    use super::{emit_counter, MetricName};
    use crate::pipeline::processing::cleaner::CleaningSummary;

    pub fn record_summary(summary: &CleaningSummary) {
        emit_counter(MetricName::CleanRecordsIn, summary.records_in);
        for (reason, count) in &summary.excluded {
            ::metrics::counter!(MetricName::CleanRecordsExcluded.as_str(), "reason" => reason.as_str())
                .increment(*count as u64);
        }
        emit_counter(MetricName::CleanExactDuplicates, summary.exact_duplicates);
        ::metrics::counter!(MetricName::CleanMissingPrice.as_str(), "level" => "tender")
            .increment(summary.missing_price_eur as u64);
        ::metrics::counter!(MetricName::CleanMissingPrice.as_str(), "level" => "lot")
            .increment(summary.missing_price_lot_eur as u64);
        emit_counter(MetricName::CleanRecordsOut, summary.records_out);
    }
}

// ============================================================================
// Deduplication Metrics
// ============================================================================

pub mod dedup {
    use super::{emit_counter, MetricName};
    use crate::pipeline::processing::conflation::DedupSummary;

    pub fn record_summary(summary: &DedupSummary) {
        for (class, size) in &summary.class_sizes {
            ::metrics::gauge!(MetricName::DedupClassSize.as_str(), "class" => class.as_str())
                .set(*size as f64);
        }
        emit_counter(MetricName::DedupCrossClassDuplicates, summary.cross_class_duplicates);
        emit_counter(MetricName::DedupTendersOut, summary.tenders_out);
    }
}

// ============================================================================
// Award Metrics
// ============================================================================

pub mod awards {
    use super::{emit_counter, emit_gauge, MetricName};
    use crate::pipeline::processing::awards::AwardSummary;

    pub fn record_summary(summary: &AwardSummary) {
        for (stage, count) in &summary.resolved_by_stage {
            ::metrics::counter!(MetricName::AwardsResolved.as_str(), "stage" => *stage)
                .increment(*count as u64);
        }
        emit_counter(MetricName::AwardsUnpriced, summary.unpriced_contracts);
        emit_counter(MetricName::AwardsMissing, summary.missing);
        emit_counter(MetricName::AwardsSuppliersUnmatched, summary.suppliers_unmatched);
        emit_counter(MetricName::AwardsAliasConflicts, summary.alias_conflicts);
        emit_counter(MetricName::AwardsWinningBidsOut, summary.winning_bids_out);
        emit_gauge(MetricName::AwardsAmountEur, summary.total_awarded_eur);
    }
}

// ============================================================================
// Unit Price Metrics
// ============================================================================

pub mod unit_prices {
    use super::{emit_counter, MetricName};
    use crate::pipeline::processing::unit_prices::UnitPriceSummary;

    pub fn record_summary(summary: &UnitPriceSummary) {
        emit_counter(MetricName::UnitPriceRows, summary.rows);
        emit_counter(MetricName::UnitPriceMissingEur, summary.missing_unit_price_eur);
        emit_counter(MetricName::UnitPriceOverlongRows, summary.overlong_rows);
    }
}
