use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::config::ScopeConfig;
use crate::domain::{RawTenderRecord, TenderRecord};
use crate::pipeline::processing::currency::ConversionTable;
use crate::pipeline::processing::normalize::{normalize_procedure, RecordNormalizer};
use crate::pipeline::processing::quality_gate::{ExclusionReason, ScopeDecision, ScopeGate};

/// Counts describing what the cleaner did to a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningSummary {
    pub records_in: usize,
    pub excluded: BTreeMap<ExclusionReason, usize>,
    pub exact_duplicates: usize,
    pub missing_price_eur: usize,
    pub missing_price_lot_eur: usize,
    pub records_out: usize,
}

impl CleaningSummary {
    pub fn excluded_total(&self) -> usize {
        self.excluded.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct CleanedBatch {
    pub records: Vec<TenderRecord>,
    pub summary: CleaningSummary,
}

/// Applies scope rules and field normalization, returning a fresh collection
pub struct RecordCleaner {
    gate: ScopeGate,
    normalizer: RecordNormalizer,
}

impl RecordCleaner {
    pub fn new(scope: ScopeConfig, rates: ConversionTable) -> Self {
        Self {
            gate: ScopeGate::new(scope),
            normalizer: RecordNormalizer::new(rates),
        }
    }

    pub fn clean(&self, raw: Vec<RawTenderRecord>) -> CleanedBatch {
        let mut summary = CleaningSummary {
            records_in: raw.len(),
            ..Default::default()
        };

        let mut normalized = Vec::with_capacity(raw.len());
        for mut record in raw {
            record.procedure = normalize_procedure(record.procedure.take());

            if let ScopeDecision::Exclude(reason) = self.gate.assess(&record) {
                debug!(id = ?record.id, reason = reason.as_str(), "Record out of scope");
                *summary.excluded.entry(reason).or_insert(0) += 1;
                continue;
            }

            normalized.push(self.normalizer.normalize(record));
        }

        let records = drop_exact_duplicates(normalized);
        summary.exact_duplicates =
            summary.records_in - summary.excluded_total() - records.len();
        summary.missing_price_eur = records.iter().filter(|r| r.price_eur.is_none()).count();
        summary.missing_price_lot_eur = records
            .iter()
            .filter(|r| r.price_lot_eur.is_none())
            .count();
        summary.records_out = records.len();

        info!(
            records_in = summary.records_in,
            excluded = summary.excluded_total(),
            exact_duplicates = summary.exact_duplicates,
            records_out = summary.records_out,
            "Cleaned tender records"
        );

        CleanedBatch { records, summary }
    }
}

/// Keep the first of every group of rows identical in all fields but the identifier
fn drop_exact_duplicates(records: Vec<TenderRecord>) -> Vec<TenderRecord> {
    let keep: Vec<bool> = {
        let mut seen = HashSet::new();
        records.iter().map(|r| seen.insert(r.content_key())).collect()
    };

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, keep)| keep.then_some(record))
        .collect()
}
