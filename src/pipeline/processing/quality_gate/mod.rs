use serde::Serialize;

use crate::config::ScopeConfig;
use crate::domain::RawTenderRecord;

/// Scope decision for a raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDecision {
    /// Record is in scope and proceeds to normalization
    Retain,
    /// Record is out of scope for this batch
    Exclude(ExclusionReason),
}

/// Why a record was excluded; the first failing rule wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Year missing or not numeric
    NonNumericYear,
    /// Year outside the batch year
    WrongYear,
    /// No product category
    MissingProduct,
    /// Product flagged as unrelated
    IrrelevantProduct,
    /// Call for tender or duplicate marker
    ExcludedType,
    /// Cancelled tender
    ExcludedStatus,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::NonNumericYear => "non_numeric_year",
            ExclusionReason::WrongYear => "wrong_year",
            ExclusionReason::MissingProduct => "missing_product",
            ExclusionReason::IrrelevantProduct => "irrelevant_product",
            ExclusionReason::ExcludedType => "excluded_type",
            ExclusionReason::ExcludedStatus => "excluded_status",
        }
    }
}

/// Business-rule gate deciding which raw records belong to the batch
pub struct ScopeGate {
    config: ScopeConfig,
}

impl ScopeGate {
    pub fn new(config: ScopeConfig) -> Self {
        Self { config }
    }

    pub fn assess(&self, record: &RawTenderRecord) -> ScopeDecision {
        match self.first_violation(record) {
            Some(reason) => ScopeDecision::Exclude(reason),
            None => ScopeDecision::Retain,
        }
    }

    fn first_violation(&self, record: &RawTenderRecord) -> Option<ExclusionReason> {
        let year = match record.year.as_deref().and_then(parse_year) {
            Some(year) => year,
            None => return Some(ExclusionReason::NonNumericYear),
        };
        if year != f64::from(self.config.year) {
            return Some(ExclusionReason::WrongYear);
        }

        let product = match record.product.as_deref() {
            Some(product) => product,
            None => return Some(ExclusionReason::MissingProduct),
        };
        if product.to_lowercase() == self.config.excluded_product.to_lowercase() {
            return Some(ExclusionReason::IrrelevantProduct);
        }

        if matches_any(record.record_type.as_deref(), &self.config.excluded_types) {
            return Some(ExclusionReason::ExcludedType);
        }
        if matches_any(record.status.as_deref(), &self.config.excluded_statuses) {
            return Some(ExclusionReason::ExcludedStatus);
        }

        None
    }
}

/// Numeric year as float, so "2020" and "2020.0" compare equal
fn parse_year(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|y| y.is_finite())
}

/// Missing values never match an exclusion list
fn matches_any(value: Option<&str>, excluded: &[String]) -> bool {
    match value {
        Some(value) => {
            let lowered = value.trim().to_lowercase();
            excluded.iter().any(|e| e.trim().to_lowercase() == lowered)
        }
        None => false,
    }
}
