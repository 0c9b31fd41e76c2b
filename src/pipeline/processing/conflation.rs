//! Tender deduplication across overlapping sources.
//!
//! Each cleaned record is assigned exactly one [`ProvenanceClass`] by an ordered
//! predicate chain. The class decides which fields form a reliable identity key
//! for that record and whether the first or last occurrence survives.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use tracing::info;

use crate::config::JurisdictionConfig;
use crate::domain::{DedupedTender, TenderRecord};

/// Where a record's reliable identity comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceClass {
    /// Carries a pan-European (TED) notice identifier
    PanEuropean,
    /// Typed as a contract, or from a jurisdiction without lot granularity
    Contract,
    /// From a jurisdiction numbering contracts as tender-number/lot
    SplitLotJurisdiction,
    /// Everything else
    Other,
}

/// Which occurrence of a duplicate group survives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    First,
    Last,
}

/// Identity key of a record within its provenance class.
///
/// Prices are compared as raw text, so two missing values are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey<'a> {
    Notice(Option<&'a str>),
    Contract {
        title: Option<&'a str>,
        price: Option<&'a str>,
        buyer: Option<&'a str>,
        date: Option<&'a str>,
    },
    SourceLot {
        source: Option<&'a str>,
        lot: Option<&'a str>,
    },
    PriceSource {
        price: Option<&'a str>,
        source: Option<&'a str>,
    },
}

impl ProvenanceClass {
    pub const ALL: [ProvenanceClass; 4] = [
        ProvenanceClass::PanEuropean,
        ProvenanceClass::Contract,
        ProvenanceClass::SplitLotJurisdiction,
        ProvenanceClass::Other,
    ];

    /// Assign a class by evaluating the predicates in priority order
    pub fn classify(record: &TenderRecord, jurisdictions: &JurisdictionConfig) -> Self {
        let country = record.buyer_country.as_deref();
        if record.ted_id.is_some() {
            ProvenanceClass::PanEuropean
        } else if record.is_contract() || jurisdictions.is_lotless(country) {
            ProvenanceClass::Contract
        } else if jurisdictions.is_split_lot(country) {
            ProvenanceClass::SplitLotJurisdiction
        } else {
            ProvenanceClass::Other
        }
    }

    pub fn key<'a>(&self, record: &'a TenderRecord) -> DedupKey<'a> {
        match self {
            ProvenanceClass::PanEuropean => DedupKey::Notice(record.ted_id.as_deref()),
            ProvenanceClass::Contract => DedupKey::Contract {
                title: record.title.as_deref(),
                price: record.price.as_deref(),
                buyer: record.buyer.as_deref(),
                date: record.date.as_deref(),
            },
            ProvenanceClass::SplitLotJurisdiction => DedupKey::SourceLot {
                source: record.source.as_deref(),
                lot: record.lot.as_deref(),
            },
            ProvenanceClass::Other => DedupKey::PriceSource {
                price: record.price.as_deref(),
                source: record.source.as_deref(),
            },
        }
    }

    /// Later rows of notice-based sources are assumed to be more complete
    pub fn keep(&self) -> Keep {
        match self {
            ProvenanceClass::Contract => Keep::First,
            ProvenanceClass::PanEuropean
            | ProvenanceClass::SplitLotJurisdiction
            | ProvenanceClass::Other => Keep::Last,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvenanceClass::PanEuropean => "pan_european",
            ProvenanceClass::Contract => "contract",
            ProvenanceClass::SplitLotJurisdiction => "split_lot_jurisdiction",
            ProvenanceClass::Other => "other",
        }
    }
}

/// Deduplicate `items` on `key`, preserving the input order of the survivors
pub fn dedup_by_key<T, K, F>(items: Vec<T>, keep: Keep, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let survivors: Vec<bool> = {
        let mut seen = HashSet::new();
        match keep {
            Keep::First => items.iter().map(|item| seen.insert(key(item))).collect(),
            Keep::Last => {
                let mut flags: Vec<bool> =
                    items.iter().rev().map(|item| seen.insert(key(item))).collect();
                flags.reverse();
                flags
            }
        }
    };

    items
        .into_iter()
        .zip(survivors)
        .filter_map(|(item, survives)| survives.then_some(item))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DedupSummary {
    pub records_in: usize,
    /// Records assigned to each class
    pub class_sizes: BTreeMap<ProvenanceClass, usize>,
    /// Survivors of each class-specific pass
    pub class_survivors: BTreeMap<ProvenanceClass, usize>,
    pub cross_class_duplicates: usize,
    pub tenders_out: usize,
}

#[derive(Debug, Clone)]
pub struct DedupedTenders {
    pub tenders: Vec<DedupedTender>,
    pub summary: DedupSummary,
}

/// Collapses cleaned records into one row per distinct tender or contract
pub struct TenderDeduplicator {
    jurisdictions: JurisdictionConfig,
}

impl TenderDeduplicator {
    pub fn new(jurisdictions: JurisdictionConfig) -> Self {
        Self { jurisdictions }
    }

    /// Split records into the four disjoint provenance classes, preserving input order
    pub fn partition<'a>(
        &self,
        records: &'a [TenderRecord],
    ) -> BTreeMap<ProvenanceClass, Vec<&'a TenderRecord>> {
        let mut classes: BTreeMap<ProvenanceClass, Vec<&TenderRecord>> = ProvenanceClass::ALL
            .iter()
            .map(|class| (*class, Vec::new()))
            .collect();

        for record in records {
            let class = ProvenanceClass::classify(record, &self.jurisdictions);
            classes.entry(class).or_default().push(record);
        }
        classes
    }

    pub fn deduplicate(&self, records: &[TenderRecord]) -> DedupedTenders {
        let mut summary = DedupSummary {
            records_in: records.len(),
            ..Default::default()
        };

        let mut combined: Vec<&TenderRecord> = Vec::new();
        for (class, members) in self.partition(records) {
            summary.class_sizes.insert(class, members.len());

            let survivors = dedup_by_key(members, class.keep(), |r| class.key(*r));
            info!(
                class = class.as_str(),
                survivors = survivors.len(),
                "Deduplicated provenance class"
            );
            summary.class_survivors.insert(class, survivors.len());
            combined.extend(survivors);
        }

        // Residual duplicates across classes; may merge more than strictly necessary
        let before_final = combined.len();
        let combined = dedup_by_key(combined, Keep::First, |r| {
            let r: &TenderRecord = *r;
            (
                r.title.as_deref(),
                r.price_eur.map(f64::to_bits),
                r.source.as_deref(),
            )
        });
        summary.cross_class_duplicates = before_final - combined.len();

        let tenders: Vec<DedupedTender> = combined.into_iter().map(DedupedTender::from).collect();
        summary.tenders_out = tenders.len();

        info!(
            records_in = summary.records_in,
            tenders_out = summary.tenders_out,
            "Deduplicated tenders"
        );

        DedupedTenders { tenders, summary }
    }
}
